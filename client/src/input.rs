//! Key edge detection and the signed key codes sent in `Input` frames

use shared::{is_allowed_key, ALLOWED_KEYS, KEY_A, KEY_D, KEY_E, KEY_G, KEY_S, KEY_W};

/// Turns "keys held this frame" into press / release transitions
pub struct InputTracker {
    // Previous frame key states, indexed like `ALLOWED_KEYS`
    prev_held: [bool; ALLOWED_KEYS.len()],
}

impl InputTracker {
    pub fn new() -> Self {
        Self {
            prev_held: [false; ALLOWED_KEYS.len()],
        }
    }

    /// Returns the signed codes to send for this frame: `+code` for each key
    /// that went down, `-code` for each key that came up. Keys outside the
    /// allowed set are ignored.
    pub fn update(&mut self, held: &[i32]) -> Vec<i32> {
        let mut transitions = Vec::new();

        for (slot, &code) in ALLOWED_KEYS.iter().enumerate() {
            let down = held.contains(&code);
            let was_down = self.prev_held[slot];

            if down && !was_down {
                transitions.push(code);
            } else if !down && was_down {
                transitions.push(-code);
            }

            self.prev_held[slot] = down;
        }

        transitions
    }

    /// Releases every key still held, e.g. before leaving a match.
    pub fn release_all(&mut self) -> Vec<i32> {
        self.update(&[])
    }

    pub fn is_held(&self, code: i32) -> bool {
        ALLOWED_KEYS
            .iter()
            .position(|&k| k == code)
            .map(|slot| self.prev_held[slot])
            .unwrap_or(false)
    }
}

impl Default for InputTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a key name such as `W` or `e` to its code.
pub fn key_code(name: char) -> Option<i32> {
    let code = match name.to_ascii_uppercase() {
        'W' => KEY_W,
        'A' => KEY_A,
        'S' => KEY_S,
        'D' => KEY_D,
        'G' => KEY_G,
        'E' => KEY_E,
        _ => return None,
    };
    debug_assert!(is_allowed_key(code));
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_tracker_creation() {
        let tracker = InputTracker::new();
        for code in ALLOWED_KEYS {
            assert!(!tracker.is_held(code));
        }
    }

    #[test]
    fn test_press_then_release() {
        let mut tracker = InputTracker::new();

        assert_eq!(tracker.update(&[KEY_W]), vec![KEY_W]);
        assert!(tracker.is_held(KEY_W));

        // Holding produces nothing new.
        assert!(tracker.update(&[KEY_W]).is_empty());

        assert_eq!(tracker.update(&[]), vec![-KEY_W]);
        assert!(!tracker.is_held(KEY_W));
    }

    #[test]
    fn test_every_allowed_key_round_trips() {
        for code in ALLOWED_KEYS {
            let mut tracker = InputTracker::new();
            assert_eq!(tracker.update(&[code]), vec![code]);
            assert_eq!(tracker.update(&[]), vec![-code]);
        }
    }

    #[test]
    fn test_disallowed_keys_are_ignored() {
        let mut tracker = InputTracker::new();
        assert!(tracker.update(&[62, 131]).is_empty());
    }

    #[test]
    fn test_simultaneous_changes() {
        let mut tracker = InputTracker::new();
        tracker.update(&[KEY_W, KEY_A]);

        let transitions = tracker.update(&[KEY_A, KEY_D]);
        assert_eq!(transitions, vec![-KEY_W, KEY_D]);

        let released = tracker.release_all();
        assert_eq!(released, vec![-KEY_A, -KEY_D]);
    }

    #[test]
    fn test_key_code() {
        assert_eq!(key_code('w'), Some(KEY_W));
        assert_eq!(key_code('E'), Some(KEY_E));
        assert_eq!(key_code('x'), None);
    }
}
