//! Match-search screen state machine
//!
//! Drives the "finding match" phases from connection events and local
//! timers:
//!
//! ```text
//! Searching --ID--> Found --3s--> WaitingForOpponent --Comienza--> Starting --3s--> InMatch
//!     |                                                                ^
//!     +--Comienza (ID lost)--------------------------------------------+
//!     |
//!     +--10s without ID--> TimedOut --retry--> Searching
//! ```
//!
//! While searching, the machine asks its owner to send a discovery frame
//! every discovery interval. It never touches the socket itself.

use crate::config::ClientConfig;
use crate::events::EventSink;
use log::info;
use shared::PlayerId;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Searching,
    Found,
    WaitingForOpponent,
    Starting,
    InMatch,
    TimedOut,
}

impl ConnectionPhase {
    pub fn status_text(self) -> &'static str {
        match self {
            ConnectionPhase::Searching => "Searching for server...",
            ConnectionPhase::Found => "Server found",
            ConnectionPhase::WaitingForOpponent => "Waiting for an opponent...",
            ConnectionPhase::Starting => "Match starting...",
            ConnectionPhase::InMatch => "In match",
            ConnectionPhase::TimedOut => "No server found. Retry?",
        }
    }
}

/// Work the owner of the state machine must carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchAction {
    SendDiscovery,
    /// Emitted once, on entering [`ConnectionPhase::InMatch`].
    EnterMatch,
}

#[derive(Debug, Clone)]
pub struct MatchSearch {
    phase: ConnectionPhase,
    player_id: Option<PlayerId>,
    state_time: Duration,
    search_time: Duration,
    since_discovery: Duration,

    search_timeout: Duration,
    discovery_interval: Duration,
    found_dwell: Duration,
    starting_dwell: Duration,
}

impl MatchSearch {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            phase: ConnectionPhase::Searching,
            player_id: None,
            state_time: Duration::ZERO,
            search_time: Duration::ZERO,
            since_discovery: Duration::ZERO,
            search_timeout: config.search_timeout,
            discovery_interval: config.discovery_interval,
            found_dwell: config.found_dwell,
            starting_dwell: config.starting_dwell,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    /// Advances local timers by `dt`.
    pub fn update(&mut self, dt: Duration) -> Option<SearchAction> {
        self.state_time += dt;

        match self.phase {
            ConnectionPhase::Searching => {
                self.search_time += dt;
                self.since_discovery += dt;

                let mut action = None;
                if self.since_discovery >= self.discovery_interval {
                    self.since_discovery = Duration::ZERO;
                    action = Some(SearchAction::SendDiscovery);
                }
                if self.search_time >= self.search_timeout {
                    self.set_phase(ConnectionPhase::TimedOut);
                }
                action
            }
            ConnectionPhase::Found => {
                if self.state_time >= self.found_dwell {
                    self.set_phase(ConnectionPhase::WaitingForOpponent);
                }
                None
            }
            ConnectionPhase::Starting => {
                if self.state_time >= self.starting_dwell {
                    self.set_phase(ConnectionPhase::InMatch);
                    return Some(SearchAction::EnterMatch);
                }
                None
            }
            ConnectionPhase::WaitingForOpponent
            | ConnectionPhase::InMatch
            | ConnectionPhase::TimedOut => None,
        }
    }

    /// Restarts discovery after a timeout. The socket stays open.
    pub fn retry(&mut self) -> bool {
        if self.phase != ConnectionPhase::TimedOut {
            return false;
        }
        self.set_phase(ConnectionPhase::Searching);
        true
    }

    fn set_phase(&mut self, phase: ConnectionPhase) {
        self.phase = phase;
        self.state_time = Duration::ZERO;
        self.since_discovery = Duration::ZERO;
        if phase == ConnectionPhase::Searching {
            self.search_time = Duration::ZERO;
        }
        info!("{}", phase.status_text());
    }
}

impl EventSink for MatchSearch {
    fn on_connected(&mut self, player: PlayerId) {
        self.player_id = Some(player);
        if matches!(
            self.phase,
            ConnectionPhase::Searching | ConnectionPhase::TimedOut
        ) {
            self.set_phase(ConnectionPhase::Found);
        }
    }

    fn on_match_started(&mut self) {
        // A start that lands during the cosmetic dwell is not lost, nor one
        // whose `ID` never arrived.
        if matches!(
            self.phase,
            ConnectionPhase::Searching
                | ConnectionPhase::Found
                | ConnectionPhase::WaitingForOpponent
        ) {
            self.set_phase(ConnectionPhase::Starting);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{dispatch, ClientEvent};

    const FRAME: Duration = Duration::from_millis(100);

    fn search() -> MatchSearch {
        MatchSearch::new(&ClientConfig::default())
    }

    fn advance(search: &mut MatchSearch, total: Duration) -> Vec<SearchAction> {
        let mut actions = Vec::new();
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            if let Some(action) = search.update(FRAME) {
                actions.push(action);
            }
            elapsed += FRAME;
        }
        actions
    }

    #[test]
    fn test_starts_searching() {
        let search = search();
        assert_eq!(search.phase(), ConnectionPhase::Searching);
        assert_eq!(search.player_id(), None);
    }

    #[test]
    fn test_discovery_cadence_and_timeout() {
        let mut search = search();

        let actions = advance(&mut search, Duration::from_millis(9900));
        assert_eq!(actions.len(), 19);
        assert!(actions.iter().all(|a| *a == SearchAction::SendDiscovery));
        assert_eq!(search.phase(), ConnectionPhase::Searching);

        let actions = advance(&mut search, FRAME);
        assert_eq!(actions, vec![SearchAction::SendDiscovery]);
        assert_eq!(search.phase(), ConnectionPhase::TimedOut);

        // Timed out: no more discovery.
        assert!(advance(&mut search, Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn test_retry_restarts_discovery_and_timer() {
        let mut search = search();
        advance(&mut search, Duration::from_secs(10));
        assert_eq!(search.phase(), ConnectionPhase::TimedOut);

        assert!(search.retry());
        assert_eq!(search.phase(), ConnectionPhase::Searching);

        let actions = advance(&mut search, Duration::from_millis(9900));
        assert_eq!(actions.len(), 19);
        assert_eq!(search.phase(), ConnectionPhase::Searching);

        advance(&mut search, FRAME);
        assert_eq!(search.phase(), ConnectionPhase::TimedOut);
    }

    #[test]
    fn test_retry_only_from_timed_out() {
        let mut search = search();
        assert!(!search.retry());
        search.on_connected(0);
        assert!(!search.retry());
        assert_eq!(search.phase(), ConnectionPhase::Found);
    }

    #[test]
    fn test_full_match_flow() {
        let mut search = search();
        advance(&mut search, Duration::from_secs(2));

        dispatch(ClientEvent::Connected(1), &mut search);
        assert_eq!(search.phase(), ConnectionPhase::Found);
        assert_eq!(search.player_id(), Some(1));

        assert!(advance(&mut search, Duration::from_millis(2900)).is_empty());
        assert_eq!(search.phase(), ConnectionPhase::Found);
        advance(&mut search, FRAME);
        assert_eq!(search.phase(), ConnectionPhase::WaitingForOpponent);

        // Waiting has no timeout.
        assert!(advance(&mut search, Duration::from_secs(60)).is_empty());
        assert_eq!(search.phase(), ConnectionPhase::WaitingForOpponent);

        dispatch(ClientEvent::MatchStarted, &mut search);
        assert_eq!(search.phase(), ConnectionPhase::Starting);

        assert!(advance(&mut search, Duration::from_millis(2900)).is_empty());
        let actions = advance(&mut search, FRAME);
        assert_eq!(actions, vec![SearchAction::EnterMatch]);
        assert_eq!(search.phase(), ConnectionPhase::InMatch);

        assert!(advance(&mut search, Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn test_late_id_after_timeout_is_accepted() {
        let mut search = search();
        advance(&mut search, Duration::from_secs(10));
        assert_eq!(search.phase(), ConnectionPhase::TimedOut);

        search.on_connected(0);
        assert_eq!(search.phase(), ConnectionPhase::Found);
    }

    #[test]
    fn test_match_start_during_found_dwell() {
        let mut search = search();
        search.on_connected(0);
        advance(&mut search, Duration::from_secs(1));

        search.on_match_started();
        assert_eq!(search.phase(), ConnectionPhase::Starting);
    }

    #[test]
    fn test_match_start_while_searching_skips_lost_id() {
        let mut search = search();
        advance(&mut search, Duration::from_secs(1));

        search.on_match_started();
        assert_eq!(search.phase(), ConnectionPhase::Starting);
        assert_eq!(search.player_id(), None);

        // No discovery once the match is starting.
        let actions = advance(&mut search, Duration::from_secs(3));
        assert_eq!(actions, vec![SearchAction::EnterMatch]);
    }

    #[test]
    fn test_match_start_ignored_after_timeout() {
        let mut search = search();
        advance(&mut search, Duration::from_secs(10));

        search.on_match_started();
        assert_eq!(search.phase(), ConnectionPhase::TimedOut);
    }

    #[test]
    fn test_repeated_id_does_not_restart_dwell() {
        let mut search = search();
        search.on_connected(0);
        advance(&mut search, Duration::from_secs(2));
        search.on_connected(0);
        advance(&mut search, Duration::from_secs(1));
        assert_eq!(search.phase(), ConnectionPhase::WaitingForOpponent);
    }
}
