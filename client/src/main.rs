use clap::Parser;
use client::config::ClientConfig;
use client::events::dispatch;
use client::input::{key_code, InputTracker};
use client::match_state::MatchView;
use client::network::Connection;
use client::search::{ConnectionPhase, MatchSearch, SearchAction};
use log::{info, warn};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};

const FRAME: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Known server address; broadcast discovery is used when omitted
    #[arg(short = 's', long)]
    server: Option<SocketAddr>,

    /// Server port for broadcast discovery
    #[arg(short = 'p', long, default_value_t = shared::SERVER_PORT)]
    port: u16,

    /// Seconds without a handshake before giving up a search
    #[arg(long, default_value_t = shared::SEARCH_TIMEOUT_SECS)]
    search_secs: u64,

    /// Milliseconds without a heartbeat reply before the server counts as lost
    #[arg(long, default_value_t = shared::LIVENESS_TIMEOUT_MS)]
    liveness_ms: u64,

    /// Searches to retry after a timeout
    #[arg(short = 'r', long, default_value = "0")]
    retries: u32,

    /// Drop this fraction (0.0 - 1.0) of inbound datagrams on purpose
    #[arg(long, default_value = "0.0")]
    fake_loss: f64,

    /// Keys to hold down for the whole match, e.g. "WD"
    #[arg(short = 'k', long, default_value = "")]
    keys: String,
}

impl Args {
    fn to_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            search_timeout: Duration::from_secs(self.search_secs),
            liveness_timeout: Duration::from_millis(self.liveness_ms),
            inbound_loss: self.fake_loss,
            ..ClientConfig::default()
        };
        config.discovery_addr.set_port(self.port);
        if let Some(server) = self.server {
            config = config.with_server(server);
        }
        config
    }

    fn held_keys(&self) -> Vec<i32> {
        self.keys
            .chars()
            .filter_map(|name| {
                let code = key_code(name);
                if code.is_none() {
                    warn!("Ignoring unknown key {:?}", name);
                }
                code
            })
            .collect()
    }
}

enum Screen {
    Search(MatchSearch),
    Match(MatchView),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = args.to_config();

    info!("Starting client...");
    info!("Discovery address: {}", config.discovery_addr);
    if config.inbound_loss > 0.0 {
        info!("Simulating {:.0}% inbound loss", config.inbound_loss * 100.0);
    }

    let mut connection = Connection::open(config.clone()).await?;
    run(&mut connection, &config, &args).await;
    connection.disconnect().await;

    Ok(())
}

async fn run(connection: &mut Connection, config: &ClientConfig, args: &Args) {
    let held = args.held_keys();
    let mut input = InputTracker::new();
    let mut retries_left = args.retries;
    let mut screen = Screen::Search(MatchSearch::new(config));

    let mut frame = interval(FRAME);
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_frame = Instant::now();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = frame.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_frame);
                last_frame = now;

                let mut next = None;
                match &mut screen {
                    Screen::Search(search) => {
                        connection.poll_events(search);

                        match search.update(dt) {
                            Some(SearchAction::SendDiscovery) => connection.discover().await,
                            Some(SearchAction::EnterMatch) => {
                                next = Some(Screen::Match(MatchView::new(search.player_id())));
                            }
                            None => {}
                        }

                        if search.phase() == ConnectionPhase::TimedOut {
                            if retries_left == 0 {
                                warn!("Giving up, no server answered");
                                return;
                            }
                            retries_left -= 1;
                            search.retry();
                        }
                    }
                    Screen::Match(view) => {
                        connection.poll_events(view);
                        if let Some(lost) = connection.check_liveness() {
                            dispatch(lost, view);
                        }

                        if let Some(outcome) = view.outcome() {
                            info!("Leaving match: {:?}", outcome);
                            break;
                        }

                        for key in input.update(&held) {
                            connection.send_input(key).await;
                        }
                    }
                }

                if let Some(screen_next) = next {
                    screen = screen_next;
                }
            },

            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, disconnecting...");
                break;
            },
        }
    }

    for key in input.release_all() {
        connection.send_input(key).await;
    }
}
