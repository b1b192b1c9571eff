//! The event loop: host events and the poll timer, handled one at a time
//! on a single task.

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::host::Host;
use crate::models::{SavedConnection, SearchSettings};
use crate::state::SearchSession;

#[derive(Debug, Clone)]
pub enum HostEvent {
    TextEdited(String),
    Selected(usize),
    Highlighted(usize),
    Reconfigure {
        settings: SearchSettings,
        connections: Vec<SavedConnection>,
    },
    Shutdown,
}

/// Drives `session` until `Shutdown` arrives or every sender is gone, then
/// closes the connection. A query runs inside its tick; events arriving
/// meanwhile wait in the channel.
pub async fn run<H: Host + ?Sized>(
    session: &mut SearchSession,
    host: &mut H,
    mut events: mpsc::Receiver<HostEvent>,
) {
    let mut ticker = new_ticker(session);
    info!(period_ms = session.poll_interval().as_millis() as u64, "search loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.tick(Instant::now(), host).await;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    HostEvent::TextEdited(text) => {
                        session.on_text_changed(&text, Instant::now(), host);
                    }
                    HostEvent::Selected(row) => {
                        session.selected(row, host);
                    }
                    HostEvent::Highlighted(row) => session.highlighted(row),
                    HostEvent::Reconfigure { settings, connections } => {
                        session
                            .reconfigure(&settings, &connections, host, Instant::now())
                            .await;
                        ticker = new_ticker(session);
                    }
                    HostEvent::Shutdown => {
                        debug!("shutdown requested");
                        break;
                    }
                }
            }
        }
    }

    session.shutdown().await;
    info!("search loop stopped");
}

fn new_ticker(session: &SearchSession) -> time::Interval {
    let mut ticker = time::interval(session.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
