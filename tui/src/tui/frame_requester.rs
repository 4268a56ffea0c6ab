//! Redraw scheduling.
//!
//! [`FrameRequester`] is a cheap, cloneable handle. Requests go to a scheduler
//! task that merges everything due before the next deadline into one draw
//! notification, and never emits draws closer together than
//! [`MIN_FRAME_INTERVAL`].

use std::time::Duration;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::sync::mpsc;

/// Upper bound of 60 draws per second.
pub(super) const MIN_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

#[derive(Clone, Debug)]
pub struct FrameRequester {
    frame_schedule_tx: mpsc::UnboundedSender<Instant>,
}

impl FrameRequester {
    /// Spawn the scheduler task. `draw_tx` receives one `()` per draw.
    pub fn new(draw_tx: broadcast::Sender<()>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_scheduler(rx, draw_tx));
        Self {
            frame_schedule_tx: tx,
        }
    }

    pub fn schedule_frame(&self) {
        let _ = self.frame_schedule_tx.send(Instant::now());
    }

    pub fn schedule_frame_in(&self, dur: Duration) {
        let _ = self.frame_schedule_tx.send(Instant::now() + dur);
    }
}

#[cfg(test)]
impl FrameRequester {
    /// A requester whose requests go nowhere.
    pub(crate) fn test_dummy() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        FrameRequester {
            frame_schedule_tx: tx,
        }
    }
}

async fn run_scheduler(
    mut requests: mpsc::UnboundedReceiver<Instant>,
    draw_tx: broadcast::Sender<()>,
) {
    const IDLE: Duration = Duration::from_secs(60 * 60 * 24);
    let mut next_deadline: Option<Instant> = None;
    let mut last_emitted: Option<Instant> = None;
    loop {
        let target = next_deadline.unwrap_or_else(|| Instant::now() + IDLE);
        tokio::select! {
            request = requests.recv() => {
                let Some(mut draw_at) = request else {
                    break;
                };
                if let Some(last) = last_emitted {
                    draw_at = draw_at.max(last + MIN_FRAME_INTERVAL);
                }
                next_deadline = Some(next_deadline.map_or(draw_at, |cur| cur.min(draw_at)));
            }
            _ = tokio::time::sleep_until(target.into()) => {
                if next_deadline.take().is_some() {
                    last_emitted = Some(target);
                    let _ = draw_tx.send(());
                }
            }
        }
    }
}
