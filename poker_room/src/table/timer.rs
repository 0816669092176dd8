//! Per-table turn timer.
//!
//! The timer sleeps in its own task and, on expiry, posts
//! [`TableMessage::TurnExpired`] back into the table's inbox. Each start gets
//! a fresh serial so an expiry that raced with a player's action is ignored
//! by the actor.

use tokio::{sync::mpsc, task::JoinHandle, time::Duration};

use super::messages::TableMessage;
use crate::game::entities::SeatIndex;

pub struct TurnTimer {
    sender: mpsc::WeakSender<TableMessage>,
    duration: Duration,
    task: Option<JoinHandle<()>>,
    serial: u64,
    current: Option<(u64, SeatIndex)>,
}

impl TurnTimer {
    /// The timer holds a weak sender so it never keeps a closed table alive.
    pub fn new(sender: mpsc::WeakSender<TableMessage>, duration: Duration) -> Self {
        Self {
            sender,
            duration,
            task: None,
            serial: 0,
            current: None,
        }
    }

    /// Start timing `seat`, replacing any running countdown.
    pub fn start(&mut self, seat: SeatIndex) -> u64 {
        self.cancel();
        self.serial += 1;
        let serial = self.serial;
        let sender = self.sender.clone();
        let duration = self.duration;

        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(sender) = sender.upgrade() {
                let _ = sender.send(TableMessage::TurnExpired { serial }).await;
            }
        }));
        self.current = Some((serial, seat));
        serial
    }

    /// Restart the countdown for the seat already being timed.
    pub fn reset(&mut self) -> Option<u64> {
        let (_, seat) = self.current?;
        Some(self.start(seat))
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.current = None;
    }

    /// Whether an expiry with `serial` belongs to the running countdown.
    pub fn is_current(&self, serial: u64) -> bool {
        self.current.is_some_and(|(s, _)| s == serial)
    }

    pub fn active_seat(&self) -> Option<SeatIndex> {
        self.current.map(|(_, seat)| seat)
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expiry_posts_serial() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = TurnTimer::new(tx.downgrade(), Duration::from_secs(30));

        let serial = timer.start(2);
        assert_eq!(timer.active_seat(), Some(2));

        tokio::time::sleep(Duration::from_secs(31)).await;
        match rx.recv().await {
            Some(TableMessage::TurnExpired { serial: got }) => assert_eq!(got, serial),
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(timer.is_current(serial));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_invalidates_old_serial() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = TurnTimer::new(tx.downgrade(), Duration::from_secs(10));

        let first = timer.start(0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        let second = timer.reset().unwrap();
        assert_ne!(first, second);
        assert!(!timer.is_current(first));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(5)).await;
        match rx.recv().await {
            Some(TableMessage::TurnExpired { serial }) => assert_eq!(serial, second),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_expiry() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = TurnTimer::new(tx.downgrade(), Duration::from_secs(5));

        let serial = timer.start(1);
        timer.cancel();
        assert!(!timer.is_current(serial));
        assert_eq!(timer.reset(), None);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
