//! Single-slot, latest-value-wins channel between the audio thread and the
//! render thread.

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

use super::estimator::PitchEstimate;

/// Producer half. Never blocks: a full slot is replaced by the newer value.
pub struct LatestSender<T> {
    tx: Sender<T>,
    evict: Receiver<T>,
}

/// Consumer half
pub struct LatestReceiver<T> {
    rx: Receiver<T>,
}

pub type EstimateSender = LatestSender<PitchEstimate>;
pub type EstimateReceiver = LatestReceiver<PitchEstimate>;

/// Create a connected sender/receiver pair
pub fn latest_channel<T>() -> (LatestSender<T>, LatestReceiver<T>) {
    let (tx, rx) = bounded(1);
    (
        LatestSender {
            tx,
            evict: rx.clone(),
        },
        LatestReceiver { rx },
    )
}

impl<T> LatestSender<T> {
    /// Post a value, dropping a stale unread one. Returns whether it was queued.
    pub fn send(&self, value: T) -> bool {
        match self.tx.try_send(value) {
            Ok(()) => true,
            Err(TrySendError::Full(value)) => {
                let _ = self.evict.try_recv();
                // Consumer may have taken the slot meanwhile; either way one retry is enough
                !matches!(self.tx.try_send(value), Err(TrySendError::Disconnected(_)))
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl<T> LatestReceiver<T> {
    /// Most recent value posted since the last call, if any
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_latest_value_wins() {
        let (tx, rx) = latest_channel();
        assert!(tx.send(1));
        assert!(tx.send(2));
        assert!(tx.send(3));
        assert_eq!(rx.latest(), Some(3));
        assert_eq!(rx.latest(), None);
    }

    #[test]
    fn test_values_arrive_in_order_across_threads() {
        let (tx, rx) = latest_channel();
        let producer = thread::spawn(move || {
            for i in 0..10_000u32 {
                tx.send(i);
            }
        });

        let mut last_seen = None;
        while !producer.is_finished() {
            if let Some(value) = rx.latest() {
                if let Some(previous) = last_seen {
                    assert!(value > previous, "{} after {}", value, previous);
                }
                last_seen = Some(value);
            }
        }
        producer.join().expect("producer thread");
        if let Some(value) = rx.latest() {
            last_seen = Some(value);
        }
        assert_eq!(last_seen, Some(9_999));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = latest_channel();
        drop(rx);
        // The sender keeps an eviction handle, so the channel stays connected
        assert!(tx.send(5u8));
    }
}
