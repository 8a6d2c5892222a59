//! Latest-frame hand-off between the pipeline and viewer connections.
//!
//! The pipeline is the sole writer: `publish` atomically replaces the
//! current encoded frame and wakes every waiting viewer. Viewers copy the
//! `Arc` out under the lock, so a publish never blocks on a slow viewer and
//! a viewer never observes a partially written buffer. A viewer that cannot
//! keep up simply skips to whatever is latest when it next asks.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

struct HubState {
    seq: u64,
    latest: Option<Arc<Vec<u8>>>,
}

pub struct FrameHub {
    state: Mutex<HubState>,
    cond: Condvar,
}

impl FrameHub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState {
                seq: 0,
                latest: None,
            }),
            cond: Condvar::new(),
        }
    }

    /// Replace the current frame and notify all waiting viewers.
    pub fn publish(&self, jpeg: Vec<u8>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.seq += 1;
        state.latest = Some(Arc::new(jpeg));
        drop(state);
        self.cond.notify_all();
    }

    /// Current frame, if any has been published yet.
    pub fn latest(&self) -> Option<(u64, Arc<Vec<u8>>)> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.latest.as_ref().map(|frame| (state.seq, frame.clone()))
    }

    /// Block until a frame newer than `last_seq` is published, or until the
    /// timeout elapses (so callers can poll a shutdown flag).
    pub fn wait_newer(&self, last_seq: u64, timeout: Duration) -> Option<(u64, Arc<Vec<u8>>)> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if state.seq > last_seq {
                if let Some(frame) = state.latest.as_ref() {
                    return Some((state.seq, frame.clone()));
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _timed_out) = self
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn latest_is_none_before_first_publish() {
        let hub = FrameHub::new();
        assert!(hub.latest().is_none());
        assert!(hub.wait_newer(0, Duration::from_millis(10)).is_none());
    }

    #[test]
    fn publish_bumps_sequence_and_replaces_frame() {
        let hub = FrameHub::new();
        hub.publish(vec![1]);
        hub.publish(vec![2]);

        let (seq, frame) = hub.latest().unwrap();
        assert_eq!(seq, 2);
        assert_eq!(*frame, vec![2]);
    }

    #[test]
    fn wait_newer_returns_only_newer_frames() {
        let hub = FrameHub::new();
        hub.publish(vec![1]);

        let (seq, _) = hub.wait_newer(0, Duration::from_millis(10)).unwrap();
        assert_eq!(seq, 1);
        // Already seen seq 1: times out.
        assert!(hub.wait_newer(1, Duration::from_millis(10)).is_none());
    }

    #[test]
    fn waiting_viewer_wakes_on_publish() {
        let hub = Arc::new(FrameHub::new());
        let waiter = {
            let hub = hub.clone();
            thread::spawn(move || hub.wait_newer(0, Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(20));
        hub.publish(vec![9]);

        let (seq, frame) = waiter.join().unwrap().unwrap();
        assert_eq!(seq, 1);
        assert_eq!(*frame, vec![9]);
    }
}
