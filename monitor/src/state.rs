use motion_watch_common::frame::CapturedFrame;
use std::sync::Arc;
use tokio::sync::watch;

/// What viewers see: the last published frame and the motion verdict that
/// came with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    /// `None` until the first successful capture.
    pub frame: Option<CapturedFrame>,
    pub motion: bool,
}

/// Single-writer, many-reader store for the current [`Observation`].
///
/// The capture loop publishes whole records; readers clone an `Arc` to the
/// record that was current at the time of the call. A frame and its motion
/// flag always travel together.
#[derive(Clone)]
pub struct ObservationStore {
    tx: Arc<watch::Sender<Arc<Observation>>>,
}

impl ObservationStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Observation::default()));
        Self { tx: Arc::new(tx) }
    }

    /// Replace the current observation.
    pub fn publish(&self, observation: Observation) {
        // send_replace never fails, even with no receivers alive.
        self.tx.send_replace(Arc::new(observation));
    }

    pub fn snapshot(&self) -> Arc<Observation> {
        Arc::clone(&self.tx.borrow())
    }
}

impl Default for ObservationStore {
    fn default() -> Self {
        Self::new()
    }
}
