use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::common::{Frame, FrameRecycler};

/// Counts frames handed out by the capture worker and frames given back.
#[derive(Debug, Default)]
pub struct FrameLedger {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl FrameLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a freshly captured frame so its release is accounted for.
    pub fn admit(self: &Arc<Self>, frame: Frame) -> Frame {
        self.acquired.fetch_add(1, Ordering::AcqRel);
        frame.with_recycler(Arc::clone(self) as Arc<dyn FrameRecycler>)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::Acquire)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::Acquire)
    }

    pub fn outstanding(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

impl FrameRecycler for FrameLedger {
    fn recycle(&self, frame_id: Uuid) {
        self.released.fetch_add(1, Ordering::AcqRel);
        tracing::debug!("Released frame {}", frame_id);
    }
}
