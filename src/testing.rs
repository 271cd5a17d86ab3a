//! Scripted collaborators shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use async_trait::async_trait;
use image::DynamicImage;
use tokio::sync::mpsc::{self, Sender, UnboundedReceiver, UnboundedSender};
use tokio::sync::{watch, Notify};
use uuid::Uuid;

use crate::camera::Camera;
use crate::classification::LandmarkDetector;
use crate::common::{Frame, LandmarkCandidate, LandmarkResult, Rotation};
use crate::error::{CameraError, ClassificationError, TriggerError};
use crate::presentation::PresentationSink;
use crate::trigger::{TriggerEvent, TriggerSource};

struct CameraShared {
    pictures: AtomicUsize,
    shut_down: AtomicBool,
    gate: (Mutex<bool>, Condvar),
}

/// In-memory camera. Gated cameras block in `take_picture` until the probe
/// opens the gate.
pub(crate) struct ScriptedCamera {
    shared: Arc<CameraShared>,
    failing: bool,
    uninitializable: bool,
}

impl ScriptedCamera {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(CameraShared {
                pictures: AtomicUsize::new(0),
                shut_down: AtomicBool::new(false),
                gate: (Mutex::new(true), Condvar::new()),
            }),
            failing: false,
            uninitializable: false,
        }
    }

    pub(crate) fn gated(self) -> Self {
        *self.shared.gate.0.lock().unwrap() = false;
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub(crate) fn uninitializable(mut self) -> Self {
        self.uninitializable = true;
        self
    }

    pub(crate) fn probe(&self) -> CameraProbe {
        CameraProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Camera for ScriptedCamera {
    fn initialize(&mut self) -> Result<(), CameraError> {
        if self.uninitializable {
            return Err(CameraError::Device("no camera attached".to_string()));
        }
        Ok(())
    }

    fn take_picture(&mut self) -> Result<DynamicImage, CameraError> {
        let (lock, condvar) = &self.shared.gate;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = condvar.wait(open).unwrap();
        }
        drop(open);

        self.shared.pictures.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(CameraError::Device("sensor timeout".to_string()));
        }
        Ok(DynamicImage::new_rgb8(8, 6))
    }

    fn shut_down(&mut self) {
        self.shared.shut_down.store(true, Ordering::SeqCst);
    }

    fn rotation(&self) -> Rotation {
        Rotation::Deg90
    }
}

#[derive(Clone)]
pub(crate) struct CameraProbe {
    shared: Arc<CameraShared>,
}

impl CameraProbe {
    pub(crate) fn pictures_taken(&self) -> usize {
        self.shared.pictures.load(Ordering::SeqCst)
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::SeqCst)
    }

    pub(crate) fn open_gate(&self) {
        let (lock, condvar) = &self.shared.gate;
        *lock.lock().unwrap() = true;
        condvar.notify_all();
    }
}

struct DetectorShared {
    calls: AtomicUsize,
    called: Notify,
    gate: watch::Sender<bool>,
}

/// Detector that answers with a fixed outcome, optionally holding every call
/// until the probe opens the gate.
pub(crate) struct GatedDetector {
    shared: Arc<DetectorShared>,
    outcome: Result<Vec<LandmarkCandidate>, String>,
}

impl GatedDetector {
    fn with_outcome(outcome: Result<Vec<LandmarkCandidate>, String>) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            shared: Arc::new(DetectorShared {
                calls: AtomicUsize::new(0),
                called: Notify::new(),
                gate,
            }),
            outcome,
        }
    }

    pub(crate) fn answering(candidates: Vec<LandmarkCandidate>) -> Self {
        Self::with_outcome(Ok(candidates))
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::with_outcome(Err(message.to_string()))
    }

    pub(crate) fn gated(self) -> Self {
        self.shared.gate.send_replace(false);
        self
    }

    pub(crate) fn probe(&self) -> DetectorProbe {
        DetectorProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[async_trait]
impl LandmarkDetector for GatedDetector {
    async fn detect(
        &self,
        _image: &DynamicImage,
        _rotation: Rotation,
    ) -> Result<Vec<LandmarkCandidate>, ClassificationError> {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);
        self.shared.called.notify_one();

        let mut gate = self.shared.gate.subscribe();
        let opened = gate.wait_for(|open| *open).await.is_ok();
        if !opened {
            return Err(ClassificationError::WorkerStopped);
        }

        self.outcome.clone().map_err(ClassificationError::Api)
    }
}

#[derive(Clone)]
pub(crate) struct DetectorProbe {
    shared: Arc<DetectorShared>,
}

impl DetectorProbe {
    pub(crate) async fn wait_for_call(&self) {
        tokio::time::timeout(std::time::Duration::from_secs(2), self.shared.called.notified())
            .await
            .expect("detector was never called");
    }

    pub(crate) fn open_gate(&self) {
        self.shared.gate.send_replace(true);
    }

    pub(crate) fn calls(&self) -> usize {
        self.shared.calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SinkEvent {
    Busy(bool),
    Hidden,
    Result(LandmarkResult),
    Empty,
    Preview(Uuid),
}

/// Forwards every presentation call to a channel the test reads from.
pub(crate) struct RecordingSink {
    events: UnboundedSender<SinkEvent>,
}

impl RecordingSink {
    pub(crate) fn new() -> (Self, UnboundedReceiver<SinkEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }

    fn record(&self, event: SinkEvent) {
        let _ = self.events.send(event);
    }
}

impl PresentationSink for RecordingSink {
    fn show_result(&mut self, result: &LandmarkResult) {
        self.record(SinkEvent::Result(result.clone()));
    }

    fn show_empty(&mut self) {
        self.record(SinkEvent::Empty);
    }

    fn hide(&mut self) {
        self.record(SinkEvent::Hidden);
    }

    fn set_busy(&mut self, busy: bool) {
        self.record(SinkEvent::Busy(busy));
    }

    fn show_preview(&mut self, frame: &Frame) {
        self.record(SinkEvent::Preview(frame.frame_id()));
    }
}

struct TriggerShared {
    events: Mutex<Option<Sender<TriggerEvent>>>,
    close_calls: AtomicUsize,
}

/// Trigger driven by the test through a [`TriggerHandle`].
pub(crate) struct ScriptedTrigger {
    shared: Arc<TriggerShared>,
    unavailable: bool,
}

impl ScriptedTrigger {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(TriggerShared {
                events: Mutex::new(None),
                close_calls: AtomicUsize::new(0),
            }),
            unavailable: false,
        }
    }

    /// A trigger whose line can never be claimed.
    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    pub(crate) fn handle(&self) -> TriggerHandle {
        TriggerHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl TriggerSource for ScriptedTrigger {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn open(&mut self, events: Sender<TriggerEvent>) -> Result<(), TriggerError> {
        if self.unavailable {
            return Err(TriggerError::HardwareUnavailable(
                "scripted line missing".to_string(),
            ));
        }
        let mut slot = self.shared.events.lock().unwrap();
        if slot.is_some() {
            return Err(TriggerError::AlreadyOpen);
        }
        *slot = Some(events);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TriggerError> {
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        match self.shared.events.lock().unwrap().take() {
            Some(_) => Ok(()),
            None => Err(TriggerError::AlreadyClosed),
        }
    }
}

#[derive(Clone)]
pub(crate) struct TriggerHandle {
    shared: Arc<TriggerShared>,
}

impl TriggerHandle {
    fn send(&self, event: TriggerEvent) -> bool {
        match self.shared.events.lock().unwrap().as_ref() {
            Some(events) => events.try_send(event).is_ok(),
            None => false,
        }
    }

    /// Returns false when the trigger is not open.
    pub(crate) fn press(&self) -> bool {
        self.send(TriggerEvent::Pressed)
    }

    pub(crate) fn release(&self) -> bool {
        self.send(TriggerEvent::Released)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::SeqCst)
    }
}
