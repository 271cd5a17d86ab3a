use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Completion, DetectionState};
use crate::camera::{Camera, CaptureService, FrameLedger};
use crate::classification::{ClassificationClient, LandmarkDetector};
use crate::common::{CaptureRequest, Frame};
use crate::config::ChannelConfiguration;
use crate::error::{AppError, CaptureError};
use crate::presentation::PresentationSink;
use crate::trigger::{TriggerEvent, TriggerSource};

/// Drives trigger press → capture → classify → display, one run at a time.
///
/// Everything mutable (state, the held frame, the sink) lives here and is only
/// touched from the task running [`Orchestrator::run`]. Workers report back
/// through a single completion channel.
pub struct Orchestrator {
    trigger: Box<dyn TriggerSource>,
    trigger_open: bool,
    trigger_rx: Option<mpsc::Receiver<TriggerEvent>>,
    capture: CaptureService,
    classifier: ClassificationClient,
    completion_rx: mpsc::Receiver<Completion>,
    sink: Box<dyn PresentationSink>,
    state: DetectionState,
    state_tx: watch::Sender<DetectionState>,
    in_flight: Option<CaptureRequest>,
    held_frame: Option<Frame>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new(ChannelConfiguration::default())
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DetectionState> {
        self.state_tx.subscribe()
    }

    pub fn frame_ledger(&self) -> Arc<FrameLedger> {
        self.capture.ledger()
    }

    /// False when the trigger line could not be opened.
    pub fn has_trigger(&self) -> bool {
        self.trigger_open
    }

    /// Processes events until `cancel_token` fires, then tears everything down.
    pub async fn run(mut self, cancel_token: CancellationToken) -> Result<(), AppError> {
        info!("Orchestrator started, waiting for trigger presses");
        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                event = next_trigger(&mut self.trigger_rx) => match event {
                    Some(event) => self.on_trigger(event),
                    None => {
                        warn!("Trigger source went away, no further captures will start");
                        self.trigger_rx = None;
                    }
                },
                completion = self.completion_rx.recv() => match completion {
                    Some(completion) => self.on_completion(completion),
                    None => {
                        error!("Both workers are gone, stopping orchestrator");
                        break;
                    }
                },
            }
        }
        self.teardown().await;
        Ok(())
    }

    fn on_trigger(&mut self, event: TriggerEvent) {
        if event != TriggerEvent::Pressed {
            return;
        }
        if !self.state.is_idle() {
            debug!("Ignoring trigger press while {}", self.state);
            return;
        }

        let request = CaptureRequest::new();
        info!("Trigger pressed, starting capture {}", request.request_id);
        self.sink.set_busy(true);
        self.sink.hide();
        self.in_flight = Some(request);
        self.set_state(DetectionState::Capturing);

        if let Err(e) = self.capture.capture(request) {
            match e {
                CaptureError::Busy => debug!("Camera still busy, ignoring press"),
                other => error!("Could not start capture: {}", other),
            }
            self.finish_run();
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        let request_id = completion.request_id();
        if self.in_flight.map(|request| request.request_id) != Some(request_id) {
            // Dropping the completion releases any frame it carries.
            warn!("Discarding stale completion for request {}", request_id);
            return;
        }

        match completion {
            Completion::Captured { result: Ok(frame), .. } => {
                debug!("Captured {:?}", frame);
                self.sink.show_preview(&frame);
                match self.classifier.classify(&frame) {
                    Ok(()) => {
                        self.held_frame = Some(frame);
                        self.set_state(DetectionState::Classifying);
                    }
                    Err(e) => {
                        error!("Could not start classification: {}", e);
                        frame.release();
                        self.finish_run();
                    }
                }
            }
            Completion::Captured { result: Err(e), .. } => {
                error!("Capture failed: {}", e);
                self.finish_run();
            }
            Completion::Classified { result, .. } => {
                self.release_held_frame();
                self.sink.set_busy(false);
                match result {
                    Ok(Some(landmark)) => self.sink.show_result(&landmark),
                    Ok(None) => self.sink.show_empty(),
                    Err(e) => warn!("Classification failed: {}", e),
                }
                self.in_flight = None;
                self.set_state(DetectionState::Idle);
            }
        }
    }

    /// Ends the current run without a result.
    fn finish_run(&mut self) {
        self.release_held_frame();
        self.sink.set_busy(false);
        self.in_flight = None;
        self.set_state(DetectionState::Idle);
    }

    fn release_held_frame(&mut self) {
        if let Some(frame) = self.held_frame.take() {
            frame.release();
        }
    }

    fn set_state(&mut self, state: DetectionState) {
        if self.state != state {
            debug!("Detection state {} -> {}", self.state, state);
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }

    async fn teardown(&mut self) {
        info!("Shutting down orchestrator");
        self.trigger_rx = None;

        if !self.state.is_idle() {
            self.finish_run();
        }

        // Workers must not block on a full channel while being joined; frames
        // still queued are released as they are dropped.
        self.completion_rx.close();
        while let Ok(completion) = self.completion_rx.try_recv() {
            debug!(
                "Discarding completion for request {} during shutdown",
                completion.request_id()
            );
        }

        if let Err(e) = self.capture.shutdown() {
            warn!("Capture worker shutdown: {}", e);
        }
        if let Err(e) = self.classifier.shutdown().await {
            warn!("Classification worker shutdown: {}", e);
        }

        if self.trigger_open {
            self.trigger_open = false;
            if let Err(e) = self.trigger.close() {
                warn!("Failed to release trigger line: {}", e);
            }
        }

        let ledger = self.capture.ledger();
        info!(
            "Orchestrator stopped ({} frames captured, {} outstanding)",
            ledger.acquired(),
            ledger.outstanding()
        );
    }
}

async fn next_trigger(trigger_rx: &mut Option<mpsc::Receiver<TriggerEvent>>) -> Option<TriggerEvent> {
    match trigger_rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

pub struct OrchestratorBuilder {
    channels: ChannelConfiguration,
    trigger: Option<Box<dyn TriggerSource>>,
    camera: Option<Box<dyn Camera>>,
    detector: Option<Arc<dyn LandmarkDetector>>,
    sink: Option<Box<dyn PresentationSink>>,
}

impl OrchestratorBuilder {
    pub fn new(channels: ChannelConfiguration) -> Self {
        Self {
            channels,
            trigger: None,
            camera: None,
            detector: None,
            sink: None,
        }
    }

    pub fn trigger(mut self, trigger: Box<dyn TriggerSource>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn camera(mut self, camera: Box<dyn Camera>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn LandmarkDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn sink(mut self, sink: Box<dyn PresentationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    // Adjusts the trigger buffer size, this will override the configuration.
    pub fn trigger_buffer_size(mut self, trigger_buffer_size: usize) -> Self {
        self.channels.trigger_buffer_size = trigger_buffer_size;
        self
    }

    // Adjusts the completion buffer size, this will override the configuration.
    pub fn completion_buffer_size(mut self, completion_buffer_size: usize) -> Self {
        self.channels.completion_buffer_size = completion_buffer_size;
        self
    }

    /// Starts both workers and opens the trigger line. Must run inside a tokio
    /// runtime. A trigger that fails to open leaves the orchestrator running
    /// without one.
    pub fn build(self) -> Result<Orchestrator, AppError> {
        let mut trigger = self
            .trigger
            .ok_or_else(|| AppError::Orchestrator("Trigger not set".to_string()))?;
        let camera = self
            .camera
            .ok_or_else(|| AppError::Orchestrator("Camera not set".to_string()))?;
        let detector = self
            .detector
            .ok_or_else(|| AppError::Orchestrator("Detector not set".to_string()))?;
        let sink = self
            .sink
            .ok_or_else(|| AppError::Orchestrator("Presentation sink not set".to_string()))?;

        let (completion_tx, completion_rx) =
            mpsc::channel(self.channels.completion_buffer_size.max(1));
        let capture = CaptureService::start(camera, completion_tx.clone())?;
        let classifier = ClassificationClient::start(detector, completion_tx);

        let (trigger_tx, trigger_rx) = mpsc::channel(self.channels.trigger_buffer_size.max(1));
        let (trigger_open, trigger_rx) = match trigger.open(trigger_tx) {
            Ok(()) => {
                info!("Trigger {} ready", trigger.name());
                (true, Some(trigger_rx))
            }
            Err(e) => {
                warn!(
                    "Could not open trigger {} ({}), running without it",
                    trigger.name(),
                    e
                );
                (false, None)
            }
        };

        let (state_tx, _) = watch::channel(DetectionState::Idle);
        Ok(Orchestrator {
            trigger,
            trigger_open,
            trigger_rx,
            capture,
            classifier,
            completion_rx,
            sink,
            state: DetectionState::Idle,
            state_tx,
            in_flight: None,
            held_frame: None,
        })
    }
}
