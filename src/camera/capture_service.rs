use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;

use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use super::{Camera, FrameLedger};
use crate::common::{CaptureRequest, Frame};
use crate::error::CaptureError;
use crate::pipeline::Completion;

/// Runs the camera on a dedicated thread. At most one capture is outstanding;
/// asking again before it completes is rejected with [`CaptureError::Busy`].
pub struct CaptureService {
    request_tx: Option<std_mpsc::Sender<CaptureRequest>>,
    busy: Arc<AtomicBool>,
    ledger: Arc<FrameLedger>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureService {
    /// Initializes the camera and starts the worker. Completions are posted to
    /// `completions` as [`Completion::Captured`].
    pub fn start(
        mut camera: Box<dyn Camera>,
        completions: Sender<Completion>,
    ) -> Result<Self, CaptureError> {
        camera
            .initialize()
            .map_err(CaptureError::InitializationFailed)?;

        let (request_tx, request_rx) = std_mpsc::channel();
        let busy = Arc::new(AtomicBool::new(false));
        let ledger = FrameLedger::new();

        let worker = {
            let busy = Arc::clone(&busy);
            let ledger = Arc::clone(&ledger);
            std::thread::Builder::new()
                .name("camera-background".to_string())
                .spawn(move || run_worker(camera, request_rx, completions, busy, ledger))
                .map_err(|e| CaptureError::InitializationFailed(e.into()))?
        };

        Ok(Self {
            request_tx: Some(request_tx),
            busy,
            ledger,
            worker: Some(worker),
        })
    }

    /// Queues a capture for `request` and returns immediately.
    pub fn capture(&self, request: CaptureRequest) -> Result<(), CaptureError> {
        let request_tx = self.request_tx.as_ref().ok_or(CaptureError::WorkerStopped)?;
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::Busy);
        }
        if request_tx.send(request).is_err() {
            self.busy.store(false, Ordering::Release);
            return Err(CaptureError::WorkerStopped);
        }
        debug!("Capture {} handed to camera worker", request.request_id);
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn ledger(&self) -> Arc<FrameLedger> {
        Arc::clone(&self.ledger)
    }

    /// Stops accepting captures, lets the worker finish the one in progress,
    /// shuts the camera down and joins the thread.
    pub fn shutdown(&mut self) -> Result<(), CaptureError> {
        let worker = self.worker.take().ok_or(CaptureError::WorkerStopped)?;
        self.request_tx.take();
        worker.join().map_err(|_| CaptureError::WorkerPanicked)
    }
}

impl Drop for CaptureService {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.shutdown() {
                warn!("Capture worker did not stop cleanly: {}", e);
            }
        }
    }
}

fn run_worker(
    mut camera: Box<dyn Camera>,
    request_rx: std_mpsc::Receiver<CaptureRequest>,
    completions: Sender<Completion>,
    busy: Arc<AtomicBool>,
    ledger: Arc<FrameLedger>,
) {
    info!("Camera worker started");
    while let Ok(request) = request_rx.recv() {
        let result = camera
            .take_picture()
            .map(|image| ledger.admit(Frame::new(request, image, camera.rotation())))
            .map_err(|e| CaptureError::CaptureFailed(request.request_id, e));
        busy.store(false, Ordering::Release);

        if completions
            .blocking_send(Completion::Captured { request, result })
            .is_err()
        {
            // The frame inside the returned message is dropped, and released, here.
            warn!(
                "Completion channel closed, discarding capture {}",
                request.request_id
            );
        }
    }
    camera.shut_down();
    info!("Camera worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCamera;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn next_completion(rx: &mut mpsc::Receiver<Completion>) -> Completion {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("completion timed out")
            .expect("completion channel closed")
    }

    #[tokio::test]
    async fn capture_delivers_one_frame_per_request() {
        let camera = ScriptedCamera::new();
        let probe = camera.probe();
        let (tx, mut rx) = mpsc::channel(4);
        let mut service = CaptureService::start(Box::new(camera), tx).unwrap();

        let request = CaptureRequest::new();
        service.capture(request).unwrap();

        match next_completion(&mut rx).await {
            Completion::Captured { request: got, result } => {
                assert_eq!(got, request);
                let frame = result.expect("capture should succeed");
                assert_eq!(frame.request_id(), request.request_id);
                frame.release();
            }
            other => panic!("unexpected completion {:?}", other),
        }

        assert_eq!(service.ledger().outstanding(), 0);
        service.shutdown().unwrap();
        assert_eq!(probe.pictures_taken(), 1);
        assert!(probe.is_shut_down());
    }

    #[tokio::test]
    async fn second_capture_while_busy_is_rejected() {
        let camera = ScriptedCamera::new().gated();
        let probe = camera.probe();
        let (tx, mut rx) = mpsc::channel(4);
        let service = CaptureService::start(Box::new(camera), tx).unwrap();

        service.capture(CaptureRequest::new()).unwrap();
        assert!(matches!(
            service.capture(CaptureRequest::new()),
            Err(CaptureError::Busy)
        ));

        probe.open_gate();
        let _ = next_completion(&mut rx).await;
        assert!(!service.is_busy());
        assert_eq!(probe.pictures_taken(), 1);
    }

    #[tokio::test]
    async fn camera_failure_is_reported_as_capture_failed() {
        let camera = ScriptedCamera::new().failing();
        let (tx, mut rx) = mpsc::channel(4);
        let service = CaptureService::start(Box::new(camera), tx).unwrap();

        let request = CaptureRequest::new();
        service.capture(request).unwrap();

        match next_completion(&mut rx).await {
            Completion::Captured { result, .. } => match result {
                Err(CaptureError::CaptureFailed(id, _)) => assert_eq!(id, request.request_id),
                other => panic!("expected CaptureFailed, got {:?}", other),
            },
            other => panic!("unexpected completion {:?}", other),
        }
        assert_eq!(service.ledger().acquired(), 0);
    }

    #[tokio::test]
    async fn frames_are_released_when_nobody_listens() {
        let camera = ScriptedCamera::new();
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let mut service = CaptureService::start(Box::new(camera), tx).unwrap();

        service.capture(CaptureRequest::new()).unwrap();
        service.shutdown().unwrap();

        let ledger = service.ledger();
        assert_eq!(ledger.acquired(), 1);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn initialization_failure_prevents_start() {
        let camera = ScriptedCamera::new().uninitializable();
        let (tx, _rx) = mpsc::channel(4);
        assert!(matches!(
            CaptureService::start(Box::new(camera), tx),
            Err(CaptureError::InitializationFailed(_))
        ));
    }

    #[tokio::test]
    async fn shutdown_twice_reports_worker_stopped() {
        let (tx, _rx) = mpsc::channel(4);
        let mut service = CaptureService::start(Box::new(ScriptedCamera::new()), tx).unwrap();
        service.shutdown().unwrap();
        assert!(matches!(service.shutdown(), Err(CaptureError::WorkerStopped)));
        assert!(matches!(
            service.capture(CaptureRequest::new()),
            Err(CaptureError::WorkerStopped)
        ));
    }
}
