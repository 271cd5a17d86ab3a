use std::sync::Arc;

use image::DynamicImage;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{classify, LandmarkDetector};
use crate::common::{Frame, Rotation};
use crate::error::ClassificationError;
use crate::pipeline::Completion;

struct ClassificationJob {
    request_id: Uuid,
    image: Arc<DynamicImage>,
    rotation: Rotation,
}

/// Owns the network worker. Jobs carry a shared view of the frame's pixels;
/// the frame itself stays with the caller until the completion arrives.
pub struct ClassificationClient {
    job_tx: Option<Sender<ClassificationJob>>,
    cancel_token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl ClassificationClient {
    /// Spawns the worker task; must be called from within a tokio runtime.
    pub fn start(detector: Arc<dyn LandmarkDetector>, completions: Sender<Completion>) -> Self {
        // One run in flight at a time, so a single slot is enough.
        let (job_tx, job_rx) = mpsc::channel(1);
        let cancel_token = CancellationToken::new();
        let worker = tokio::spawn(run_worker(
            detector,
            job_rx,
            completions,
            cancel_token.clone(),
        ));
        Self {
            job_tx: Some(job_tx),
            cancel_token,
            worker: Some(worker),
        }
    }

    pub fn classify(&self, frame: &Frame) -> Result<(), ClassificationError> {
        let job_tx = self
            .job_tx
            .as_ref()
            .ok_or(ClassificationError::WorkerStopped)?;
        let job = ClassificationJob {
            request_id: frame.request_id(),
            image: frame.shared_image(),
            rotation: frame.rotation(),
        };
        match job_tx.try_send(job) {
            Ok(_) => {
                debug!("Frame {} queued for classification", frame.frame_id());
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(ClassificationError::Busy),
            Err(TrySendError::Closed(_)) => Err(ClassificationError::WorkerStopped),
        }
    }

    /// Stops the worker, abandoning a request still on the wire, and waits
    /// for the task to finish.
    pub async fn shutdown(&mut self) -> Result<(), ClassificationError> {
        let worker = self
            .worker
            .take()
            .ok_or(ClassificationError::WorkerStopped)?;
        self.cancel_token.cancel();
        self.job_tx.take();
        if let Err(e) = worker.await {
            warn!("Classification worker ended abnormally: {}", e);
        }
        Ok(())
    }
}

impl Drop for ClassificationClient {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn run_worker(
    detector: Arc<dyn LandmarkDetector>,
    mut job_rx: Receiver<ClassificationJob>,
    completions: Sender<Completion>,
    cancel_token: CancellationToken,
) {
    info!("Classification worker started");
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            job = job_rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let result = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                debug!("Abandoning classification of {}", job.request_id);
                break;
            }
            result = classify(detector.as_ref(), &job.image, job.rotation) => result,
        };

        let completion = Completion::Classified {
            request_id: job.request_id,
            result,
        };
        if completions.send(completion).await.is_err() {
            warn!("Completion channel closed, stopping classification worker");
            break;
        }
    }
    info!("Classification worker stopped");
}
