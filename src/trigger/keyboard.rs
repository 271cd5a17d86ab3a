use std::io::BufRead;

use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{deliver, TriggerEvent, TriggerSource};
use crate::error::TriggerError;

type LineReader = Box<dyn BufRead + Send>;

/// Treats every Enter on the input as a full button press. Handy on a bench
/// without the button wired up.
pub struct KeyboardTrigger {
    reader: Option<LineReader>,
    cancel_token: Option<CancellationToken>,
    closed: bool,
}

impl KeyboardTrigger {
    pub fn stdin() -> Self {
        Self::from_reader(Box::new(std::io::BufReader::new(std::io::stdin())))
    }

    pub fn from_reader(reader: LineReader) -> Self {
        Self {
            reader: Some(reader),
            cancel_token: None,
            closed: false,
        }
    }
}

impl TriggerSource for KeyboardTrigger {
    fn name(&self) -> &'static str {
        "keyboard"
    }

    fn open(&mut self, events: Sender<TriggerEvent>) -> Result<(), TriggerError> {
        if self.cancel_token.is_some() {
            return Err(TriggerError::AlreadyOpen);
        }
        let mut reader = self.reader.take().ok_or_else(|| {
            TriggerError::HardwareUnavailable("keyboard input was already consumed".to_string())
        })?;
        let cancel_token = CancellationToken::new();
        let thread_token = cancel_token.clone();

        // Blocking reads cannot be interrupted, so the reader thread is left
        // detached and notices cancellation on the next line or EOF.
        std::thread::Builder::new()
            .name("keyboard-trigger".to_string())
            .spawn(move || {
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line) {
                        Ok(0) => {
                            debug!("Keyboard input closed");
                            break;
                        }
                        Ok(_) if thread_token.is_cancelled() => break,
                        Ok(_) => {
                            if !deliver(&events, TriggerEvent::Pressed)
                                || !deliver(&events, TriggerEvent::Released)
                            {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Failed to read keyboard input: {}", e);
                            break;
                        }
                    }
                }
            })
            .map_err(|e| {
                TriggerError::HardwareUnavailable(format!("could not start keyboard reader: {}", e))
            })?;

        self.cancel_token = Some(cancel_token);
        info!("Keyboard trigger ready, press Enter to capture");
        Ok(())
    }

    fn close(&mut self) -> Result<(), TriggerError> {
        if self.closed {
            return Err(TriggerError::AlreadyClosed);
        }
        self.closed = true;
        if let Some(cancel_token) = &self.cancel_token {
            cancel_token.cancel();
        }
        Ok(())
    }
}
