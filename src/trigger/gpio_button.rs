use std::fs;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{deliver, TriggerEvent, TriggerSource};
use crate::error::TriggerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Unopened,
    Open,
    Closed,
}

/// Push button wired to a sysfs GPIO line, sampled on its own thread.
pub struct GpioButton {
    line: u32,
    root: PathBuf,
    active_low: bool,
    poll_interval: Duration,
    state: LineState,
    exported: bool,
    cancel_token: CancellationToken,
    poll_thread: Option<JoinHandle<()>>,
}

impl GpioButton {
    pub fn new(line: u32, root: PathBuf, active_low: bool, poll_interval: Duration) -> Self {
        Self {
            line,
            root,
            active_low,
            poll_interval,
            state: LineState::Unopened,
            exported: false,
            cancel_token: CancellationToken::new(),
            poll_thread: None,
        }
    }

    fn line_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.line))
    }

    fn export(&mut self) -> Result<(), TriggerError> {
        fs::write(self.root.join("export"), self.line.to_string()).map_err(|e| {
            TriggerError::HardwareUnavailable(format!(
                "could not export GPIO line {}: {}",
                self.line, e
            ))
        })?;
        self.exported = true;
        debug!("Exported GPIO line {}", self.line);
        Ok(())
    }

    fn unexport(&mut self) -> Result<(), TriggerError> {
        if !self.exported {
            return Ok(());
        }
        self.exported = false;
        fs::write(self.root.join("unexport"), self.line.to_string())
            .map_err(TriggerError::ReleaseError)
    }

    fn prepare_line(&self) -> Result<bool, TriggerError> {
        let line_dir = self.line_dir();
        let direction = line_dir.join("direction");
        if direction.exists() {
            fs::write(&direction, "in").map_err(|e| {
                TriggerError::HardwareUnavailable(format!(
                    "could not configure GPIO line {} as input: {}",
                    self.line, e
                ))
            })?;
        }
        read_pressed(&line_dir.join("value"), self.active_low).map_err(|e| {
            TriggerError::HardwareUnavailable(format!(
                "could not read GPIO line {}: {}",
                self.line, e
            ))
        })
    }
}

impl TriggerSource for GpioButton {
    fn name(&self) -> &'static str {
        "gpio-button"
    }

    fn open(&mut self, events: Sender<TriggerEvent>) -> Result<(), TriggerError> {
        if self.state == LineState::Open {
            return Err(TriggerError::AlreadyOpen);
        }

        if !self.line_dir().exists() {
            self.export()?;
        }
        let initially_pressed = match self.prepare_line() {
            Ok(pressed) => pressed,
            Err(e) => {
                // Hand back a line we exported ourselves before giving up
                if let Err(release) = self.unexport() {
                    warn!("Failed to unexport GPIO line {}: {}", self.line, release);
                }
                return Err(e);
            }
        };

        let value_path = self.line_dir().join("value");
        let active_low = self.active_low;
        let poll_interval = self.poll_interval;
        let line = self.line;
        let cancel_token = CancellationToken::new();
        self.cancel_token = cancel_token.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("gpio-button-{}", line))
            .spawn(move || {
                poll_line(
                    &value_path,
                    active_low,
                    poll_interval,
                    initially_pressed,
                    events,
                    cancel_token,
                )
            });
        match spawned {
            Ok(handle) => self.poll_thread = Some(handle),
            Err(e) => {
                if let Err(release) = self.unexport() {
                    warn!("Failed to unexport GPIO line {}: {}", self.line, release);
                }
                return Err(TriggerError::HardwareUnavailable(format!(
                    "could not start GPIO poller: {}",
                    e
                )));
            }
        }

        self.state = LineState::Open;
        info!(
            "Opened GPIO line {} ({})",
            self.line,
            if self.active_low {
                "pressed when low"
            } else {
                "pressed when high"
            }
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), TriggerError> {
        match self.state {
            LineState::Closed => return Err(TriggerError::AlreadyClosed),
            LineState::Unopened => {
                self.state = LineState::Closed;
                return Ok(());
            }
            LineState::Open => {}
        }
        self.state = LineState::Closed;
        self.cancel_token.cancel();
        if let Some(thread) = self.poll_thread.take() {
            if thread.join().is_err() {
                warn!("GPIO poller for line {} panicked", self.line);
            }
        }
        self.unexport()?;
        info!("Closed GPIO line {}", self.line);
        Ok(())
    }
}

impl Drop for GpioButton {
    fn drop(&mut self) {
        if self.state == LineState::Open {
            if let Err(e) = self.close() {
                warn!("Failed to close GPIO line {}: {}", self.line, e);
            }
        }
    }
}

fn read_pressed(value_path: &Path, active_low: bool) -> std::io::Result<bool> {
    let raw = fs::read_to_string(value_path)?;
    let high = match raw.trim() {
        "0" => false,
        "1" => true,
        other => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unexpected GPIO level {:?}", other),
            ))
        }
    };
    Ok(high != active_low)
}

fn poll_line(
    value_path: &Path,
    active_low: bool,
    poll_interval: Duration,
    initially_pressed: bool,
    events: Sender<TriggerEvent>,
    cancel_token: CancellationToken,
) {
    let mut pressed = initially_pressed;
    let mut read_failing = false;
    while !cancel_token.is_cancelled() {
        std::thread::sleep(poll_interval);
        match read_pressed(value_path, active_low) {
            Ok(now_pressed) => {
                read_failing = false;
                if now_pressed == pressed {
                    continue;
                }
                pressed = now_pressed;
                let event = if pressed {
                    TriggerEvent::Pressed
                } else {
                    TriggerEvent::Released
                };
                debug!("GPIO edge: {:?}", event);
                if !deliver(&events, event) {
                    break;
                }
            }
            Err(e) => {
                if !read_failing {
                    warn!("Failed to sample {}: {}", value_path.display(), e);
                }
                read_failing = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn fake_sysfs(line: Option<(u32, &str)>) -> PathBuf {
        let root = std::env::temp_dir().join(format!("landmark-lens-gpio-{}", Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();
        if let Some((line, level)) = line {
            let line_dir = root.join(format!("gpio{}", line));
            fs::create_dir_all(&line_dir).unwrap();
            fs::write(line_dir.join("value"), level).unwrap();
            fs::write(line_dir.join("direction"), "out").unwrap();
        }
        root
    }

    fn button(root: &Path) -> GpioButton {
        GpioButton::new(5, root.to_path_buf(), true, Duration::from_millis(5))
    }

    async fn next_event(rx: &mut mpsc::Receiver<TriggerEvent>) -> Option<TriggerEvent> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn active_low_button_reports_press_and_release() {
        let root = fake_sysfs(Some((5, "1\n")));
        let (tx, mut rx) = mpsc::channel(8);
        let mut button = button(&root);
        button.open(tx).expect("line should open");

        assert_eq!(
            fs::read_to_string(root.join("gpio5/direction")).unwrap(),
            "in"
        );

        fs::write(root.join("gpio5/value"), "0\n").unwrap();
        assert_eq!(next_event(&mut rx).await, Some(TriggerEvent::Pressed));

        fs::write(root.join("gpio5/value"), "1\n").unwrap();
        assert_eq!(next_event(&mut rx).await, Some(TriggerEvent::Released));

        button.close().expect("close should succeed");
        fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn missing_sysfs_root_is_hardware_unavailable() {
        let root = std::env::temp_dir().join(format!("landmark-lens-missing-{}", Uuid::new_v4()));
        let (tx, _rx) = mpsc::channel(8);
        let mut button = button(&root);
        let result = button.open(tx);
        assert!(matches!(result, Err(TriggerError::HardwareUnavailable(_))));
    }

    #[tokio::test]
    async fn partially_initialized_line_is_unexported() {
        // Export "succeeds" but the line directory never shows up.
        let root = fake_sysfs(None);
        let (tx, _rx) = mpsc::channel(8);
        let mut button = button(&root);

        let result = button.open(tx);

        assert!(matches!(result, Err(TriggerError::HardwareUnavailable(_))));
        assert_eq!(fs::read_to_string(root.join("export")).unwrap(), "5");
        assert_eq!(fs::read_to_string(root.join("unexport")).unwrap(), "5");
        fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn closing_twice_reports_already_closed() {
        let root = fake_sysfs(Some((5, "1")));
        let (tx, _rx) = mpsc::channel(8);
        let mut button = button(&root);
        button.open(tx).unwrap();

        assert!(button.close().is_ok());
        assert!(matches!(button.close(), Err(TriggerError::AlreadyClosed)));
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn level_mapping_respects_logic_polarity() {
        let root = fake_sysfs(Some((5, "0")));
        let value = root.join("gpio5/value");
        assert!(read_pressed(&value, true).unwrap());
        assert!(!read_pressed(&value, false).unwrap());
        fs::write(&value, "garbage").unwrap();
        assert!(read_pressed(&value, true).is_err());
        fs::remove_dir_all(root).ok();
    }
}
