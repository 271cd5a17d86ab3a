use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::{PanelState, PresentationSink, NOT_FOUND_NOTICE};
use crate::common::{Frame, LandmarkResult};

/// Renders the panel as plain text lines on any writer.
pub struct TerminalPanel<W: Write + Send> {
    out: W,
    panel: PanelState,
    busy: bool,
    preview_path: Option<PathBuf>,
}

impl<W: Write + Send> TerminalPanel<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            panel: PanelState::Hidden,
            busy: false,
            preview_path: None,
        }
    }

    /// Also saves every captured frame to `path`; the format follows the extension.
    pub fn with_preview_path(mut self, path: Option<PathBuf>) -> Self {
        self.preview_path = path;
        self
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines(&mut self, lines: &[String]) {
        for line in lines {
            if let Err(e) = writeln!(self.out, "{}", line) {
                warn!("Failed to write to panel: {}", e);
                return;
            }
        }
        if let Err(e) = self.out.flush() {
            warn!("Failed to flush panel: {}", e);
        }
    }
}

impl<W: Write + Send> PresentationSink for TerminalPanel<W> {
    fn show_result(&mut self, result: &LandmarkResult) {
        info!("Detected landmark {}", result.name);
        self.write_lines(&[
            format!("Landmark:  {}", result.name),
            format!("Latitude:  {}", result.display_latitude()),
            format!("Longitude: {}", result.display_longitude()),
        ]);
        self.panel = PanelState::Expanded(result.clone());
    }

    fn show_empty(&mut self) {
        info!("No landmark detected");
        self.write_lines(&[NOT_FOUND_NOTICE.to_string()]);
    }

    fn hide(&mut self) {
        if self.panel != PanelState::Hidden {
            debug!("Collapsing landmark panel");
        }
        self.panel = PanelState::Hidden;
    }

    fn set_busy(&mut self, busy: bool) {
        if busy && !self.busy {
            self.write_lines(&["Detecting...".to_string()]);
        }
        self.busy = busy;
    }

    fn show_preview(&mut self, frame: &Frame) {
        let Some(path) = &self.preview_path else {
            return;
        };
        match frame.image().save(path) {
            Ok(_) => debug!("Wrote preview of frame {} to {}", frame.frame_id(), path.display()),
            Err(e) => warn!("Failed to write preview to {}: {}", path.display(), e),
        }
    }
}
