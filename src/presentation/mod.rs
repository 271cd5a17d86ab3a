pub mod terminal_panel;

pub use terminal_panel::TerminalPanel;

use crate::common::{Frame, LandmarkResult};

pub const NOT_FOUND_NOTICE: &str = "Unable to detect the location";

/// Detail panel state.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelState {
    Hidden,
    Expanded(LandmarkResult),
}

/// Display side of the pipeline. Only ever driven from the orchestrator task.
pub trait PresentationSink: Send {
    /// Expands the detail panel with the landmark name and rounded coordinates.
    fn show_result(&mut self, result: &LandmarkResult);
    /// Short-lived "not found" notice; the panel stays collapsed.
    fn show_empty(&mut self);
    fn hide(&mut self);
    fn set_busy(&mut self, busy: bool);
    fn show_preview(&mut self, frame: &Frame);
}
