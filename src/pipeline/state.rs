use std::fmt;

/// Where the single in-flight run is. Only the orchestrator moves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionState {
    #[default]
    Idle,
    Capturing,
    Classifying,
}

impl DetectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionState::Idle => "Idle",
            DetectionState::Capturing => "Capturing",
            DetectionState::Classifying => "Classifying",
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == DetectionState::Idle
    }
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
