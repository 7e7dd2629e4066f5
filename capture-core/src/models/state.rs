use super::error::CaptureError;

/// Recording controller state machine.
///
/// State transitions:
/// ```text
/// idle → configuring → preview-ready → recording → finalizing → idle
///            ↓                             ↓            ↓
///          failed ←─────────────────────────────────────┘
/// ```
/// `teardown` returns to idle from any state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ControllerState {
    #[default]
    Idle,
    Configuring,
    PreviewReady,
    Recording,
    Finalizing,
    Failed(CaptureError),
}

impl ControllerState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_preview_ready(&self) -> bool {
        matches!(self, Self::PreviewReady)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Preview-ready or further along the lifecycle.
    pub fn has_preview(&self) -> bool {
        matches!(self, Self::PreviewReady | Self::Recording | Self::Finalizing)
    }

    pub fn failure(&self) -> Option<&CaptureError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::PreviewReady => "preview-ready",
            Self::Recording => "recording",
            Self::Finalizing => "finalizing",
            Self::Failed(_) => "failed",
        }
    }
}
