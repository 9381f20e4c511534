//! Lifecycle of one transcode run.

use std::fmt;

/// Where a [`TranscodePipeline`](crate::pipeline::TranscodePipeline) run stands.
///
/// `Idle → Opened → Streaming → Finalizing → Done`, or `Failed` from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Idle,
    Opened,
    Streaming,
    Finalizing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Whether moving from `self` to `next` follows the lifecycle.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, Opened) | (Opened, Streaming) | (Streaming, Finalizing) | (Finalizing, Done) => {
                true
            }
            (from, Failed) => !from.is_terminal(),
            // A finished pipeline may be reused for another run
            (Done | Failed, Opened) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Opened => "opened",
            PipelineState::Streaming => "streaming",
            PipelineState::Finalizing => "finalizing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}
