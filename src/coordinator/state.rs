use serde::Serialize;
use std::fmt;

/// Lifecycle state of a [`SignInCoordinator`](super::SignInCoordinator).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinatorState {
    /// No host attached yet, or the host went away while idle.
    #[default]
    New,
    /// Idle with an active host.
    Ready,
    /// Interactive sign-in requested before the host became active.
    Pending,
    /// Silent sign-in requested before the host became active.
    PendingSilent,
    /// Driving one sign-in flow.
    Busy,
}

impl CoordinatorState {
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending | Self::PendingSilent)
    }

    /// The flow a pending state is waiting to run.
    pub fn pending_mode(self) -> Option<FlowMode> {
        match self {
            Self::Pending => Some(FlowMode::Interactive),
            Self::PendingSilent => Some(FlowMode::Silent),
            _ => None,
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Ready => "READY",
            Self::Pending => "PENDING",
            Self::PendingSilent => "PENDING_SILENT",
            Self::Busy => "BUSY",
        };
        f.write_str(s)
    }
}

/// Whether a flow may show UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    Interactive,
    Silent,
}

impl FlowMode {
    /// State to park in until the host becomes active.
    pub fn pending_state(self) -> CoordinatorState {
        match self {
            Self::Interactive => CoordinatorState::Pending,
            Self::Silent => CoordinatorState::PendingSilent,
        }
    }
}

impl fmt::Display for FlowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interactive => f.write_str("interactive"),
            Self::Silent => f.write_str("silent"),
        }
    }
}

/// What a successful start did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Processing began immediately.
    Started,
    /// Parked until the host becomes active.
    Deferred,
    /// The same request is already being driven; nothing changed.
    AlreadyRunning,
}
