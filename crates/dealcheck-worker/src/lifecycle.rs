/// Where a worker version is in its life
///
/// ```text
/// Parsed -> Installing -> Installed -> Activating -> Activated
///               \
///                -> Redundant (install failed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, nothing run yet
    Parsed,
    Installing,
    /// Shell cached, ready to take over
    Installed,
    Activating,
    /// Serving fetch, push and sync events
    Activated,
    /// Discarded; the previous version (if any) keeps serving
    Redundant,
}

impl WorkerState {
    pub fn is_active(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}
