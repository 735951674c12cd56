use std::fmt;

/// Where the poll loop currently is.
///
/// `Failed` is sticky until the next cycle starts; the last good snapshot
/// stays published throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    /// Waiting for the next tick or refresh request
    #[default]
    Idle,
    /// Logging in to the portal
    Authenticating,
    /// Resolving sites and fetching sensor pages
    Fetching,
    /// Swapping in the new snapshot and notifying listeners
    Publishing,
    /// The last cycle was aborted
    Failed,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::Authenticating => "authenticating",
            CycleState::Fetching => "fetching",
            CycleState::Publishing => "publishing",
            CycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}
