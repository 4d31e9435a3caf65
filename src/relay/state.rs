/// Lifecycle of one browser connection.
///
/// `Accepted` and `Connecting` buffer browser frames, `Ready` forwards them
/// live, `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Accepted,
    Connecting,
    Ready,
    Closed,
}

impl RelayState {
    /// Whether browser frames must wait in the pending queue.
    pub fn buffers_frames(self) -> bool {
        matches!(self, RelayState::Accepted | RelayState::Connecting)
    }

    pub fn is_terminal(self) -> bool {
        self == RelayState::Closed
    }
}

/// Why a relay stopped. Decides which side still needs closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    BrowserClosed,
    UpstreamClosed,
    UpstreamUnavailable,
    UpstreamSendFailure,
    BrowserSendFailure,
}

impl RelayOutcome {
    pub fn browser_gone(self) -> bool {
        self == RelayOutcome::BrowserClosed
    }
}
