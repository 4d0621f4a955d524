use std::sync::atomic::{AtomicU64, Ordering};

/// What a single `refresh()` did to its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New data replaced the previous state and was rendered.
    Applied,
    /// The backend answered successfully but without a payload.
    Unchanged,
    /// The fetch failed; prior data was kept and a diagnostic shown.
    Failed,
    /// A later refresh had already applied its data, so this result was dropped.
    Stale,
}

/// Hands out increasing tickets at dispatch and tracks the newest completion,
/// so a slow response can never overwrite a fresher one.
#[derive(Debug, Default)]
pub struct RefreshSequencer {
    issued: AtomicU64,
}

impl RefreshSequencer {
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Ticket of the newest applied result, kept inside the component's locked
/// state. Only successful completions advance it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Watermark(u64);

impl Watermark {
    pub fn is_behind(&self, ticket: u64) -> bool {
        ticket < self.0
    }

    pub fn advance(&mut self, ticket: u64) {
        self.0 = self.0.max(ticket);
    }
}
