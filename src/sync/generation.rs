use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Guard for discarding answers that arrive after their requester moved on
///
/// The data manager does not track who is listening. A view starts a load
/// with [`Generation::begin`] and applies a delivery only while its
/// [`Ticket`] is still current; beginning a new load or calling
/// [`Generation::invalidate`] (e.g. on unmount) makes older tickets stale.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

/// Proof of which load a delivery belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load, making every earlier ticket stale
    pub fn begin(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Make every outstanding ticket stale
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_ticket_is_current() {
        let generation = Generation::new();
        let first = generation.begin();
        assert!(generation.is_current(first));

        let second = generation.begin();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }

    #[test]
    fn invalidate_stales_outstanding_tickets() {
        let generation = Generation::new();
        let ticket = generation.begin();

        generation.invalidate();
        assert!(!generation.is_current(ticket));
    }

    #[test]
    fn clones_share_state() {
        let generation = Generation::new();
        let view = generation.clone();

        let ticket = view.begin();
        generation.invalidate();
        assert!(!view.is_current(ticket));
    }
}
