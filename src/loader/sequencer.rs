//! Monotonic request numbering.
//!
//! Every dispatch takes a [`Ticket`]. A response is only allowed to touch
//! table state if its ticket is still the latest one issued; anything newer
//! (another request, a veto, or an explicit block) makes it stale.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sequence number captured by a request at dispatch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn number(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ticket(#{})", self.0)
    }
}

/// Shared generation counter. Starts at 0, the first ticket is #1.
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    current: Arc<AtomicU64>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter and return the new ticket.
    pub fn issue(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Invalidate every outstanding ticket without dispatching anything.
    pub fn block(&self) {
        let ticket = self.issue();
        tracing::debug!(?ticket, "Active request blocked");
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_increase() {
        let seq = RequestSequencer::new();
        assert_eq!(seq.current(), 0);
        let a = seq.issue();
        let b = seq.issue();
        assert_eq!(a.number(), 1);
        assert!(b > a);
        assert!(!seq.is_current(a));
        assert!(seq.is_current(b));
    }

    #[test]
    fn test_block_invalidates() {
        let seq = RequestSequencer::new();
        let ticket = seq.issue();
        seq.block();
        assert!(!seq.is_current(ticket));
        assert_eq!(seq.current(), 2);
    }

    #[test]
    fn test_clones_share_counter() {
        let seq = RequestSequencer::new();
        let other = seq.clone();
        let ticket = seq.issue();
        other.issue();
        assert!(!seq.is_current(ticket));
    }
}
