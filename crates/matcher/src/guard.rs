use std::sync::atomic::{AtomicU64, Ordering};

/// Largest sequence number a caller may supply: the biggest integer a
/// JavaScript client can count to exactly.
pub const MAX_CLIENT_SEQ: u64 = (1 << 53) - 1;

/// Sequence number of one issued query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueryTicket(u64);

impl QueryTicket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// Last-write-wins arbitration between overlapping queries.
///
/// Every query takes a ticket before it runs; when it finishes, its result is
/// delivered only if no later ticket was issued in the meantime.
#[derive(Debug, Default)]
pub struct QueryGuard {
    latest: AtomicU64,
}

impl QueryGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> QueryTicket {
        let bump = |seq: u64| Some(seq.saturating_add(1));
        let previous = match self.latest.fetch_update(Ordering::AcqRel, Ordering::Acquire, bump) {
            Ok(previous) | Err(previous) => previous,
        };
        QueryTicket(previous.saturating_add(1))
    }

    /// Register a caller-supplied sequence number. Returns a ticket for it
    /// when it is newer than anything seen so far, `None` when it is stale.
    /// Numbers above [`MAX_CLIENT_SEQ`] are refused and leave the guard
    /// untouched.
    pub fn observe(&self, seq: u64) -> Option<QueryTicket> {
        if seq > MAX_CLIENT_SEQ {
            return None;
        }
        let previous = self.latest.fetch_max(seq, Ordering::AcqRel);
        (seq > previous).then_some(QueryTicket(seq))
    }

    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    pub fn accept<T>(&self, ticket: QueryTicket, outcome: T) -> Option<T> {
        self.is_current(ticket).then_some(outcome)
    }
}
