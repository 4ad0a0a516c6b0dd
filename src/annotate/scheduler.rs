//! ScanScheduler: deferred, coalescing per-block scans.
//!
//! A change notification schedules a scan for "the next turn" instead of
//! scanning immediately, so a burst of keystrokes costs one scan. Only the
//! most recent ticket per block survives.

use std::collections::BTreeMap;

use crate::annotate::document::BlockId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    New(u64),
    /// A pending ticket for the same block was replaced.
    Superseded { previous: u64, ticket: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct ScanScheduler {
    pending: BTreeMap<BlockId, u64>,
    next_ticket: u64,
}

impl ScanScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, block: BlockId) -> Scheduled {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        match self.pending.insert(block, ticket) {
            Some(previous) => Scheduled::Superseded { previous, ticket },
            None => Scheduled::New(ticket),
        }
    }

    /// Drop the pending scan for `block`. Returns true if one was pending.
    pub fn cancel(&mut self, block: BlockId) -> bool {
        self.pending.remove(&block).is_some()
    }

    pub fn is_pending(&self, block: BlockId) -> bool {
        self.pending.contains_key(&block)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take every pending scan, in block order.
    pub fn take_due(&mut self) -> Vec<(BlockId, u64)> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes() {
        let mut s = ScanScheduler::new();
        assert_eq!(s.schedule(BlockId(1)), Scheduled::New(0));
        assert_eq!(s.schedule(BlockId(1)), Scheduled::Superseded { previous: 0, ticket: 1 });
        assert_eq!(s.pending_len(), 1);
        assert_eq!(s.take_due(), vec![(BlockId(1), 1)]);
    }

    #[test]
    fn test_cancel() {
        let mut s = ScanScheduler::new();
        s.schedule(BlockId(2));
        assert!(s.cancel(BlockId(2)));
        assert!(!s.cancel(BlockId(2)));
        assert!(!s.is_pending(BlockId(2)));
        assert!(s.take_due().is_empty());
    }

    #[test]
    fn test_take_due_in_block_order_and_empties() {
        let mut s = ScanScheduler::new();
        s.schedule(BlockId(5));
        s.schedule(BlockId(0));
        let due: Vec<BlockId> = s.take_due().into_iter().map(|(b, _)| b).collect();
        assert_eq!(due, vec![BlockId(0), BlockId(5)]);
        assert_eq!(s.pending_len(), 0);
    }
}
