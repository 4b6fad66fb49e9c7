//! Refresh tickets for stale-result suppression.
//!
//! Every asynchronous fetch is issued a [`Ticket`] recording what it was
//! fetched for and when. When the fetch resolves, the [`RefreshGate`]
//! decides whether the result may still be applied:
//!
//! - the ticket's target must equal the current selection, and
//! - no newer ticket may already have been applied.
//!
//! The gate never cancels anything; late results are simply discarded.

/// Tag carried by one in-flight refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    target: K,
    seq: u64,
}

impl<K> Ticket<K> {
    /// What the refresh was issued for.
    pub fn target(&self) -> &K {
        &self.target
    }

    /// Issue order; later tickets have larger values.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Verdict on a resolved refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Result may be applied.
    Apply,
    /// The selection changed since the ticket was issued.
    StaleTarget,
    /// A newer refresh was already applied.
    Superseded,
}

impl Admission {
    /// Whether the result should be applied.
    pub fn is_apply(&self) -> bool {
        matches!(self, Admission::Apply)
    }
}

/// Issues and checks refresh tickets for one piece of state.
#[derive(Debug, Clone, Default)]
pub struct RefreshGate {
    next_seq: u64,
    applied_seq: Option<u64>,
}

impl RefreshGate {
    /// Create a gate that has issued nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a refresh targeting `target`.
    pub fn issue<K>(&mut self, target: K) -> Ticket<K> {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        Ticket { target, seq }
    }

    /// Decide whether a resolved refresh may be applied, given the current
    /// selection. Records the ticket as applied when it is admitted.
    pub fn admit<K: PartialEq>(&mut self, ticket: &Ticket<K>, current: Option<&K>) -> Admission {
        if current != Some(&ticket.target) {
            return Admission::StaleTarget;
        }
        if let Some(applied) = self.applied_seq {
            if ticket.seq < applied {
                return Admission::Superseded;
            }
        }
        self.applied_seq = Some(ticket.seq);
        Admission::Apply
    }

    /// Treat every ticket issued so far as superseded.
    ///
    /// Called after a confirmed local mutation, so a snapshot fetched before
    /// it cannot overwrite it. Tickets issued afterwards still apply.
    pub fn supersede_outstanding(&mut self) {
        self.applied_seq = Some(self.next_seq);
    }

    /// Number of tickets issued so far.
    pub fn issued(&self) -> u64 {
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // Target Matching Tests
    // ===========================================

    #[test]
    fn matching_target_is_applied() {
        let mut gate = RefreshGate::new();
        let t = gate.issue("u2");
        assert_eq!(gate.admit(&t, Some(&"u2")), Admission::Apply);
    }

    #[test]
    fn switched_target_is_stale() {
        let mut gate = RefreshGate::new();
        let t = gate.issue("peer-a");
        assert_eq!(gate.admit(&t, Some(&"peer-b")), Admission::StaleTarget);
    }

    #[test]
    fn cleared_selection_is_stale() {
        let mut gate = RefreshGate::new();
        let t = gate.issue("peer-a");
        assert_eq!(gate.admit(&t, None), Admission::StaleTarget);
    }

    // ===========================================
    // Ordering Tests
    // ===========================================

    #[test]
    fn older_result_after_newer_is_superseded() {
        let mut gate = RefreshGate::new();
        let first = gate.issue("u2");
        let second = gate.issue("u2");

        assert!(gate.admit(&second, Some(&"u2")).is_apply());
        assert_eq!(gate.admit(&first, Some(&"u2")), Admission::Superseded);
    }

    #[test]
    fn in_order_results_both_apply() {
        let mut gate = RefreshGate::new();
        let first = gate.issue("u2");
        let second = gate.issue("u2");

        assert!(gate.admit(&first, Some(&"u2")).is_apply());
        assert!(gate.admit(&second, Some(&"u2")).is_apply());
    }

    #[test]
    fn stale_result_does_not_advance_the_gate() {
        let mut gate = RefreshGate::new();
        let a = gate.issue("a");
        let b = gate.issue("b");

        // A resolves late after the switch to B and is ignored...
        assert_eq!(gate.admit(&a, Some(&"b")), Admission::StaleTarget);
        // ...so B, issued later, still applies.
        assert!(gate.admit(&b, Some(&"b")).is_apply());
    }

    #[test]
    fn superseding_discards_outstanding_but_not_later_tickets() {
        let mut gate = RefreshGate::new();
        let before = gate.issue("u2");
        gate.supersede_outstanding();
        let after = gate.issue("u2");

        assert_eq!(gate.admit(&before, Some(&"u2")), Admission::Superseded);
        assert!(gate.admit(&after, Some(&"u2")).is_apply());
    }

    #[test]
    fn tickets_are_numbered_in_issue_order() {
        let mut gate = RefreshGate::new();
        let a = gate.issue(());
        let b = gate.issue(());
        assert!(a.seq() < b.seq());
        assert_eq!(gate.issued(), 2);
    }
}
