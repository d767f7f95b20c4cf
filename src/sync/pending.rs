//! Per-annotation operation tracking.

use std::collections::BTreeSet;

/// Tracks annotations whose removal the adapter triggered itself.
///
/// Each identifier is either idle (absent) or delete-pending. Marking an id
/// makes the next delete event for it count as an echo of a programmatic
/// removal; taking it returns the id to idle.
#[derive(Debug, Default)]
pub(crate) struct PendingOps {
    deleting: BTreeSet<String>,
}

impl PendingOps {
    pub(crate) fn mark_deleting(&mut self, id: &str) {
        self.deleting.insert(id.to_string());
    }

    /// Clears the marker and reports whether it was set.
    pub(crate) fn take_deleting(&mut self, id: &str) -> bool {
        self.deleting.remove(id)
    }

    pub(crate) fn clear(&mut self) {
        self.deleting.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_is_consumed_once() {
        let mut pending = PendingOps::default();
        pending.mark_deleting("#a");
        assert!(pending.take_deleting("#a"));
        assert!(!pending.take_deleting("#a"));
        assert!(!pending.take_deleting("#b"));
    }
}
