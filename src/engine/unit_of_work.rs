use crate::core::{Message, StepId};
use std::collections::HashSet;

/// Decides, per inbound message, whether the receiving step has reached a
/// unit-of-work boundary: every inbound origin has delivered a
/// boundary-flagged message since the last boundary.
///
/// A step without declared inbound origins (an entry step) follows the flag
/// of each message it receives.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWorkTracker {
    expected: HashSet<StepId>,
    reached: HashSet<StepId>,
}

impl UnitOfWorkTracker {
    pub fn new<I>(inbound: I) -> Self
    where
        I: IntoIterator<Item = StepId>,
    {
        Self {
            expected: inbound.into_iter().collect(),
            reached: HashSet::new(),
        }
    }

    pub fn observe(&mut self, message: &Message) -> bool {
        if message.is_startup() || !message.is_unit_of_work_boundary() {
            return false;
        }
        if self.expected.is_empty() || !self.expected.contains(message.origin()) {
            return true;
        }

        self.reached.insert(message.origin().clone());
        if self.expected.is_subset(&self.reached) {
            self.reached.clear();
            true
        } else {
            false
        }
    }

    /// Origins still owing a boundary in the current unit of work.
    pub fn outstanding(&self) -> Vec<&StepId> {
        let mut outstanding: Vec<&StepId> = self.expected.difference(&self.reached).collect();
        outstanding.sort();
        outstanding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(origin: &str, boundary: bool) -> Message {
        Message::content(origin, 1, boundary, Vec::<crate::core::EntityRecord>::new())
    }

    #[test]
    fn test_entry_step_follows_message_flag() {
        let mut tracker = UnitOfWorkTracker::default();
        assert!(!tracker.observe(&message("external", false)));
        assert!(tracker.observe(&message("external", true)));
    }

    #[test]
    fn test_fan_in_waits_for_every_origin() {
        let mut tracker = UnitOfWorkTracker::new([StepId::from("source"), StepId::from("main")]);

        assert!(!tracker.observe(&message("source", true)));
        assert_eq!(tracker.outstanding(), vec![&StepId::from("main")]);
        assert!(!tracker.observe(&message("main", false)));
        assert!(tracker.observe(&message("main", true)));
        assert_eq!(tracker.outstanding().len(), 2);
    }

    #[test]
    fn test_startup_is_never_a_boundary() {
        let mut tracker = UnitOfWorkTracker::default();
        assert!(!tracker.observe(&Message::startup("entry")));
    }
}
