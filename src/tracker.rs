use crate::gate::AcceptanceGate;
use crate::uid::TagUid;

/// Outcome of one decision tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing worth reporting.
    Idle,
    /// A reading was accepted. `push` is false when the downstream throttle
    /// suppressed the uplink for this acceptance.
    Accepted { uid: TagUid, push: bool },
    /// The tag field went empty.
    Cleared,
}

/// Two-state presence machine fed one raw UID per decision tick.
///
/// An appearance edge (empty field to tag) is always an acceptance, skipping
/// the gate's cooldown; steady-state readings are delegated to the gate. Two
/// throttles apply on purpose: the gate cooldown decides which readings count
/// as accepted, and the separate minimum-push interval limits how fast
/// acceptances reach the uplink.
pub struct PresenceTracker<const CAPACITY: usize = 16> {
    gate: AcceptanceGate<CAPACITY>,
    present: bool,
    last_uid: TagUid,
    push_min_interval_ms: u32,
    last_pushed_at: u32,
}

impl<const CAPACITY: usize> PresenceTracker<CAPACITY> {
    pub fn new(cooldown_ms: u32, push_min_interval_ms: u32) -> Self {
        PresenceTracker {
            gate: AcceptanceGate::new(cooldown_ms),
            present: false,
            last_uid: TagUid::ZERO,
            push_min_interval_ms,
            last_pushed_at: 0,
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Last accepted UID, or the zero sentinel while the field is empty.
    pub fn last_uid(&self) -> &TagUid {
        &self.last_uid
    }

    /// Forget every cached acceptance; presence state is untouched.
    pub fn clear_cache(&mut self) {
        self.gate.clear();
    }

    pub fn observe(&mut self, uid: &TagUid, now_ms: u32) -> Decision {
        let present = !uid.is_zero();
        let was_present = self.present;
        self.present = present;

        if !present {
            if was_present {
                self.last_uid = TagUid::ZERO;
                return Decision::Cleared;
            }
            return Decision::Idle;
        }

        let accepted = if was_present {
            self.gate.should_accept(uid, now_ms)
        } else {
            // First reading after an absence is always newsworthy, but the
            // gate still restarts this UID's cooldown window.
            self.gate.record(uid, now_ms);
            true
        };
        if !accepted {
            return Decision::Idle;
        }

        self.last_uid = *uid;
        let push = now_ms.wrapping_sub(self.last_pushed_at) >= self.push_min_interval_ms;
        if push {
            self.last_pushed_at = now_ms;
        }
        Decision::Accepted { uid: *uid, push }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uid::UID_LEN;

    fn uid(tag: u8) -> TagUid {
        let mut bytes = [0u8; UID_LEN];
        bytes[0] = tag;
        TagUid::new(bytes)
    }

    fn accepted(decision: Decision) -> Option<TagUid> {
        match decision {
            Decision::Accepted { uid, .. } => Some(uid),
            _ => None,
        }
    }

    #[test]
    fn test_appear_steady_disappear_reappear() {
        // Cooldown far longer than the whole run: only edges get through.
        let mut tracker: PresenceTracker = PresenceTracker::new(100_000, 150);
        let a = uid(0xA1);

        assert_eq!(tracker.observe(&TagUid::ZERO, 0), Decision::Idle);
        assert_eq!(accepted(tracker.observe(&a, 60)), Some(a));
        assert_eq!(tracker.observe(&a, 120), Decision::Idle);
        assert_eq!(tracker.observe(&TagUid::ZERO, 180), Decision::Cleared);
        assert!(tracker.last_uid().is_zero());
        assert_eq!(accepted(tracker.observe(&a, 240)), Some(a));
    }

    #[test]
    fn test_steady_state_new_uid_is_gated() {
        let mut tracker: PresenceTracker = PresenceTracker::new(1000, 0);
        let (a, b) = (uid(1), uid(2));

        assert_eq!(accepted(tracker.observe(&a, 100)), Some(a));
        // A different tag swapped into the field is a fresh gate entry.
        assert_eq!(accepted(tracker.observe(&b, 160)), Some(b));
        assert_eq!(*tracker.last_uid(), b);
        // Swapping back within the cooldown stays suppressed.
        assert_eq!(tracker.observe(&a, 220), Decision::Idle);
        assert_eq!(*tracker.last_uid(), b);
        // Cooldown over: the re-read is accepted again.
        assert_eq!(accepted(tracker.observe(&a, 1100)), Some(a));
    }

    #[test]
    fn test_push_throttle_is_separate_from_cooldown() {
        let mut tracker: PresenceTracker = PresenceTracker::new(100_000, 150);
        let a = uid(7);

        assert_eq!(
            tracker.observe(&a, 1000),
            Decision::Accepted { uid: a, push: true }
        );
        assert_eq!(tracker.observe(&TagUid::ZERO, 1060), Decision::Cleared);
        // Re-appearance is accepted (edge beats cooldown) but pushed nowhere:
        // only 120 ms since the last push.
        assert_eq!(
            tracker.observe(&a, 1120),
            Decision::Accepted { uid: a, push: false }
        );
        assert_eq!(tracker.observe(&TagUid::ZERO, 1180), Decision::Cleared);
        assert_eq!(
            tracker.observe(&a, 1240),
            Decision::Accepted { uid: a, push: true }
        );
    }

    #[test]
    fn test_absence_only_fires_on_the_edge() {
        let mut tracker: PresenceTracker = PresenceTracker::new(1000, 0);
        assert_eq!(accepted(tracker.observe(&uid(1), 10)), Some(uid(1)));
        assert_eq!(tracker.observe(&TagUid::ZERO, 20), Decision::Cleared);
        assert_eq!(tracker.observe(&TagUid::ZERO, 30), Decision::Idle);
        assert!(!tracker.is_present());
    }

    #[test]
    fn test_edge_restarts_cooldown_window() {
        let mut tracker: PresenceTracker = PresenceTracker::new(1000, 0);
        let a = uid(3);

        assert_eq!(accepted(tracker.observe(&a, 500)), Some(a));
        // Steady re-reads stay inside the window restarted by the edge.
        assert_eq!(tracker.observe(&a, 1499), Decision::Idle);
        assert_eq!(accepted(tracker.observe(&a, 1500)), Some(a));
    }

    #[test]
    fn test_clear_cache_forgets_acceptances() {
        let mut tracker: PresenceTracker = PresenceTracker::new(100_000, 0);
        let a = uid(9);
        assert_eq!(accepted(tracker.observe(&a, 100)), Some(a));
        assert_eq!(tracker.observe(&a, 160), Decision::Idle);
        tracker.clear_cache();
        assert_eq!(accepted(tracker.observe(&a, 220)), Some(a));
    }
}
