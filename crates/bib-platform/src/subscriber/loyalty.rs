//! Loyalty State Machine
//!
//! Pure decision logic for the derived loyalty status. Two states, no side
//! effects, no persistence: the caller compares the computed status against
//! the stored flag and decides whether to persist and emit. Repeated
//! evaluation with identical inputs never signals a transition twice.

use super::entity::Subscriber;

/// Consecutive subscriptions required for loyalty.
pub const LOYALTY_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoyaltyStatus {
    NotLoyal,
    Loyal,
}

impl LoyaltyStatus {
    /// Compute the status from the two input fields.
    pub fn of(consecutive_subscriptions: u32, has_penalty: bool) -> Self {
        if consecutive_subscriptions >= LOYALTY_THRESHOLD && !has_penalty {
            Self::Loyal
        } else {
            Self::NotLoyal
        }
    }

    pub fn is_loyal(self) -> bool {
        matches!(self, Self::Loyal)
    }
}

impl From<bool> for LoyaltyStatus {
    fn from(is_loyal: bool) -> Self {
        if is_loyal { Self::Loyal } else { Self::NotLoyal }
    }
}

/// Returns the new status when it differs from the subscriber's stored flag,
/// `None` when nothing changed.
pub fn evaluate(subscriber: &Subscriber) -> Option<LoyaltyStatus> {
    let computed = LoyaltyStatus::of(
        subscriber.consecutive_subscriptions,
        subscriber.has_penalty,
    );

    if computed != LoyaltyStatus::from(subscriber.is_loyal) {
        Some(computed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::entity::Gender;

    fn subscriber(streak: u32, penalty: bool, loyal: bool) -> Subscriber {
        let mut s = Subscriber::new(
            "Jean",
            "Valjean",
            "jean@bibliotheque.org",
            "+33100000003",
            47,
            Gender::Male,
        );
        s.consecutive_subscriptions = streak;
        s.has_penalty = penalty;
        s.is_loyal = loyal;
        s
    }

    #[test]
    fn test_threshold_boundary() {
        assert_eq!(LoyaltyStatus::of(0, false), LoyaltyStatus::NotLoyal);
        assert_eq!(LoyaltyStatus::of(2, false), LoyaltyStatus::NotLoyal);
        assert_eq!(LoyaltyStatus::of(3, false), LoyaltyStatus::Loyal);
        assert_eq!(LoyaltyStatus::of(10, false), LoyaltyStatus::Loyal);
    }

    #[test]
    fn test_penalty_blocks_loyalty() {
        assert_eq!(LoyaltyStatus::of(3, true), LoyaltyStatus::NotLoyal);
        assert_eq!(LoyaltyStatus::of(100, true), LoyaltyStatus::NotLoyal);
    }

    #[test]
    fn test_evaluate_signals_transition_to_loyal() {
        let s = subscriber(3, false, false);
        assert_eq!(evaluate(&s), Some(LoyaltyStatus::Loyal));
    }

    #[test]
    fn test_evaluate_signals_transition_to_not_loyal() {
        let s = subscriber(0, true, true);
        assert_eq!(evaluate(&s), Some(LoyaltyStatus::NotLoyal));
    }

    #[test]
    fn test_evaluate_is_idempotent_for_unchanged_inputs() {
        let mut s = subscriber(3, false, false);
        if let Some(status) = evaluate(&s) {
            s.set_loyalty(status.is_loyal());
        }

        // Same inputs again: no transition signalled.
        assert_eq!(evaluate(&s), None);
        assert_eq!(evaluate(&s), None);
    }

    #[test]
    fn test_invariant_holds_after_applying_evaluation() {
        for streak in 0..6 {
            for penalty in [false, true] {
                let mut s = subscriber(streak, penalty, false);
                if let Some(status) = evaluate(&s) {
                    s.set_loyalty(status.is_loyal());
                }
                assert_eq!(
                    s.is_loyal,
                    s.consecutive_subscriptions >= LOYALTY_THRESHOLD && !s.has_penalty
                );
            }
        }
    }
}
