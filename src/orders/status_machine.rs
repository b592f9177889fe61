use crate::orders::{OrderStatus, PaymentStatus};

/// Service for managing order status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Approved, Rejected
    /// - Approved → InProgress, Completed, Rejected
    /// - InProgress → Completed, Rejected
    /// - Completed, Rejected → (terminal)
    /// - Any status → Same status (idempotent)
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        // Same status is always valid (idempotent)
        if from == to {
            return true;
        }

        match (from, to) {
            // From Pending
            (OrderStatus::Pending, OrderStatus::Approved) => true,
            (OrderStatus::Pending, OrderStatus::Rejected) => true,

            // From Approved
            (OrderStatus::Approved, OrderStatus::InProgress) => true,
            (OrderStatus::Approved, OrderStatus::Completed) => true,
            (OrderStatus::Approved, OrderStatus::Rejected) => true,

            // From InProgress
            (OrderStatus::InProgress, OrderStatus::Completed) => true,
            (OrderStatus::InProgress, OrderStatus::Rejected) => true,

            // Completed and Rejected are terminal
            _ => false,
        }
    }

    /// Attempt to transition from one status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }
}

/// Service for managing payment status transitions
pub struct PaymentMachine;

impl PaymentMachine {
    /// - Pending → AdvancePaid, FullPaid
    /// - AdvancePaid → FullPaid, Refunded
    /// - FullPaid → Refunded
    /// - Refunded → (terminal)
    pub fn is_valid_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
        if from == to {
            return true;
        }

        matches!(
            (from, to),
            (PaymentStatus::Pending, PaymentStatus::AdvancePaid)
                | (PaymentStatus::Pending, PaymentStatus::FullPaid)
                | (PaymentStatus::AdvancePaid, PaymentStatus::FullPaid)
                | (PaymentStatus::AdvancePaid, PaymentStatus::Refunded)
                | (PaymentStatus::FullPaid, PaymentStatus::Refunded)
        )
    }

    pub fn transition(from: PaymentStatus, to: PaymentStatus) -> Result<PaymentStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid payment transition from {} to {}", from, to))
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    // Helper to generate OrderStatus
    fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
        prop_oneof![
            Just(OrderStatus::Pending),
            Just(OrderStatus::Approved),
            Just(OrderStatus::InProgress),
            Just(OrderStatus::Completed),
            Just(OrderStatus::Rejected),
        ]
    }

    fn payment_status_strategy() -> impl Strategy<Value = PaymentStatus> {
        prop_oneof![
            Just(PaymentStatus::Pending),
            Just(PaymentStatus::AdvancePaid),
            Just(PaymentStatus::FullPaid),
            Just(PaymentStatus::Refunded),
        ]
    }

    /// Same status transitions are always valid (idempotent)
    #[test]
    fn prop_same_status_is_valid() {
        proptest!(|(status in order_status_strategy())| {
            prop_assert!(
                StatusMachine::is_valid_transition(status, status),
                "Transition from {} to {} (same status) should be valid",
                status,
                status
            );
        });
    }

    /// Completed and Rejected are terminal states
    #[test]
    fn prop_terminal_states_have_no_exits() {
        proptest!(|(from in order_status_strategy(), to in order_status_strategy())| {
            if from.is_terminal() && from != to {
                prop_assert!(
                    !StatusMachine::is_valid_transition(from, to),
                    "No transition should be allowed from {} to {}",
                    from,
                    to
                );
            }
        });
    }

    /// Every non-terminal status can be rejected
    #[test]
    fn prop_non_terminal_can_be_rejected() {
        proptest!(|(from in order_status_strategy())| {
            if !from.is_terminal() {
                prop_assert!(StatusMachine::is_valid_transition(from, OrderStatus::Rejected));
            }
        });
    }

    /// Nothing returns to Pending
    #[test]
    fn prop_pending_is_never_reentered() {
        proptest!(|(from in order_status_strategy())| {
            if from != OrderStatus::Pending {
                prop_assert!(!StatusMachine::is_valid_transition(from, OrderStatus::Pending));
            }
        });
    }

    /// transition() and is_valid_transition() agree
    #[test]
    fn prop_transition_consistency() {
        proptest!(|(
            from in order_status_strategy(),
            to in order_status_strategy()
        )| {
            let is_valid = StatusMachine::is_valid_transition(from, to);
            let transition_result = StatusMachine::transition(from, to);

            if is_valid {
                prop_assert_eq!(transition_result.unwrap(), to);
            } else {
                prop_assert!(transition_result.is_err());
            }
        });
    }

    /// Refunded is terminal for payments
    #[test]
    fn prop_refunded_is_terminal() {
        proptest!(|(to in payment_status_strategy())| {
            if to != PaymentStatus::Refunded {
                prop_assert!(!PaymentMachine::is_valid_transition(PaymentStatus::Refunded, to));
            }
        });
    }
}
