//! Payment allocation planning.
//!
//! The allocator walks a customer's entries in ledger order and assigns a
//! payment earliest-first until the payment is exhausted. Planning is pure:
//! it reads loaded entries and produces the per-entry amounts the
//! transaction then applies. Leftover payment beyond the range's
//! outstanding total is absorbed into the recorded payment, never credited.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::Entry;

/// A single per-entry share of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub entry_id: Uuid,
    pub amount: Decimal,
}

/// The full plan for one payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub allocations: Vec<Allocation>,
    /// Payment left after every entry in range is settled; absorbed.
    pub leftover: Decimal,
}

impl AllocationPlan {
    pub fn allocated_total(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount).sum()
    }
}

/// Plan how `amount` spreads across `entries`.
///
/// Entries must already be in allocation order (`entry_date` ascending,
/// insertion order within a date). Each entry's outstanding balance is
/// recomputed from its quantity fields; entries with a non-positive
/// outstanding (already settled or overpaid) are skipped without consuming
/// any of the payment.
pub fn plan_allocation(entries: &[Entry], amount: Decimal) -> AllocationPlan {
    let mut remaining = amount;
    let mut allocations = Vec::new();

    for entry in entries {
        if remaining <= Decimal::ZERO {
            break;
        }
        let outstanding = entry.outstanding();
        if outstanding <= Decimal::ZERO {
            continue;
        }
        let share = outstanding.min(remaining);
        allocations.push(Allocation {
            entry_id: entry.entry_id,
            amount: share,
        });
        remaining -= share;
    }

    AllocationPlan {
        allocations,
        leftover: remaining,
    }
}

/// Bump in-memory `paid_amount`s to mirror what the transaction persisted.
/// Used for the receipt snapshot after commit.
pub fn apply_plan(entries: &mut [Entry], plan: &AllocationPlan) {
    for allocation in &plan.allocations {
        if let Some(entry) = entries.iter_mut().find(|e| e.entry_id == allocation.entry_id) {
            entry.paid_amount += allocation.amount;
        }
    }
}

/// Range aggregates: total recomputed amount and total paid, with paid
/// clamped per entry to that entry's own amount.
pub fn range_totals(entries: &[Entry]) -> (Decimal, Decimal) {
    let mut total_amount = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;
    for entry in entries {
        let amount = entry.computed_amount();
        total_amount += amount;
        total_paid += entry.paid_amount.min(amount);
    }
    (total_amount, total_paid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn entry_on(day: u32, kgs: i64, rate: i64, paid: i64) -> Entry {
        Entry {
            entry_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            entry_date: NaiveDate::from_ymd_opt(2025, 10, day).unwrap(),
            item_name: None,
            bags: 0,
            kgs: Decimal::from(kgs),
            rate: Decimal::from(rate),
            commission: Decimal::ZERO,
            amount: Decimal::ZERO,
            paid_amount: Decimal::from(paid),
            posted_utc: Utc::now(),
        }
    }

    #[test]
    fn allocates_earliest_first_until_exhausted() {
        // outstanding 100 on day 1, 50 on day 2; pay 120
        let entries = vec![entry_on(1, 10, 10, 0), entry_on(2, 5, 10, 0)];
        let plan = plan_allocation(&entries, Decimal::from(120));

        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].entry_id, entries[0].entry_id);
        assert_eq!(plan.allocations[0].amount, Decimal::from(100));
        assert_eq!(plan.allocations[1].entry_id, entries[1].entry_id);
        assert_eq!(plan.allocations[1].amount, Decimal::from(20));
        assert_eq!(plan.leftover, Decimal::ZERO);
    }

    #[test]
    fn stops_once_payment_is_spent() {
        let entries = vec![
            entry_on(1, 10, 10, 0),
            entry_on(2, 10, 10, 0),
            entry_on(3, 10, 10, 0),
        ];
        let plan = plan_allocation(&entries, Decimal::from(100));

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].amount, Decimal::from(100));
        assert_eq!(plan.leftover, Decimal::ZERO);
    }

    #[test]
    fn skips_settled_and_overpaid_entries_without_consuming_payment() {
        // day 1 overpaid (outstanding -20), day 2 open
        let entries = vec![entry_on(1, 10, 10, 120), entry_on(2, 10, 10, 0)];
        let plan = plan_allocation(&entries, Decimal::from(50));

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].entry_id, entries[1].entry_id);
        assert_eq!(plan.allocations[0].amount, Decimal::from(50));
    }

    #[test]
    fn leftover_beyond_range_outstanding_is_absorbed() {
        // total outstanding 120; pay 500
        let entries = vec![entry_on(1, 10, 10, 0), entry_on(2, 2, 10, 0)];
        let plan = plan_allocation(&entries, Decimal::from(500));

        assert_eq!(plan.allocated_total(), Decimal::from(120));
        assert_eq!(plan.leftover, Decimal::from(380));
    }

    #[test]
    fn partial_payment_settles_an_entry_across_two_rounds() {
        // spec scenario: one entry of 120; pay 100 then 20
        let mut entries = vec![entry_on(1, 10, 12, 0)];

        let first = plan_allocation(&entries, Decimal::from(100));
        assert_eq!(first.allocations[0].amount, Decimal::from(100));
        apply_plan(&mut entries, &first);
        assert_eq!(entries[0].remaining(), Decimal::from(20));

        let second = plan_allocation(&entries, Decimal::from(20));
        assert_eq!(second.allocations[0].amount, Decimal::from(20));
        apply_plan(&mut entries, &second);
        assert_eq!(entries[0].remaining(), Decimal::ZERO);
    }

    #[test]
    fn planning_is_deterministic_for_same_input() {
        let entries = vec![entry_on(1, 7, 13, 5), entry_on(1, 3, 11, 0), entry_on(2, 4, 9, 0)];
        let a = plan_allocation(&entries, Decimal::from(75));
        let b = plan_allocation(&entries, Decimal::from(75));
        assert_eq!(a, b);
    }

    #[test]
    fn negative_amount_entries_are_skipped() {
        let mut negative = entry_on(1, 5, 10, 0);
        negative.commission = Decimal::from(8); // amount -30
        let entries = vec![negative, entry_on(2, 10, 10, 0)];

        let plan = plan_allocation(&entries, Decimal::from(60));
        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].entry_id, entries[1].entry_id);
        assert_eq!(plan.allocations[0].amount, Decimal::from(60));
    }

    #[test]
    fn totals_clamp_paid_per_entry() {
        // entry 1: amount 100 paid 130 (clamped to 100); entry 2: amount 50 paid 20
        let entries = vec![entry_on(1, 10, 10, 130), entry_on(2, 5, 10, 20)];
        let (total_amount, total_paid) = range_totals(&entries);

        assert_eq!(total_amount, Decimal::from(150));
        assert_eq!(total_paid, Decimal::from(120));
    }

    #[test]
    fn totals_of_negative_amount_entry_clamp_paid_to_the_amount() {
        let mut negative = entry_on(1, 5, 10, 0);
        negative.commission = Decimal::from(8); // amount -30, paid 0 -> min is -30
        let (total_amount, total_paid) = range_totals(&[negative]);

        assert_eq!(total_amount, Decimal::from(-30));
        assert_eq!(total_paid, Decimal::from(-30));
    }
}
