//! Resource ledger.

use visceral_reclaimer_core::{Cost, ResourceKind, Resources};

#[derive(Clone, Debug)]
pub(crate) struct ResourceLedger {
    totals: Resources,
}

impl ResourceLedger {
    pub(crate) fn new(starting: Resources) -> Self {
        Self { totals: starting }
    }

    pub(crate) fn totals(&self) -> Resources {
        self.totals
    }

    /// True when every resource named by the cost is covered. Empty costs are
    /// always affordable.
    pub(crate) fn can_afford(&self, cost: &Cost) -> bool {
        cost.iter()
            .all(|(kind, amount)| self.totals.get(kind) >= amount)
    }

    /// Deducts the cost without checking affordability; callers check first.
    pub(crate) fn spend(&mut self, cost: &Cost) {
        for (kind, amount) in cost.iter() {
            *self.totals.get_mut(kind) -= amount;
        }
    }

    pub(crate) fn grant(&mut self, kind: ResourceKind, amount: f64) {
        *self.totals.get_mut(kind) += amount;
    }

    pub(crate) fn refund(&mut self, cost: &Cost) {
        for (kind, amount) in cost.iter() {
            self.grant(kind, amount);
        }
    }
}
