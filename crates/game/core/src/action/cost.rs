//! Resource costs for performing an action.

use crate::units::{ResourceKind, Unit};

/// Cost descriptor. All fields default to zero; a zero cost always passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionCosts {
    pub mp: i32,
    pub ap: i32,
    pub rage: i32,
    pub kwan: i32,
    /// Consumables spent from inventory; accounted by the inventory layer.
    pub item_quantity: u32,
    /// Spent when learning, not when casting.
    pub talent_points: u32,
}

impl ActionCosts {
    pub fn free() -> Self {
        Self::default()
    }

    pub fn ap(ap: i32) -> Self {
        Self {
            ap,
            ..Self::default()
        }
    }

    pub fn mp_ap(mp: i32, ap: i32) -> Self {
        Self {
            mp,
            ap,
            ..Self::default()
        }
    }

    /// First resource the unit cannot pay, if any.
    pub fn first_shortfall(&self, unit: &Unit) -> Option<ResourceKind> {
        let pairs = [
            (ResourceKind::Mp, self.mp),
            (ResourceKind::Ap, self.ap),
            (ResourceKind::Rage, self.rage),
            (ResourceKind::Kwan, self.kwan),
        ];
        pairs
            .into_iter()
            .find(|&(kind, cost)| cost > 0 && unit.resources.pool(kind).current() < cost)
            .map(|(kind, _)| kind)
    }

    pub fn affordable_by(&self, unit: &Unit) -> bool {
        self.first_shortfall(unit).is_none()
    }

    /// Deducts every resource cost. Call only after affordability passed.
    pub fn consume(&self, unit: &mut Unit) {
        unit.resources.mp.adjust(-self.mp.max(0));
        unit.resources.ap.adjust(-self.ap.max(0));
        unit.resources.rage.adjust(-self.rage.max(0));
        unit.resources.kwan.adjust(-self.kwan.max(0));
    }
}
