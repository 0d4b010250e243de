//! Resource pools: HP, MP, AP, Rage, Kwan.
//!
//! Every adjustment clamps to `[0, max]` and reports the delta actually
//! applied, so observers can reconstruct old values from the result.

/// Enum naming individual resources in costs, effects, and save data.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
    strum::Display, strum::EnumIter, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResourceKind {
    Hp,
    Mp,
    Ap,
    Rage,
    Kwan,
}

/// Current/maximum pair for one resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourcePool {
    current: i32,
    max: i32,
}

impl ResourcePool {
    /// Pool starting at its maximum.
    pub fn full(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    /// Pool starting empty (Rage and Kwan build up during battle).
    pub fn empty(max: i32) -> Self {
        Self {
            current: 0,
            max: max.max(0),
        }
    }

    pub fn restore(current: i32, max: i32) -> Self {
        let max = max.max(0);
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Applies a signed delta, clamped to `[0, max]`; returns the applied amount.
    pub fn adjust(&mut self, delta: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + delta).clamp(0, self.max);
        self.current - before
    }

    /// Sets current to an exact value within bounds.
    pub fn set(&mut self, value: i32) {
        self.current = value.clamp(0, self.max);
    }

    /// Raises (or lowers) the maximum, clamping current into the new range.
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        self.current = self.current.clamp(0, self.max);
    }
}

/// All five pools of one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceSet {
    pub hp: ResourcePool,
    pub mp: ResourcePool,
    pub ap: ResourcePool,
    pub rage: ResourcePool,
    pub kwan: ResourcePool,
}

impl ResourceSet {
    pub fn pool(&self, kind: ResourceKind) -> &ResourcePool {
        match kind {
            ResourceKind::Hp => &self.hp,
            ResourceKind::Mp => &self.mp,
            ResourceKind::Ap => &self.ap,
            ResourceKind::Rage => &self.rage,
            ResourceKind::Kwan => &self.kwan,
        }
    }

    pub fn pool_mut(&mut self, kind: ResourceKind) -> &mut ResourcePool {
        match kind {
            ResourceKind::Hp => &mut self.hp,
            ResourceKind::Mp => &mut self.mp,
            ResourceKind::Ap => &mut self.ap,
            ResourceKind::Rage => &mut self.rage,
            ResourceKind::Kwan => &mut self.kwan,
        }
    }
}
