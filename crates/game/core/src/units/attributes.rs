//! The nine core attributes and the stats derived from them.
//!
//! Attributes are stored as named fields; sparse per-attribute data (status
//! modifiers, equipment bonuses) uses [`AttributeKind`] keys and folds over
//! the named base at read time. Derived stats are never cached.

/// Identifies a single attribute in sparse modifier records.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
    strum::Display, strum::EnumIter, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AttributeKind {
    Strength,
    Fortitude,
    Finesse,
    Wisdom,
    Wonder,
    Worthy,
    Faith,
    Spirit,
    Speed,
}

/// Base attribute block. Every unit stores exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    pub strength: i32,
    pub fortitude: i32,
    pub finesse: i32,
    pub wisdom: i32,
    pub wonder: i32,
    pub worthy: i32,
    pub faith: i32,
    pub spirit: i32,
    pub speed: i32,
}

impl Attributes {
    /// Baseline block: 10 in everything.
    pub const BASELINE: Self = Self::uniform(10);

    pub const fn uniform(value: i32) -> Self {
        Self {
            strength: value,
            fortitude: value,
            finesse: value,
            wisdom: value,
            wonder: value,
            worthy: value,
            faith: value,
            spirit: value,
            speed: value,
        }
    }

    pub fn get(&self, kind: AttributeKind) -> i32 {
        match kind {
            AttributeKind::Strength => self.strength,
            AttributeKind::Fortitude => self.fortitude,
            AttributeKind::Finesse => self.finesse,
            AttributeKind::Wisdom => self.wisdom,
            AttributeKind::Wonder => self.wonder,
            AttributeKind::Worthy => self.worthy,
            AttributeKind::Faith => self.faith,
            AttributeKind::Spirit => self.spirit,
            AttributeKind::Speed => self.speed,
        }
    }

    pub fn set(&mut self, kind: AttributeKind, value: i32) {
        match kind {
            AttributeKind::Strength => self.strength = value,
            AttributeKind::Fortitude => self.fortitude = value,
            AttributeKind::Finesse => self.finesse = value,
            AttributeKind::Wisdom => self.wisdom = value,
            AttributeKind::Wonder => self.wonder = value,
            AttributeKind::Worthy => self.worthy = value,
            AttributeKind::Faith => self.faith = value,
            AttributeKind::Spirit => self.spirit = value,
            AttributeKind::Speed => self.speed = value,
        }
    }

    pub fn add(&mut self, kind: AttributeKind, delta: i32) {
        self.set(kind, self.get(kind) + delta);
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::BASELINE
    }
}

/// Combat stats computed from effective attributes.
///
/// Formulas:
/// - physical_attack  = STR + FIN / 2
/// - magical_attack   = WIS + WON / 2
/// - spiritual_attack = FAI + WOR / 2
/// - physical_defense  = (STR + FOR) / 2
/// - magical_defense   = (WIS + WON) / 2
/// - spiritual_defense = (SPI + FAI) / 2
/// - initiative        = SPD
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DerivedStats {
    pub physical_attack: i32,
    pub magical_attack: i32,
    pub spiritual_attack: i32,
    pub physical_defense: i32,
    pub magical_defense: i32,
    pub spiritual_defense: i32,
    pub initiative: i32,
}

impl DerivedStats {
    pub fn compute(effective: &Attributes) -> Self {
        Self {
            physical_attack: effective.strength + effective.finesse / 2,
            magical_attack: effective.wisdom + effective.wonder / 2,
            spiritual_attack: effective.faith + effective.worthy / 2,
            physical_defense: (effective.strength + effective.fortitude) / 2,
            magical_defense: (effective.wisdom + effective.wonder) / 2,
            spiritual_defense: (effective.spirit + effective.faith) / 2,
            initiative: effective.speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn get_set_round_trip_all_kinds() {
        let mut attrs = Attributes::BASELINE;
        for (i, kind) in AttributeKind::iter().enumerate() {
            attrs.set(kind, 20 + i as i32);
        }
        for (i, kind) in AttributeKind::iter().enumerate() {
            assert_eq!(attrs.get(kind), 20 + i as i32);
        }
    }

    #[test]
    fn derived_formulas() {
        let mut attrs = Attributes::uniform(0);
        attrs.strength = 10;
        attrs.fortitude = 6;
        attrs.finesse = 4;
        attrs.speed = 12;

        let derived = DerivedStats::compute(&attrs);
        assert_eq!(derived.physical_attack, 12);
        assert_eq!(derived.physical_defense, 8);
        assert_eq!(derived.initiative, 12);
    }

    #[test]
    fn kind_parses_snake_case() {
        assert_eq!("fortitude".parse::<AttributeKind>(), Ok(AttributeKind::Fortitude));
        assert!("vigor".parse::<AttributeKind>().is_err());
    }
}
