/// Battle configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleConfig {
    /// Hard cap on rounds before the battle is called a draw.
    pub turn_cap: u32,

    /// Action points consumed per tile of movement.
    pub movement_ap_per_tile: u32,

    /// Number of executed-action results retained for inspection.
    pub history_size: usize,

    /// Allowed deviation (percent) for a damage prediction to count as accurate.
    pub prediction_tolerance_pct: u32,
}

impl BattleConfig {
    // ===== compile-time constants used as type parameters =====
    /// Hotkey bar width. Slots beyond this are not addressable.
    pub const HOTKEY_SLOTS: usize = 8;
    /// Maximum simultaneous status modifiers per unit.
    pub const MAX_STATUS_EFFECTS: usize = 16;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_TURN_CAP: u32 = 100;
    pub const DEFAULT_HISTORY_SIZE: usize = 100;
    pub const DEFAULT_PREDICTION_TOLERANCE_PCT: u32 = 10;

    pub fn new() -> Self {
        Self {
            turn_cap: Self::DEFAULT_TURN_CAP,
            movement_ap_per_tile: 1,
            history_size: Self::DEFAULT_HISTORY_SIZE,
            prediction_tolerance_pct: Self::DEFAULT_PREDICTION_TOLERANCE_PCT,
        }
    }

    pub fn with_turn_cap(turn_cap: u32) -> Self {
        Self {
            turn_cap,
            ..Self::new()
        }
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self::new()
    }
}
