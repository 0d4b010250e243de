//! Save/load round trips through the manager and the repositories.

use battle_core::{
    ActionTarget, AttributeKind, BattleConfig, BattleContext, Faction, Grid, Position, SaveState,
    UnitTemplate,
};
use battle_content::default_action_registry;
use battle_runtime::{ActionManager, FileSaveRepo, InMemorySaveRepo, SaveRepository};

fn manager_with_two_units() -> ActionManager {
    let registry = default_action_registry().unwrap();
    let context = BattleContext::new(BattleConfig::default(), registry, Grid::open(8, 8), 1234);
    let mut manager = ActionManager::new(context);

    let knight = UnitTemplate::builder("knight", "Knight")
        .health(60)
        .attribute(AttributeKind::Strength, 12)
        .build();
    let rogue = UnitTemplate::builder("rogue", "Rogue")
        .health(45)
        .attribute(AttributeKind::Speed, 14)
        .build();
    manager
        .context_mut()
        .spawn(&knight, Faction::Player, Position::new(1, 1))
        .unwrap();
    manager
        .context_mut()
        .spawn(&rogue, Faction::Enemy, Position::new(5, 5))
        .unwrap();
    manager.begin_battle().unwrap();
    manager
}

#[test]
fn save_load_round_trips_mid_battle_state() {
    let mut manager = manager_with_two_units();
    let active = manager.context().turn.active_unit.unwrap();
    let target = manager
        .context()
        .state
        .unit_ids()
        .find(|&id| id != active)
        .unwrap();

    // Mutate some state first so the snapshot is not trivial: the rogue acts,
    // the knight takes a hit.
    manager
        .context_mut()
        .state
        .unit_mut(target)
        .unwrap()
        .take_damage(10, battle_core::DamageType::True);
    manager
        .context_mut()
        .state
        .unit_mut(active)
        .unwrap()
        .set_cooldown("power_attack", 2);

    let blob = manager.save().unwrap();
    let snapshot_before: SaveState = serde_json::from_slice(&blob).unwrap();

    // Wreck the live state, then load the blob back.
    manager
        .context_mut()
        .state
        .unit_mut(active)
        .unwrap()
        .take_damage(25, battle_core::DamageType::True);
    manager.load(&blob).unwrap();

    let reloaded = manager.save().unwrap();
    let snapshot_after: SaveState = serde_json::from_slice(&reloaded).unwrap();
    assert_eq!(snapshot_before, snapshot_after);

    // Restored world agrees with what was saved.
    let unit = manager.context().unit(target).unwrap();
    assert_eq!(unit.resources.hp.current(), unit.resources.hp.max() - 10);
    assert_eq!(
        manager.context().unit(active).unwrap().cooldown_of("power_attack"),
        2
    );
    manager.context().state.check_occupancy().unwrap();
    assert_eq!(manager.context().turn.active_unit, Some(active));
}

#[test]
fn load_rejects_garbage() {
    let mut manager = manager_with_two_units();
    assert!(manager.load(b"not json at all").is_err());
    // A failed load leaves the battle running.
    assert!(manager.context().turn.active_unit.is_some());
}

#[test]
fn loaded_battle_keeps_playing() {
    let mut manager = manager_with_two_units();
    let blob = manager.save().unwrap();
    manager.load(&blob).unwrap();

    let active = manager.context().turn.active_unit.unwrap();
    let target = manager
        .context()
        .state
        .unit_ids()
        .find(|&id| id != active)
        .unwrap();

    // Bring the target into range, then fight on.
    let active_position = manager.context().unit(active).unwrap().position.unwrap();
    let destination = Position::new(active_position.x - 1, active_position.y);
    manager
        .context_mut()
        .state
        .relocate(target, destination)
        .unwrap();
    manager
        .queue_action(active, "basic_strike", vec![ActionTarget::Unit(target)], None, None)
        .unwrap();
    let report = manager.end_turn(active).unwrap();
    assert!(!report.outcomes.is_empty());
}

#[test]
fn compact_snapshots_agree_with_json_saves() {
    let mut manager = manager_with_two_units();
    let json_blob = manager.save().unwrap();
    let compact_blob = manager.save_compact().unwrap();
    assert!(compact_blob.len() < json_blob.len());

    manager.load_compact(&compact_blob).unwrap();
    let after: SaveState = serde_json::from_slice(&manager.save().unwrap()).unwrap();
    let before: SaveState = serde_json::from_slice(&json_blob).unwrap();
    assert_eq!(before, after);
}

#[test]
fn repositories_store_manager_blobs() {
    let manager = manager_with_two_units();
    let blob = manager.save().unwrap();

    let memory = InMemorySaveRepo::new();
    memory.store("quick", &blob).unwrap();
    assert_eq!(memory.fetch("quick").unwrap(), blob);

    let dir = tempfile::tempdir().unwrap();
    let files = FileSaveRepo::new(dir.path()).unwrap();
    files.store("quick", &blob).unwrap();
    let fetched = files.fetch("quick").unwrap();

    // The blob is a structured document, not an opaque binary dump.
    let parsed: SaveState = serde_json::from_slice(&fetched).unwrap();
    assert_eq!(parsed.version, SaveState::VERSION);
    assert_eq!(parsed.units.len(), 2);
}
