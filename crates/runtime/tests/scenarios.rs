//! End-to-end combat scenarios driven through the action manager.

use std::sync::{Arc, Mutex};

use battle_core::{
    ActionTarget, AttributeKind, BattleConfig, BattleContext, CoreError, Faction, Grid, Position,
    SkipCause, StepOutcome, UnitId, UnitTemplate, ValidationError,
};
use battle_content::default_action_registry;
use battle_runtime::{ActionManager, BattleEvent, RuntimeError, Topic};

fn attacker_template() -> UnitTemplate {
    UnitTemplate::builder("attacker", "Attacker")
        .health(50)
        .mp(10)
        .attribute(AttributeKind::Strength, 10)
        .build()
}

/// physical_defense = (strength + fortitude) / 2 = 4
fn defender_template(hp: i32) -> UnitTemplate {
    UnitTemplate::builder("defender", "Defender")
        .health(hp)
        .attribute(AttributeKind::Strength, 5)
        .attribute(AttributeKind::Fortitude, 3)
        .build()
}

/// magical_defense = (wisdom + wonder) / 2 = 3
fn mage_victim_template(hp: i32) -> UnitTemplate {
    UnitTemplate::builder("victim", "Victim")
        .health(hp)
        .attribute(AttributeKind::Wisdom, 3)
        .attribute(AttributeKind::Wonder, 3)
        .build()
}

fn manager_on_open_grid(size: u32) -> ActionManager {
    let registry = default_action_registry().unwrap();
    let context = BattleContext::new(BattleConfig::default(), registry, Grid::open(size, size), 42);
    ActionManager::new(context)
}

fn collect_events(manager: &mut ActionManager) -> Arc<Mutex<Vec<BattleEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for topic in Topic::ALL {
        let log = Arc::clone(&log);
        manager
            .bus_mut()
            .subscribe_infallible(topic, move |event| {
                log.lock().unwrap().push(event.clone());
            });
    }
    log
}

#[test]
fn basic_attack_in_range() {
    let mut manager = manager_on_open_grid(8);
    let a = manager
        .context_mut()
        .spawn(&attacker_template(), Faction::Player, Position::new(2, 2))
        .unwrap();
    let b = manager
        .context_mut()
        .spawn(&defender_template(30), Faction::Enemy, Position::new(3, 2))
        .unwrap();
    let events = collect_events(&mut manager);

    manager.begin_battle().unwrap();
    assert_eq!(manager.context().turn.active_unit, Some(a));
    let ap_at_queue = manager.context().unit(a).unwrap().resources.ap.current();

    manager
        .queue_action(a, "basic_strike", vec![ActionTarget::Unit(b)], None, None)
        .unwrap();
    let report = manager.end_turn(a).unwrap();

    // max(1, 12 − 4) = 8 damage.
    let defender = manager.context().unit(b).unwrap();
    assert_eq!(defender.resources.hp.current(), 22);
    assert!(defender.is_alive());

    // Costs came out of the attacker's AP at execution.
    let attacker = manager.context().unit(a).unwrap();
    assert_eq!(attacker.resources.ap.current(), ap_at_queue - 3);

    assert!(matches!(&report.outcomes[0], StepOutcome::Executed { .. }));
    let executed = events
        .lock()
        .unwrap()
        .iter()
        .find_map(|event| match event {
            BattleEvent::ActionExecuted { report, .. } => Some(report.clone()),
            _ => None,
        })
        .expect("action_executed event");
    assert_eq!(executed.damage_total, 8);
}

#[test]
fn out_of_range_attack_fails_without_side_effects() {
    let mut manager = manager_on_open_grid(8);
    let a = manager
        .context_mut()
        .spawn(&attacker_template(), Faction::Player, Position::new(2, 2))
        .unwrap();
    let b = manager
        .context_mut()
        .spawn(&defender_template(30), Faction::Enemy, Position::new(5, 2))
        .unwrap();
    manager.begin_battle().unwrap();
    let events = collect_events(&mut manager);
    let resources_before = manager.context().unit(a).unwrap().resources;

    let error = manager
        .queue_action(a, "basic_strike", vec![ActionTarget::Unit(b)], None, None)
        .unwrap_err();
    match &error {
        RuntimeError::Battle(battle) => {
            assert_eq!(battle.error_code(), "VALIDATE_OUT_OF_RANGE");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // No resources consumed, nothing queued, and the only event is the failure.
    assert_eq!(manager.context().unit(a).unwrap().resources, resources_before);
    assert_eq!(manager.context().queue.total_queued(), 0);
    let log = events.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert!(matches!(&log[0], BattleEvent::ActionFailed { code, .. }
        if code == "VALIDATE_OUT_OF_RANGE"));
}

#[test]
fn fireball_sweeps_its_area() {
    let mut manager = manager_on_open_grid(10);
    let caster_template = UnitTemplate::builder("mage", "Mage").health(50).mp(10).build();
    let caster = manager
        .context_mut()
        .spawn(&caster_template, Faction::Player, Position::new(2, 4))
        .unwrap();

    // Center plus the four cardinal neighbours, all within radius 1.
    let positions = [
        Position::new(4, 4),
        Position::new(3, 4),
        Position::new(5, 4),
        Position::new(4, 3),
        Position::new(4, 5),
    ];
    let mut victims = Vec::new();
    for (index, &position) in positions.iter().enumerate() {
        let hp = if index == 0 { 10 } else { 30 };
        let id = manager
            .context_mut()
            .spawn(&mage_victim_template(hp), Faction::Enemy, position)
            .unwrap();
        victims.push(id);
    }

    manager.begin_battle().unwrap();
    manager
        .queue_action(
            caster,
            "fireball",
            vec![ActionTarget::Tile(Position::new(4, 4))],
            None,
            None,
        )
        .unwrap();
    let report = manager.end_turn(caster).unwrap();

    let StepOutcome::Executed {
        report: execution, ..
    } = &report.outcomes[0]
    else {
        panic!("fireball skipped: {:?}", report.outcomes[0]);
    };

    // 15 magical − 3 magical defense = 12 to each of the five targets; the
    // 10-HP center victim only has 10 to lose.
    assert_eq!(execution.damage_total, 10 + 4 * 12);
    assert_eq!(execution.deaths, vec![victims[0]]);

    let center_victim = manager.context().unit(victims[0]).unwrap();
    assert!(!center_victim.is_alive());
    assert_eq!(center_victim.position, None);
    assert_eq!(
        manager.context().state.grid.occupant(Position::new(4, 4)),
        None
    );
    for &survivor in &victims[1..] {
        assert_eq!(
            manager.context().unit(survivor).unwrap().resources.hp.current(),
            18
        );
    }
}

#[test]
fn cooldown_blocks_requeue_until_it_expires() {
    let mut manager = manager_on_open_grid(8);
    let d = manager
        .context_mut()
        .spawn(&attacker_template(), Faction::Player, Position::new(2, 2))
        .unwrap();
    let wall_of_meat = UnitTemplate::builder("bulwark", "Bulwark")
        .health(300)
        .attribute(AttributeKind::Fortitude, 20)
        .build();
    let e = manager
        .context_mut()
        .spawn(&wall_of_meat, Faction::Enemy, Position::new(3, 2))
        .unwrap();

    manager.begin_battle().unwrap();

    // Turn 1: power_attack executes and starts its 2-turn cooldown.
    manager
        .queue_action(d, "power_attack", vec![ActionTarget::Unit(e)], None, None)
        .unwrap();
    manager.end_turn(d).unwrap();
    manager.end_turn(e).unwrap();

    // Turn 2: still cooling down, one turn left.
    let error = manager
        .queue_action(d, "power_attack", vec![ActionTarget::Unit(e)], None, None)
        .unwrap_err();
    match error {
        RuntimeError::Battle(battle_core::BattleError::Validation(
            ValidationError::OnCooldown { remaining },
        )) => assert_eq!(remaining, 1),
        other => panic!("unexpected error {other:?}"),
    }
    manager.end_turn(d).unwrap();
    manager.end_turn(e).unwrap();

    // Turn 3: the cooldown has expired.
    manager
        .queue_action(d, "power_attack", vec![ActionTarget::Unit(e)], None, None)
        .unwrap();
}

#[test]
fn equal_initiative_ties_break_by_queue_order() {
    let mut manager = manager_on_open_grid(8);
    let template = UnitTemplate::builder("duelist", "Duelist")
        .health(100)
        .attribute(AttributeKind::Speed, 20)
        .build();
    let e = manager
        .context_mut()
        .spawn(&template, Faction::Player, Position::new(2, 2))
        .unwrap();
    let f = manager
        .context_mut()
        .spawn(&template, Faction::Enemy, Position::new(3, 2))
        .unwrap();

    manager.begin_battle().unwrap();

    // E queues first; both are Normal priority with cast time 0.
    manager
        .queue_action(e, "basic_strike", vec![ActionTarget::Unit(f)], None, None)
        .unwrap();
    manager
        .queue_action(f, "basic_strike", vec![ActionTarget::Unit(e)], None, None)
        .unwrap();

    let timeline = manager.timeline_preview();
    assert_eq!(timeline[0].unit_id, e);
    assert_eq!(timeline[1].unit_id, f);
    assert_eq!(timeline[0].order, timeline[1].order);

    let report = manager.end_turn(e).unwrap();
    let executed: Vec<UnitId> = report
        .outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            StepOutcome::Executed { queued, .. } => Some(queued.unit_id),
            _ => None,
        })
        .collect();
    assert_eq!(executed, vec![e, f]);
}

#[test]
fn dead_casters_queued_actions_are_skipped() {
    let mut manager = manager_on_open_grid(8);
    let glass = UnitTemplate::builder("glass", "Glass")
        .health(5)
        .attribute(AttributeKind::Speed, 5)
        .attribute(AttributeKind::Strength, 0)
        .attribute(AttributeKind::Fortitude, 0)
        .build();
    let a = manager
        .context_mut()
        .spawn(&attacker_template(), Faction::Player, Position::new(2, 2))
        .unwrap();
    let b = manager
        .context_mut()
        .spawn(&glass, Faction::Enemy, Position::new(3, 2))
        .unwrap();
    let c = manager
        .context_mut()
        .spawn(&defender_template(30), Faction::Enemy, Position::new(2, 3))
        .unwrap();

    manager.begin_battle().unwrap();

    // A kills B before B's queued strike resolves.
    manager
        .queue_action(b, "basic_strike", vec![ActionTarget::Unit(a)], None, None)
        .unwrap();
    manager
        .queue_action(a, "basic_strike", vec![ActionTarget::Unit(b)], None, None)
        .unwrap();
    let hp_before = manager.context().unit(a).unwrap().resources.hp.current();
    let report = manager.end_turn(a).unwrap();

    let skipped = report
        .outcomes
        .iter()
        .find_map(|outcome| match outcome {
            StepOutcome::Skipped { queued, cause } if queued.unit_id == b => Some(cause.clone()),
            _ => None,
        })
        .expect("dead caster skip");
    assert_eq!(skipped, SkipCause::DeadCaster);
    // The corpse's strike never landed.
    assert_eq!(manager.context().unit(a).unwrap().resources.hp.current(), hp_before);
    let _ = c;
}

#[test]
fn movement_consumes_budget_and_emits_unit_moved() {
    let mut manager = manager_on_open_grid(8);
    let a = manager
        .context_mut()
        .spawn(&attacker_template(), Faction::Player, Position::new(0, 0))
        .unwrap();
    let b = manager
        .context_mut()
        .spawn(&defender_template(30), Faction::Enemy, Position::new(7, 7))
        .unwrap();
    let events = collect_events(&mut manager);

    manager.begin_battle().unwrap();
    let report = manager
        .execute_immediately(a, "advance", &[ActionTarget::Tile(Position::new(2, 0))])
        .unwrap();

    let movement = report.movement.expect("movement record");
    assert_eq!(movement.from, Position::new(0, 0));
    assert_eq!(movement.to, Position::new(2, 0));
    assert_eq!(movement.cost, 2000);

    let unit = manager.context().unit(a).unwrap();
    assert_eq!(unit.position, Some(Position::new(2, 0)));
    assert_eq!(unit.movement_remaining, unit.max_movement() - 2000);
    // 1 AP action cost + 1 AP per tile.
    assert_eq!(unit.resources.ap.current(), 10 - 1 - 2);

    assert!(events.lock().unwrap().iter().any(|event| matches!(
        event,
        BattleEvent::UnitMoved { unit, to, .. }
            if *unit == a && *to == Position::new(2, 0)
    )));
    let _ = b;
}

#[test]
fn queue_then_cancel_leaves_resources_unchanged() {
    let mut manager = manager_on_open_grid(8);
    let a = manager
        .context_mut()
        .spawn(&attacker_template(), Faction::Player, Position::new(2, 2))
        .unwrap();
    let b = manager
        .context_mut()
        .spawn(&defender_template(30), Faction::Enemy, Position::new(3, 2))
        .unwrap();

    manager.begin_battle().unwrap();
    let before = manager.context().unit(a).unwrap().resources;

    manager
        .queue_action(a, "basic_strike", vec![ActionTarget::Unit(b)], None, None)
        .unwrap();
    assert!(manager.remove(a, 0));

    assert_eq!(manager.context().unit(a).unwrap().resources, before);
    assert_eq!(manager.context().queue.total_queued(), 0);

    // Ending the turn now executes nothing.
    let report = manager.end_turn(a).unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(manager.context().unit(b).unwrap().resources.hp.current(), 30);
}

#[test]
fn hotkey_slots_report_availability() {
    let mut manager = manager_on_open_grid(8);
    let template = UnitTemplate::builder("caster", "Caster")
        .health(50)
        .mp(10)
        .hotkey(0, "basic_strike")
        .hotkey(1, "fireball")
        .hotkey(2, "power_attack")
        .build();
    let a = manager
        .context_mut()
        .spawn(&template, Faction::Player, Position::new(2, 2))
        .unwrap();
    manager
        .context_mut()
        .spawn(&defender_template(30), Faction::Enemy, Position::new(3, 2))
        .unwrap();

    manager.begin_battle().unwrap();
    manager
        .context_mut()
        .state
        .unit_mut(a)
        .unwrap()
        .set_cooldown("power_attack", 2);

    let bar = manager.context().hotkey_availability(a).unwrap();
    assert_eq!(bar.len(), 8);
    // Affordable and off cooldown.
    assert_eq!(bar[0], (Some("basic_strike".into()), true));
    // MP 10 covers the fireball.
    assert_eq!(bar[1], (Some("fireball".into()), true));
    // On cooldown.
    assert_eq!(bar[2], (Some("power_attack".into()), false));
    // Unbound slots are never available.
    assert_eq!(bar[3], (None, false));
}

#[test]
fn reachable_tiles_respect_remaining_movement() {
    let mut manager = manager_on_open_grid(8);
    let a = manager
        .context_mut()
        .spawn(&attacker_template(), Faction::Player, Position::new(0, 0))
        .unwrap();
    manager
        .context_mut()
        .spawn(&defender_template(30), Faction::Enemy, Position::new(7, 7))
        .unwrap();

    manager.begin_battle().unwrap();
    let reachable = manager.context_mut().reachable_tiles(a).unwrap();
    // Base movement is 3 points on open ground.
    assert!(reachable.contains(&Position::new(3, 0)));
    assert!(!reachable.contains(&Position::new(4, 0)));

    // Spending movement shrinks the next query.
    manager
        .execute_immediately(a, "advance", &[ActionTarget::Tile(Position::new(2, 0))])
        .unwrap();
    let reachable = manager.context_mut().reachable_tiles(a).unwrap();
    assert!(reachable.contains(&Position::new(3, 0)));
    assert!(!reachable.contains(&Position::new(2, 2)));
}

#[test]
fn preview_matches_execution_when_deterministic() {
    let mut manager = manager_on_open_grid(8);
    let a = manager
        .context_mut()
        .spawn(&attacker_template(), Faction::Player, Position::new(2, 2))
        .unwrap();
    let b = manager
        .context_mut()
        .spawn(&defender_template(30), Faction::Enemy, Position::new(3, 2))
        .unwrap();

    manager.begin_battle().unwrap();

    let preview = manager
        .preview(a, "basic_strike", &[ActionTarget::Unit(b)])
        .unwrap();
    assert!(preview.hypothetical);

    let execution = manager
        .execute_immediately(a, "basic_strike", &[ActionTarget::Unit(b)])
        .unwrap();
    assert!(!execution.hypothetical);
    assert_eq!(preview.damage_total, execution.damage_total);
    assert_eq!(preview.records.len(), execution.records.len());
}
