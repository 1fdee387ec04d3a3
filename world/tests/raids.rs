use std::{sync::Arc, time::Duration};

use visceral_reclaimer_config::GameConfig;
use visceral_reclaimer_core::{Command, EncounterChoice, Event, SurvivorId, SurvivorStatus, ZoneId};
use visceral_reclaimer_world::{self as world, query, World};

const VEX: SurvivorId = SurvivorId::new(0);

fn world_with_zones(encounter_chance: f64, duration_secs: f64) -> World {
    let mut config = GameConfig::builtin().expect("builtin config");
    for zone in config.raid_zones.values_mut() {
        zone.encounter_chance = encounter_chance;
        zone.duration_secs = [duration_secs, duration_secs];
    }
    World::new(Arc::new(config), 3).expect("world")
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

fn tick(world: &mut World, secs: u64) -> Vec<Event> {
    run(
        world,
        Command::Tick {
            dt: Duration::from_secs(secs),
        },
    )
}

fn dispatch(world: &mut World) {
    let events = run(
        world,
        Command::DispatchRaid {
            survivor: VEX,
            zone: ZoneId::new("COLLAPSED_MALL"),
        },
    );
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::RaidStarted { .. })));
}

#[test]
fn resolving_an_encounter_shifts_the_end_by_the_pause() {
    let mut world = world_with_zones(1.0, 40.0);
    dispatch(&mut world);

    let _ = tick(&mut world, 12);
    let events = run(&mut world, Command::PollRaids);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::EncounterStarted { survivor, .. } if *survivor == VEX
    )));
    let paused = query::survivor(&world, VEX).expect("survivor");
    assert_eq!(paused.status, SurvivorStatus::Paused);
    assert_eq!(paused.raid.as_ref().map(|raid| raid.ends_at), Some(Duration::from_secs(40)));
    assert_eq!(query::pending_timers(&world), 1);

    let _ = tick(&mut world, 3);
    let events = run(
        &mut world,
        Command::ResolveEncounter {
            survivor: VEX,
            choice: EncounterChoice::Continue,
        },
    );

    assert!(events.contains(&Event::EncounterResolved {
        survivor: VEX,
        choice: EncounterChoice::Continue,
    }));
    let resumed = query::survivor(&world, VEX).expect("survivor");
    let raid = resumed.raid.expect("raid in progress");
    assert_eq!(resumed.status, SurvivorStatus::Raiding);
    assert!(!raid.paused);
    assert_eq!(raid.ends_at, Duration::from_secs(43));
    assert!((raid.progress - 0.3).abs() < 1e-9);
    assert_eq!(query::pending_timers(&world), 0);
}

#[test]
fn unanswered_encounter_resolves_itself() {
    let mut world = world_with_zones(1.0, 40.0);
    dispatch(&mut world);
    let _ = tick(&mut world, 12);
    let _ = run(&mut world, Command::PollRaids);

    let events = tick(&mut world, 4);

    assert!(events.contains(&Event::EncounterResolved {
        survivor: VEX,
        choice: EncounterChoice::Continue,
    }));
    let survivor = query::survivor(&world, VEX).expect("survivor");
    assert_eq!(survivor.status, SurvivorStatus::Raiding);
    assert_eq!(
        survivor.raid.map(|raid| raid.ends_at),
        Some(Duration::from_secs(44))
    );
    assert_eq!(query::pending_timers(&world), 0);
}

#[test]
fn progress_stays_bounded_and_monotonic_until_completion() {
    let mut world = world_with_zones(0.0, 30.0);
    dispatch(&mut world);

    let mut last = 0.0;
    let mut completed = false;
    for _ in 0..10 {
        let _ = tick(&mut world, 5);
        let events = run(&mut world, Command::PollRaids);
        if let Some(raid) = query::survivor(&world, VEX).and_then(|survivor| survivor.raid) {
            assert!((0.0..=1.0).contains(&raid.progress));
            assert!(raid.progress >= last);
            last = raid.progress;
        }
        if events
            .iter()
            .any(|event| matches!(event, Event::RaidCompleted { .. }))
        {
            completed = true;
            break;
        }
    }

    assert!(completed);
    let survivor = query::survivor(&world, VEX).expect("survivor");
    assert!(survivor.raid.is_none());
    assert_ne!(survivor.status, SurvivorStatus::Raiding);
    assert_eq!(query::clock(&world), Duration::from_secs(30));
}

#[test]
fn raiding_survivor_cannot_be_dispatched_again() {
    let mut world = world_with_zones(0.0, 30.0);
    dispatch(&mut world);

    let events = run(&mut world, Command::OfferRaidZones { survivor: VEX });

    assert!(events
        .iter()
        .any(|event| matches!(event, Event::ActionRejected { .. })));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::DialogRequested { .. })));
}

#[test]
fn idle_survivor_is_offered_every_zone() {
    let mut world = world_with_zones(0.1, 30.0);

    let events = run(&mut world, Command::OfferRaidZones { survivor: VEX });

    let offered = events.iter().find_map(|event| match event {
        Event::DialogRequested {
            dialog: visceral_reclaimer_core::Dialog::ZoneChoice { zones, .. },
        } => Some(zones.len()),
        _ => None,
    });
    assert_eq!(offered, Some(3));
}
