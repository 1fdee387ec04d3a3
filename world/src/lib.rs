#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Visceral Reclaimer.

mod buildings;
mod enemies;
mod ledger;
mod navigation;
mod raids;
mod survivors;
mod timers;

use std::{sync::Arc, time::Duration};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};
use visceral_reclaimer_config::{ConfigError, GameConfig};
use visceral_reclaimer_core::{
    ActionError, BuildingId, CellCoord, Command, Cue, Event, LogTone, SurvivorId,
};

use buildings::BuildingRegistry;
use enemies::EnemyRoster;
use ledger::ResourceLedger;
use navigation::OccupancyGrid;
use survivors::Survivor;
use timers::{TimerAction, TimerQueue};

/// Errors raised while constructing a world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The core building could not be instantiated on its tile.
    #[error("core building could not be placed at {cell}")]
    CorePlacement {
        /// Tile the core was configured for.
        cell: CellCoord,
    },
}

/// Represents the authoritative Visceral Reclaimer world state.
#[derive(Debug)]
pub struct World {
    config: Arc<GameConfig>,
    clock: Duration,
    rng: ChaCha8Rng,
    ledger: ResourceLedger,
    grid: OccupancyGrid,
    buildings: BuildingRegistry,
    core: BuildingId,
    survivors: Vec<Survivor>,
    enemies: EnemyRoster,
    timers: TimerQueue,
    wave: u32,
    game_over: bool,
}

impl World {
    /// Creates a world from validated configuration with the core placed and
    /// the survivor roster populated.
    pub fn new(config: Arc<GameConfig>, seed: u64) -> Result<Self, WorldError> {
        config.validate()?;

        let core_cell = config.core;
        let mut grid = OccupancyGrid::new(config.grid.width, config.grid.height, core_cell);
        let mut buildings = BuildingRegistry::new();
        let (core_kind, core_def) = config
            .core_building()
            .ok_or(ConfigError::MissingCoreBuilding)?;
        let core = buildings
            .instantiate(core_kind.clone(), core_def, core_cell)
            .ok_or(WorldError::CorePlacement { cell: core_cell })?;
        grid.occupy(core_cell, core);

        let survivors = (0u32..)
            .zip(config.survivors.iter())
            .map(|(index, template)| {
                Survivor::new(SurvivorId::new(index), template.name.clone(), template.max_hp)
            })
            .collect();

        info!(
            columns = config.grid.width,
            rows = config.grid.height,
            core = %core_cell,
            seed,
            "world created"
        );

        Ok(Self {
            ledger: ResourceLedger::new(config.starting_resources),
            config,
            clock: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(seed),
            grid,
            buildings,
            core,
            survivors,
            enemies: EnemyRoster::new(),
            timers: TimerQueue::new(),
            wave: 0,
            game_over: false,
        })
    }

    fn advance_clock(&mut self, dt: Duration, out: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        out.push(Event::TimeAdvanced { dt });

        for (token, action) in self.timers.drain_due(self.clock) {
            match action {
                TimerAction::AutoResolveEncounter { survivor } => {
                    self.auto_resolve_encounter(survivor, token, out);
                }
            }
        }
    }

    fn begin_wave(&mut self, wave: u32, enemies: u32, out: &mut Vec<Event>) {
        self.wave = wave;
        info!(wave, enemies, "wave started");
        out.push(Event::WaveStarted { wave, enemies });
        push_log(out, LogTone::Warning, format!("DEFCON {wave} INCOMING!"));
        push_cue(out, Cue::WaveAnnounce);
    }

    fn run_economy(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let seconds = dt.as_secs_f64();
        if self.update_building_states(seconds, out) {
            self.push_resources(out);
        }
        let _ = self.update_survivor_passives(seconds, out);
    }

    pub(crate) fn push_resources(&self, out: &mut Vec<Event>) {
        out.push(Event::ResourcesChanged {
            resources: self.ledger.totals(),
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Once the core has fallen every command other than `Tick` is rejected and
/// ticks are ignored.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.game_over {
        if !matches!(command, Command::Tick { .. }) {
            out_events.push(Event::ActionRejected {
                reason: ActionError::GameOver,
            });
        }
        return;
    }

    match command {
        Command::Tick { dt } => world.advance_clock(dt, out_events),
        Command::PlaceBuilding { kind, cell } => world.place_building(kind, cell, out_events),
        Command::RemoveBuilding { building } => world.remove_building(building, out_events),
        Command::InspectTile { cell } => world.inspect_tile(cell, out_events),
        Command::RunEconomy { dt } => world.run_economy(dt, out_events),
        Command::RepairCore => world.repair_core(out_events),
        Command::HealSurvivor { survivor } => world.heal_survivor(survivor, out_events),
        Command::MutateSurvivor { survivor } => world.mutate_survivor(survivor, out_events),
        Command::OfferRaidZones { survivor } => world.offer_raid_zones(survivor, out_events),
        Command::DispatchRaid { survivor, zone } => {
            world.dispatch_raid(survivor, zone, out_events);
        }
        Command::PollRaids => world.poll_raids(out_events),
        Command::ResolveEncounter { survivor, choice } => {
            world.resolve_encounter(survivor, choice, out_events);
        }
        Command::BeginWave { wave, enemies } => world.begin_wave(wave, enemies, out_events),
        Command::SpawnEnemy { kind, row } => world.spawn_enemy(kind, row, out_events),
        Command::ReplanEnemyPath { enemy } => world.replan_enemy_path(enemy),
        Command::StepEnemy { enemy } => world.step_enemy(enemy, out_events),
        Command::StrikeCore { enemy } => world.strike_core(enemy, out_events),
        Command::FireTurret { turret, enemy } => world.fire_turret(turret, enemy, out_events),
    }
}

pub(crate) fn push_log(out: &mut Vec<Event>, tone: LogTone, message: impl Into<String>) {
    out.push(Event::LogLine {
        message: message.into(),
        tone,
    });
}

pub(crate) fn push_cue(out: &mut Vec<Event>, cue: Cue) {
    out.push(Event::Cue { cue });
}

/// Reports a rejected action with a player-facing explanation.
pub(crate) fn reject(out: &mut Vec<Event>, reason: ActionError, message: impl Into<String>) {
    debug!(?reason, "action rejected");
    let informational = matches!(
        reason,
        ActionError::AlreadyAtFullHealth | ActionError::CoreAtFullIntegrity
    );
    if informational {
        push_log(out, LogTone::Info, message);
    } else {
        push_log(out, LogTone::Warning, message);
        push_cue(out, Cue::Error);
    }
    out.push(Event::ActionRejected { reason });
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{sync::Arc, time::Duration};

    use visceral_reclaimer_config::GameConfig;
    use visceral_reclaimer_core::{
        BuildingCategory, BuildingSnapshot, BuildingView, CellCoord, EnemyView, Resources,
        SurvivorId, SurvivorSnapshot,
    };

    use super::{buildings::Building, World};

    /// Configuration the world was created from.
    #[must_use]
    pub fn config(world: &World) -> &Arc<GameConfig> {
        &world.config
    }

    /// Current simulation clock.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Current resource totals.
    #[must_use]
    pub fn resources(world: &World) -> Resources {
        world.ledger.totals()
    }

    /// Number of the most recently started wave, zero before the first.
    #[must_use]
    pub fn wave(world: &World) -> u32 {
        world.wave
    }

    /// Reports whether the core has fallen.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Grid dimensions as columns and rows.
    #[must_use]
    pub fn grid_dimensions(world: &World) -> (u32, u32) {
        world.grid.dimensions()
    }

    /// Tile occupied by the core.
    #[must_use]
    pub fn core_cell(world: &World) -> CellCoord {
        world.grid.core()
    }

    /// Current and maximum core hit points.
    #[must_use]
    pub fn core_integrity(world: &World) -> Option<(f64, f64)> {
        world
            .buildings
            .get(world.core)
            .map(|core| (core.hp, core.max_hp))
    }

    fn snapshot(world: &World, building: &Building) -> BuildingSnapshot {
        let def = world.config.buildings.get(&building.kind);
        BuildingSnapshot {
            id: building.id,
            kind: building.kind.clone(),
            category: def.map_or(BuildingCategory::Barrier, |def| def.category),
            cell: building.cell,
            hp: building.hp,
            max_hp: building.max_hp,
            upkeep: building.upkeep,
            range: def.map_or(0.0, |def| def.range),
            damage: def.map_or(0.0, |def| def.damage),
        }
    }

    /// Captures a read-only view of every building.
    #[must_use]
    pub fn building_view(world: &World) -> BuildingView {
        BuildingView::from_snapshots(
            world
                .buildings
                .iter()
                .map(|building| snapshot(world, building))
                .collect(),
        )
    }

    /// Building occupying the provided tile, if any.
    #[must_use]
    pub fn building_at(world: &World, cell: CellCoord) -> Option<BuildingSnapshot> {
        world
            .grid
            .occupant(cell)
            .and_then(|id| world.buildings.get(id))
            .map(|building| snapshot(world, building))
    }

    /// Captures a read-only view of every enemy.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(world.enemies.iter().map(|enemy| enemy.snapshot()).collect())
    }

    /// Number of enemies alive.
    #[must_use]
    pub fn enemy_count(world: &World) -> usize {
        world.enemies.len()
    }

    /// Snapshot of a single survivor.
    #[must_use]
    pub fn survivor(world: &World, survivor: SurvivorId) -> Option<SurvivorSnapshot> {
        world
            .survivor_index(survivor)
            .map(|index| world.survivors[index].snapshot(world.clock))
    }

    /// Snapshots of the whole roster in identifier order.
    #[must_use]
    pub fn survivors(world: &World) -> Vec<SurvivorSnapshot> {
        world
            .survivors
            .iter()
            .map(|entry| entry.snapshot(world.clock))
            .collect()
    }

    /// Reports whether a tile is occupied by anything other than the core.
    #[must_use]
    pub fn is_cell_blocked(world: &World, cell: CellCoord) -> bool {
        world.grid.is_blocked(cell)
    }

    /// Shortest path between two tiles, excluding `start`.
    #[must_use]
    pub fn find_path(world: &World, start: CellCoord, target: CellCoord) -> Option<Vec<CellCoord>> {
        world.grid.find_path(start, target)
    }

    /// Reports whether `target` can be reached from `start`.
    #[must_use]
    pub fn is_target_reachable(world: &World, start: CellCoord, target: CellCoord) -> bool {
        world.grid.is_target_reachable(start, target)
    }

    /// Number of deferred actions waiting on the clock.
    #[must_use]
    pub fn pending_timers(world: &World) -> usize {
        world.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visceral_reclaimer_core::{
        BuildingKind, EnemyKind, PlacementError, ResourceKind, SurvivorStatus, UpkeepState,
    };

    fn world() -> World {
        let config = GameConfig::builtin().expect("builtin config");
        World::new(Arc::new(config), 7).expect("world")
    }

    fn rejections(events: &[Event]) -> Vec<ActionError> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::ActionRejected { reason } => Some(*reason),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn new_world_places_core_and_roster() {
        let world = world();

        assert_eq!(query::core_integrity(&world), Some((500.0, 500.0)));
        assert_eq!(query::core_cell(&world), CellCoord::new(2, 7));
        assert_eq!(query::survivors(&world).len(), 3);
        assert_eq!(query::resources(&world).scrap, 100.0);
        assert_eq!(query::building_view(&world).iter().count(), 1);
    }

    #[test]
    fn unbounded_raid_duration_is_refused_at_construction() {
        let mut config = GameConfig::builtin().expect("builtin config");
        if let Some(zone) = config.raid_zones.values_mut().next() {
            zone.duration_secs = [1.0, f64::MAX];
        }

        let error = World::new(Arc::new(config), 7).expect_err("invalid zone");
        assert!(matches!(
            error,
            WorldError::Config(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn tick_advances_the_clock() {
        let mut world = world();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(250),
            },
            &mut events,
        );

        assert_eq!(query::clock(&world), Duration::from_millis(250));
        assert_eq!(
            events,
            vec![Event::TimeAdvanced {
                dt: Duration::from_millis(250)
            }]
        );
    }

    #[test]
    fn placement_spends_cost_and_occupies_tile() {
        let mut world = world();
        let mut events = Vec::new();
        let cell = CellCoord::new(6, 3);

        apply(
            &mut world,
            Command::PlaceBuilding {
                kind: BuildingKind::new("TURRET"),
                cell,
            },
            &mut events,
        );

        assert_eq!(query::resources(&world).scrap, 75.0);
        assert!(query::is_cell_blocked(&world, cell));
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::BuildingPlaced { .. })));
    }

    #[test]
    fn placement_on_core_tile_is_rejected() {
        let mut world = world();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::PlaceBuilding {
                kind: BuildingKind::new("WALL"),
                cell: CellCoord::new(2, 7),
            },
            &mut events,
        );

        assert!(events.iter().any(|event| matches!(
            event,
            Event::PlacementRejected {
                reason: PlacementError::Occupied,
                ..
            }
        )));
        assert_eq!(query::resources(&world).scrap, 100.0);
    }

    #[test]
    fn unpaid_upkeep_deactivates_and_payment_restores() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceBuilding {
                kind: BuildingKind::new("TURRET"),
                cell: CellCoord::new(8, 2),
            },
            &mut events,
        );
        world.ledger = ResourceLedger::new(Default::default());
        events.clear();

        apply(
            &mut world,
            Command::RunEconomy {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        let turret = query::building_at(&world, CellCoord::new(8, 2)).expect("turret");
        assert_eq!(turret.upkeep, UpkeepState::Upkept { active: false });
        assert!(events.contains(&Event::BuildingActivationChanged {
            building: turret.id,
            active: false,
        }));

        world.ledger.grant(ResourceKind::Biomass, 10.0);
        events.clear();
        apply(
            &mut world,
            Command::RunEconomy {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        let turret = query::building_at(&world, CellCoord::new(8, 2)).expect("turret");
        assert_eq!(turret.upkeep, UpkeepState::Upkept { active: true });
        assert!((query::resources(&world).biomass - 9.8).abs() < 1e-9);
    }

    #[test]
    fn heal_to_full_clears_injury() {
        let mut world = world();
        world.survivors[0].hp = 80.0;
        world.survivors[0].status = SurvivorStatus::Injured;
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::HealSurvivor {
                survivor: SurvivorId::new(0),
            },
            &mut events,
        );

        let survivor = query::survivor(&world, SurvivorId::new(0)).expect("survivor");
        assert_eq!(survivor.hp, 100.0);
        assert_eq!(survivor.status, SurvivorStatus::Idle);
        assert_eq!(query::resources(&world).biomass, 40.0);
    }

    #[test]
    fn heal_at_full_health_is_rejected_without_cost() {
        let mut world = world();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::HealSurvivor {
                survivor: SurvivorId::new(1),
            },
            &mut events,
        );

        assert_eq!(rejections(&events), vec![ActionError::AlreadyAtFullHealth]);
        assert_eq!(query::resources(&world).biomass, 50.0);
    }

    #[test]
    fn heal_checks_health_before_status() {
        let mut world = world();
        world.survivors[0].status = SurvivorStatus::Raiding;
        world.survivors[1].status = SurvivorStatus::Raiding;
        world.survivors[1].hp = 40.0;
        let mut events = Vec::new();

        for id in [0, 1] {
            apply(
                &mut world,
                Command::HealSurvivor {
                    survivor: SurvivorId::new(id),
                },
                &mut events,
            );
        }

        assert_eq!(
            rejections(&events),
            vec![
                ActionError::AlreadyAtFullHealth,
                ActionError::InvalidStatus {
                    status: SurvivorStatus::Raiding
                },
            ]
        );
        assert_eq!(query::resources(&world).biomass, 50.0);
    }

    #[test]
    fn repair_at_full_integrity_is_rejected() {
        let mut world = world();
        let mut events = Vec::new();

        apply(&mut world, Command::RepairCore, &mut events);

        assert_eq!(rejections(&events), vec![ActionError::CoreAtFullIntegrity]);
    }

    #[test]
    fn core_cannot_be_removed() {
        let mut world = world();
        let mut events = Vec::new();
        let core = query::building_at(&world, CellCoord::new(2, 7)).expect("core");

        apply(
            &mut world,
            Command::RemoveBuilding { building: core.id },
            &mut events,
        );

        assert_eq!(rejections(&events), vec![ActionError::CoreIsPermanent]);
    }

    #[test]
    fn game_over_latches_and_rejects_commands() {
        let mut world = world();
        let mut events = Vec::new();
        world.game_over = true;

        apply(&mut world, Command::RepairCore, &mut events);
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::new("SCRAPPER"),
                row: 0,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::ActionRejected {
                    reason: ActionError::GameOver
                },
                Event::ActionRejected {
                    reason: ActionError::GameOver
                },
            ]
        );
        assert_eq!(query::clock(&world), Duration::ZERO);
        assert_eq!(query::enemy_count(&world), 0);
    }
}
