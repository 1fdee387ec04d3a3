#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick orchestrator that owns the world and its systems, drives the periodic
//! cadences and exposes the presentation-facing command surface.

mod cadence;

use std::{sync::Arc, time::Duration};

use tracing::{debug, info};
use visceral_reclaimer_config::GameConfig;
use visceral_reclaimer_core::{
    ActionError, BuildingId, BuildingKind, CellCoord, Command, Cue, Dialog, EncounterChoice, Event,
    LogTone, SurvivorId, SurvivorStatus, TurretTarget, ZoneId,
};
use visceral_reclaimer_system_movement::Movement;
use visceral_reclaimer_system_spawning::{Config as SpawningConfig, Spawning};
use visceral_reclaimer_system_turret_targeting::TurretTargeting;
use visceral_reclaimer_world::{self as world, query, World, WorldError};

use cadence::Cadence;

const SPAWNING_SEED_SALT: u64 = 0x5eed_5a1d_c0de_0001;

/// Presentation-side selection state.
#[derive(Debug, Default)]
struct Selection {
    build_kind: Option<BuildingKind>,
    survivor: Option<SurvivorId>,
    zone_choice_for: Option<SurvivorId>,
}

/// Owns the world and every system, advancing them on independent cadences.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    spawning: Spawning,
    movement: Movement,
    targeting: TurretTargeting,
    targets: Vec<TurretTarget>,
    economy: Cadence,
    enemy_movement: Cadence,
    turret_fire: Cadence,
    raid_poll: Cadence,
    selection: Selection,
    refresh: bool,
}

impl Simulation {
    /// Creates a simulation from configuration and a seed shared by the
    /// world and the spawning system.
    pub fn new(config: Arc<GameConfig>, seed: u64) -> Result<Self, WorldError> {
        let world = World::new(Arc::clone(&config), seed)?;
        let spawning = Spawning::new(SpawningConfig::new(
            config.waves.clone(),
            config.grid.height,
            seed ^ SPAWNING_SEED_SALT,
        ));
        let timing = config.timing;

        Ok(Self {
            world,
            spawning,
            movement: Movement::default(),
            targeting: TurretTargeting::new(),
            targets: Vec::new(),
            economy: Cadence::new(timing.economy_interval()),
            enemy_movement: Cadence::new(timing.enemy_move_interval()),
            turret_fire: Cadence::new(timing.turret_fire_interval()),
            raid_poll: Cadence::new(timing.raid_poll_interval()),
            selection: Selection::default(),
            refresh: true,
        })
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Whole seconds until the next wave, for countdown displays.
    #[must_use]
    pub fn seconds_until_next_wave(&self) -> u64 {
        self.spawning.seconds_until_next_wave()
    }

    /// Currently selected survivor.
    #[must_use]
    pub fn selected_survivor(&self) -> Option<SurvivorId> {
        self.selection.survivor
    }

    /// Building type armed for placement by `click_tile`.
    #[must_use]
    pub fn selected_build_kind(&self) -> Option<&BuildingKind> {
        self.selection.build_kind.as_ref()
    }

    /// Survivor awaiting a raid zone choice.
    #[must_use]
    pub fn pending_zone_choice(&self) -> Option<SurvivorId> {
        self.selection.zone_choice_for
    }

    /// Reports whether any state-changing event occurred since the last call,
    /// and clears the flag.
    pub fn needs_refresh(&mut self) -> bool {
        std::mem::take(&mut self.refresh)
    }

    /// Advances simulated time by `dt`, running every cadence that came due.
    ///
    /// Long frames are split into slices no longer than the shortest cadence
    /// so that movement, turret fire and the rest stay interleaved in time
    /// order.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let slice = self.slice_length().unwrap_or(dt);
        let mut remaining = dt;
        while !remaining.is_zero() {
            if self.is_game_over() {
                return;
            }
            let step = remaining.min(slice);
            remaining -= step;
            self.advance_slice(step, out);
        }
    }

    fn slice_length(&self) -> Option<Duration> {
        [
            &self.economy,
            &self.enemy_movement,
            &self.turret_fire,
            &self.raid_poll,
        ]
        .into_iter()
        .map(Cadence::interval)
        .filter(|interval| !interval.is_zero())
        .min()
    }

    fn advance_slice(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let mut tick_events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut tick_events);
        let mut commands = Vec::new();
        self.spawning.handle(&tick_events, &mut commands);
        self.record(tick_events, out);
        self.execute_all(commands, out);

        for _ in 0..self.economy.accumulate(dt) {
            if self.is_game_over() {
                return;
            }
            let interval = self.economy.interval();
            self.execute(Command::RunEconomy { dt: interval }, out);
        }

        for _ in 0..self.enemy_movement.accumulate(dt) {
            if self.is_game_over() {
                return;
            }
            self.run_movement(out);
        }

        for _ in 0..self.turret_fire.accumulate(dt) {
            if self.is_game_over() {
                return;
            }
            self.run_turrets(out);
        }

        for _ in 0..self.raid_poll.accumulate(dt) {
            if self.is_game_over() {
                return;
            }
            self.execute(Command::PollRaids, out);
        }
    }

    /// Places a building of the provided type.
    pub fn place_building(&mut self, kind: BuildingKind, cell: CellCoord, out: &mut Vec<Event>) {
        self.execute(Command::PlaceBuilding { kind, cell }, out);
    }

    /// Arms or clears the building type used by `click_tile`.
    pub fn select_build_kind(&mut self, kind: Option<BuildingKind>) {
        debug!(kind = ?kind, "build selection changed");
        self.selection.build_kind = kind;
    }

    /// Places the armed building type on the tile, or inspects it when
    /// nothing is armed. The armed type is cleared by every placement
    /// attempt, successful or not.
    pub fn click_tile(&mut self, cell: CellCoord, out: &mut Vec<Event>) {
        match self.selection.build_kind.take() {
            Some(kind) => self.place_building(kind, cell, out),
            None => self.execute(Command::InspectTile { cell }, out),
        }
    }

    /// Deconstructs a building.
    pub fn remove_building(&mut self, building: BuildingId, out: &mut Vec<Event>) {
        self.execute(Command::RemoveBuilding { building }, out);
    }

    /// Selects a survivor. Dead or unknown survivors cannot be selected.
    pub fn select_survivor(&mut self, survivor: SurvivorId, out: &mut Vec<Event>) {
        match query::survivor(&self.world, survivor) {
            Some(snapshot) if snapshot.status != SurvivorStatus::Dead => {
                self.selection.survivor = Some(survivor);
            }
            Some(snapshot) => self.refuse(
                ActionError::InvalidStatus {
                    status: snapshot.status,
                },
                format!("{} is dead and cannot be selected.", snapshot.name),
                out,
            ),
            None => self.refuse(
                ActionError::UnknownSurvivor,
                "No such survivor.".to_owned(),
                out,
            ),
        }
    }

    /// Heals the selected survivor.
    pub fn heal_selected(&mut self, out: &mut Vec<Event>) {
        if let Some(survivor) = self.require_selection(out) {
            self.execute(Command::HealSurvivor { survivor }, out);
        }
    }

    /// Attempts a mutation on the selected survivor.
    pub fn mutate_selected(&mut self, out: &mut Vec<Event>) {
        if let Some(survivor) = self.require_selection(out) {
            self.execute(Command::MutateSurvivor { survivor }, out);
        }
    }

    /// Repairs the core.
    pub fn repair_core(&mut self, out: &mut Vec<Event>) {
        self.execute(Command::RepairCore, out);
    }

    /// Offers raid zones for the selected survivor and remembers the pending
    /// choice when the offer succeeds.
    pub fn initiate_raid_dispatch(&mut self, out: &mut Vec<Event>) {
        let Some(survivor) = self.require_selection(out) else {
            return;
        };
        let start = out.len();
        self.execute(Command::OfferRaidZones { survivor }, out);
        let offered = out[start..].iter().any(|event| {
            matches!(
                event,
                Event::DialogRequested {
                    dialog: Dialog::ZoneChoice { .. }
                }
            )
        });
        if offered {
            self.selection.zone_choice_for = Some(survivor);
        }
    }

    /// Dispatches the survivor awaiting a zone choice. The pending choice is
    /// cleared whatever the outcome.
    pub fn confirm_raid_zone(&mut self, zone: ZoneId, out: &mut Vec<Event>) {
        let Some(survivor) = self.selection.zone_choice_for.take() else {
            self.refuse(
                ActionError::NoZoneSelectionPending,
                "No raid is awaiting a zone.".to_owned(),
                out,
            );
            return;
        };
        let start = out.len();
        self.execute(Command::DispatchRaid { survivor, zone }, out);
        let dispatched = out[start..]
            .iter()
            .any(|event| matches!(event, Event::RaidStarted { .. }));
        if dispatched && self.selection.survivor == Some(survivor) {
            self.selection.survivor = None;
        }
    }

    /// Abandons a pending zone choice.
    pub fn cancel_raid_zone_selection(&mut self) {
        if let Some(survivor) = self.selection.zone_choice_for.take() {
            debug!(survivor = survivor.get(), "zone selection cancelled");
        }
    }

    /// Resolves a paused raid's encounter.
    pub fn resolve_encounter(
        &mut self,
        survivor: SurvivorId,
        choice: EncounterChoice,
        out: &mut Vec<Event>,
    ) {
        self.execute(Command::ResolveEncounter { survivor, choice }, out);
    }

    fn is_game_over(&self) -> bool {
        query::is_game_over(&self.world)
    }

    fn require_selection(&mut self, out: &mut Vec<Event>) -> Option<SurvivorId> {
        if self.selection.survivor.is_none() {
            self.refuse(
                ActionError::NoSurvivorSelected,
                "No survivor selected.".to_owned(),
                out,
            );
        }
        self.selection.survivor
    }

    fn refuse(&mut self, reason: ActionError, message: String, out: &mut Vec<Event>) {
        out.push(Event::LogLine {
            message,
            tone: LogTone::Warning,
        });
        out.push(Event::Cue { cue: Cue::Error });
        out.push(Event::ActionRejected { reason });
    }

    fn run_movement(&mut self, out: &mut Vec<Event>) {
        let enemies = query::enemy_view(&self.world);
        let core = query::core_cell(&self.world);
        let world = &self.world;
        let mut commands = Vec::new();
        self.movement.handle(
            &enemies,
            core,
            |cell| query::is_cell_blocked(world, cell),
            &mut commands,
        );
        self.execute_all(commands, out);
    }

    fn run_turrets(&mut self, out: &mut Vec<Event>) {
        let buildings = query::building_view(&self.world);
        let enemies = query::enemy_view(&self.world);
        self.targeting.handle(&buildings, &enemies, &mut self.targets);
        let commands: Vec<Command> = self
            .targets
            .iter()
            .map(|target| Command::FireTurret {
                turret: target.turret,
                enemy: target.enemy,
            })
            .collect();
        self.execute_all(commands, out);
    }

    fn execute_all(&mut self, commands: Vec<Command>, out: &mut Vec<Event>) {
        for command in commands {
            if self.is_game_over() {
                break;
            }
            self.execute(command, out);
        }
    }

    fn execute(&mut self, command: Command, out: &mut Vec<Event>) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.record(events, out);
    }

    fn record(&mut self, events: Vec<Event>, out: &mut Vec<Event>) {
        for event in &events {
            if let Event::GameOver { wave } = event {
                info!(wave, "simulation halted");
            }
        }
        self.refresh |= events.iter().any(changes_state);
        out.extend(events);
    }
}

fn changes_state(event: &Event) -> bool {
    !matches!(
        event,
        Event::TimeAdvanced { .. }
            | Event::LogLine { .. }
            | Event::Cue { .. }
            | Event::DialogRequested { .. }
            | Event::ActionRejected { .. }
            | Event::PlacementRejected { .. }
    )
}
