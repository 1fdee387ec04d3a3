#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Static game data for Visceral Reclaimer.
//!
//! The configuration is loaded once at startup, validated, and then shared
//! immutably with the world and systems. A built-in data set is embedded in
//! the binary; alternatives may be loaded from JSON files.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::warn;
use visceral_reclaimer_core::{
    BuildingCategory, BuildingKind, CellCoord, Cost, EnemyKind, InjurySeverity, MutationId,
    RaidOutcomeKind, ResourceKind, Resources, ZoneId,
};

/// Game data shipped with the binary.
pub const BUILTIN_GAME_DATA: &str = include_str!("data/game_data.json");

const OUTCOME_CHANCE_TOLERANCE: f64 = 1e-6;
/// Longest raid a zone may define: one simulated day.
pub const MAX_RAID_DURATION_SECS: f64 = 86_400.0;

/// Errors raised while loading or validating game data. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("failed to parse game data: {0}")]
    Parse(#[from] serde_json::Error),
    /// The game data file could not be read.
    #[error("failed to read game data from {path:?}: {source}")]
    ReadFailed {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The grid has no cells.
    #[error("grid must have at least one column and one row")]
    EmptyGrid,
    /// The core coordinate lies outside the grid.
    #[error("core coordinate {core} lies outside the {width}x{height} grid")]
    CoreOutOfBounds {
        /// Configured core coordinate.
        core: CellCoord,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },
    /// No building type has the core category.
    #[error("no building type is categorised as the core")]
    MissingCoreBuilding,
    /// A wave unlock references an enemy type that is not defined.
    #[error("wave unlock references unknown enemy type {enemy}")]
    UnknownUnlockEnemy {
        /// Offending enemy type.
        enemy: EnemyKind,
    },
    /// No survivor templates are defined.
    #[error("at least one survivor must be defined")]
    NoSurvivors,
    /// A raid zone's duration range is negative, inverted or longer than
    /// [`MAX_RAID_DURATION_SECS`].
    #[error("raid zone {zone} has an invalid duration range")]
    InvalidDuration {
        /// Offending zone.
        zone: ZoneId,
    },
    /// A mutation identifier appears more than once.
    #[error("mutation {mutation} is defined more than once")]
    DuplicateMutation {
        /// Offending mutation.
        mutation: MutationId,
    },
    /// A cadence interval is zero.
    #[error("timing interval {name} must be greater than zero")]
    ZeroInterval {
        /// Name of the offending interval.
        name: &'static str,
    },
}

/// Complete, validated game configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct GameConfig {
    /// Grid dimensions.
    pub grid: GridConfig,
    /// Cell the core occupies.
    pub core: CellCoord,
    /// Cadence intervals.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Ledger contents at the start of a run.
    #[serde(default = "default_starting_resources")]
    pub starting_resources: Resources,
    /// Costs and effects of player actions.
    #[serde(default)]
    pub actions: ActionConfig,
    /// Wave sizing and enemy unlocks.
    #[serde(default)]
    pub waves: WaveConfig,
    /// Building types by key.
    pub buildings: BTreeMap<BuildingKind, BuildingDef>,
    /// Enemy types by key.
    pub enemies: BTreeMap<EnemyKind, EnemyDef>,
    /// Survivors present at the start of a run.
    pub survivors: Vec<SurvivorTemplate>,
    /// Raid zones by key.
    #[serde(default)]
    pub raid_zones: BTreeMap<ZoneId, RaidZoneDef>,
    /// Weighted raid outcome table.
    #[serde(default)]
    pub raid_outcomes: Vec<RaidOutcomeDef>,
    /// Mutations a survivor can acquire.
    #[serde(default)]
    pub mutations: Vec<MutationDef>,
}

impl GameConfig {
    /// Parses and validates the built-in game data.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_GAME_DATA)
    }

    /// Parses and validates game data from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates game data from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Building type categorised as the core.
    #[must_use]
    pub fn core_building(&self) -> Option<(&BuildingKind, &BuildingDef)> {
        self.buildings
            .iter()
            .find(|(_, def)| def.category == BuildingCategory::Core)
    }

    /// Point enemies path from when checking whether a placement seals the core.
    #[must_use]
    pub fn reachability_origin(&self) -> CellCoord {
        CellCoord::new(self.grid.width.saturating_sub(1), self.grid.height / 2)
    }

    /// Mutation definition for the provided identifier.
    #[must_use]
    pub fn mutation(&self, id: &MutationId) -> Option<&MutationDef> {
        self.mutations.iter().find(|mutation| &mutation.id == id)
    }

    /// Validates cross-references and ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(ConfigError::EmptyGrid);
        }

        if self.core.column() >= self.grid.width || self.core.row() >= self.grid.height {
            return Err(ConfigError::CoreOutOfBounds {
                core: self.core,
                width: self.grid.width,
                height: self.grid.height,
            });
        }

        if self.core_building().is_none() {
            return Err(ConfigError::MissingCoreBuilding);
        }

        for (name, interval) in self.timing.intervals() {
            if interval.is_zero() {
                return Err(ConfigError::ZeroInterval { name });
            }
        }

        for unlock in &self.waves.unlocks {
            if !self.enemies.contains_key(&unlock.enemy) {
                return Err(ConfigError::UnknownUnlockEnemy {
                    enemy: unlock.enemy.clone(),
                });
            }
        }
        if self.waves.unlocks.is_empty() {
            warn!("no enemy unlocks configured; waves will be empty");
        }

        if self.survivors.is_empty() {
            return Err(ConfigError::NoSurvivors);
        }

        for (zone, def) in &self.raid_zones {
            let [min, max] = def.duration_secs;
            if !(min >= 0.0 && max >= min && max <= MAX_RAID_DURATION_SECS) {
                return Err(ConfigError::InvalidDuration { zone: zone.clone() });
            }
        }

        let mut seen = BTreeSet::new();
        for mutation in &self.mutations {
            if !seen.insert(&mutation.id) {
                return Err(ConfigError::DuplicateMutation {
                    mutation: mutation.id.clone(),
                });
            }
        }

        let total_chance: f64 = self.raid_outcomes.iter().map(|outcome| outcome.chance).sum();
        if (total_chance - 1.0).abs() > OUTCOME_CHANCE_TOLERANCE {
            warn!(
                total_chance,
                "raid outcome chances do not sum to one; draws past the total fall back to nothing"
            );
        }

        Ok(())
    }
}

/// Grid dimensions in cells.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

/// Cadence intervals expressed in milliseconds.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Interval between economy steps.
    pub economy_interval_ms: u64,
    /// Interval between enemy movement steps.
    pub enemy_move_interval_ms: u64,
    /// Interval between turret volleys.
    pub turret_fire_interval_ms: u64,
    /// Interval between raid polls.
    pub raid_poll_interval_ms: u64,
    /// Base interval between encounter rolls within a raid.
    pub encounter_check_interval_ms: u64,
    /// Delay before an unanswered encounter resolves itself.
    pub encounter_auto_resolve_ms: u64,
}

impl TimingConfig {
    /// Interval between economy steps.
    #[must_use]
    pub fn economy_interval(&self) -> Duration {
        Duration::from_millis(self.economy_interval_ms)
    }

    /// Interval between enemy movement steps.
    #[must_use]
    pub fn enemy_move_interval(&self) -> Duration {
        Duration::from_millis(self.enemy_move_interval_ms)
    }

    /// Interval between turret volleys.
    #[must_use]
    pub fn turret_fire_interval(&self) -> Duration {
        Duration::from_millis(self.turret_fire_interval_ms)
    }

    /// Interval between raid polls.
    #[must_use]
    pub fn raid_poll_interval(&self) -> Duration {
        Duration::from_millis(self.raid_poll_interval_ms)
    }

    /// Base interval between encounter rolls within a raid.
    #[must_use]
    pub fn encounter_check_interval(&self) -> Duration {
        Duration::from_millis(self.encounter_check_interval_ms)
    }

    /// Delay before an unanswered encounter resolves itself.
    #[must_use]
    pub fn encounter_auto_resolve(&self) -> Duration {
        Duration::from_millis(self.encounter_auto_resolve_ms)
    }

    fn intervals(&self) -> [(&'static str, Duration); 6] {
        [
            ("economy_interval_ms", self.economy_interval()),
            ("enemy_move_interval_ms", self.enemy_move_interval()),
            ("turret_fire_interval_ms", self.turret_fire_interval()),
            ("raid_poll_interval_ms", self.raid_poll_interval()),
            ("encounter_check_interval_ms", self.encounter_check_interval()),
            ("encounter_auto_resolve_ms", self.encounter_auto_resolve()),
        ]
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            economy_interval_ms: 1000,
            enemy_move_interval_ms: 500,
            turret_fire_interval_ms: 300,
            raid_poll_interval_ms: 5000,
            encounter_check_interval_ms: 15_000,
            encounter_auto_resolve_ms: 4000,
        }
    }
}

fn default_starting_resources() -> Resources {
    Resources {
        scrap: 100.0,
        biomass: 50.0,
        tech: 0.0,
    }
}

/// Costs and effects of the player's biomass actions.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Biomass spent per heal.
    pub heal_cost: f64,
    /// Hit points restored per heal.
    pub heal_amount: f64,
    /// Biomass spent per mutation attempt.
    pub mutate_cost: f64,
    /// Probability that a mutation attempt succeeds.
    pub mutate_success_chance: f64,
    /// Fraction of maximum health lost on a failed mutation.
    pub mutate_failure_hp_fraction: f64,
    /// Biomass spent per core repair.
    pub repair_cost: f64,
    /// Hit points restored per core repair.
    pub repair_amount: f64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            heal_cost: 10.0,
            heal_amount: 25.0,
            mutate_cost: 30.0,
            mutate_success_chance: 0.8,
            mutate_failure_hp_fraction: 0.05,
            repair_cost: 20.0,
            repair_amount: 50.0,
        }
    }
}

/// Wave sizing and enemy unlock thresholds.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Seconds between waves.
    pub interval_secs: u64,
    /// Enemies in every wave before scaling.
    pub base_enemies: u32,
    /// Additional enemies per wave number.
    pub enemy_increment: f64,
    /// Delay between consecutive spawns within a wave.
    pub spawn_delay_ms: u64,
    /// Enemy types and the first wave they may appear in.
    pub unlocks: Vec<EnemyUnlock>,
}

impl WaveConfig {
    /// Time between waves.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Delay between consecutive spawns within a wave.
    #[must_use]
    pub fn spawn_delay(&self) -> Duration {
        Duration::from_millis(self.spawn_delay_ms)
    }

    /// Number of enemies in the provided wave.
    #[must_use]
    pub fn enemy_count(&self, wave: u32) -> u32 {
        let scaled = (f64::from(wave) * self.enemy_increment).floor();
        let extra = if scaled.is_finite() && scaled > 0.0 {
            scaled as u32
        } else {
            0
        };
        self.base_enemies.saturating_add(extra)
    }

    /// Enemy types eligible to spawn in the provided wave, in configuration order.
    #[must_use]
    pub fn eligible_enemies(&self, wave: u32) -> Vec<EnemyKind> {
        self.unlocks
            .iter()
            .filter(|unlock| unlock.wave <= wave)
            .map(|unlock| unlock.enemy.clone())
            .collect()
    }
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            base_enemies: 2,
            enemy_increment: 1.5,
            spawn_delay_ms: 250,
            unlocks: Vec::new(),
        }
    }
}

/// Enemy type unlocked from a given wave onwards.
#[derive(Clone, Debug, Deserialize)]
pub struct EnemyUnlock {
    /// Enemy type.
    pub enemy: EnemyKind,
    /// First wave the type may appear in.
    pub wave: u32,
}

/// Static stats of a building type.
#[derive(Clone, Debug, Deserialize)]
pub struct BuildingDef {
    /// Display name.
    pub name: String,
    /// Role of the building.
    pub category: BuildingCategory,
    /// Maximum hit points.
    pub hp: f64,
    /// Construction cost.
    #[serde(default, deserialize_with = "cost_map")]
    pub cost: Cost,
    /// Upkeep per second.
    #[serde(default, deserialize_with = "cost_map")]
    pub upkeep: Cost,
    /// Production per second.
    #[serde(default, deserialize_with = "cost_map")]
    pub production: Cost,
    /// Firing range in cells.
    #[serde(default)]
    pub range: f32,
    /// Damage per shot.
    #[serde(default)]
    pub damage: f64,
}

/// Static stats of an enemy type.
#[derive(Clone, Debug, Deserialize)]
pub struct EnemyDef {
    /// Display name.
    pub name: String,
    /// Maximum hit points.
    pub hp: f64,
    /// Movement speed used for interpolation.
    pub speed: f64,
    /// Damage dealt to the core on arrival.
    pub damage: f64,
    /// Resources granted on death. Empty means a small random scrap drop.
    #[serde(default, deserialize_with = "cost_map")]
    pub drops: Cost,
}

/// Survivor present at the start of a run.
#[derive(Clone, Debug, Deserialize)]
pub struct SurvivorTemplate {
    /// Survivor's name.
    pub name: String,
    /// Maximum hit points.
    pub max_hp: f64,
}

/// Static description of a raid zone.
#[derive(Clone, Debug, Deserialize)]
pub struct RaidZoneDef {
    /// Display name.
    pub name: String,
    /// Flavour description.
    #[serde(default)]
    pub description: String,
    /// Raid duration range in seconds, `[min, max]`.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: [f64; 2],
    /// Probability that an encounter roll succeeds.
    #[serde(default = "default_encounter_chance")]
    pub encounter_chance: f64,
    /// Loot multipliers per resource. Missing resources use a multiplier of one.
    #[serde(default, deserialize_with = "resource_map")]
    pub loot_modifiers: BTreeMap<ResourceKind, f64>,
}

impl RaidZoneDef {
    /// Loot multiplier applied to the provided resource.
    #[must_use]
    pub fn loot_modifier(&self, resource: ResourceKind) -> f64 {
        self.loot_modifiers.get(&resource).copied().unwrap_or(1.0)
    }
}

fn default_duration_secs() -> [f64; 2] {
    [30.0, 60.0]
}

fn default_encounter_chance() -> f64 {
    0.1
}

/// Entry of the weighted raid outcome table.
#[derive(Clone, Debug, Deserialize)]
pub struct RaidOutcomeDef {
    /// Outcome category.
    pub kind: RaidOutcomeKind,
    /// Probability of the entry.
    pub chance: f64,
    /// Narrative shown in the raid report.
    pub message: String,
    /// Injury severity; only meaningful for injuries.
    #[serde(default)]
    pub severity: InjurySeverity,
    /// Loot rolls; only meaningful for loot outcomes.
    #[serde(default)]
    pub items: Vec<LootItem>,
}

/// Inclusive loot roll for a single resource.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct LootItem {
    /// Resource granted.
    pub resource: ResourceKind,
    /// Minimum amount before zone modifiers.
    pub min: f64,
    /// Maximum amount before zone modifiers.
    pub max: f64,
}

/// Mutation a survivor can acquire.
#[derive(Clone, Debug, Deserialize)]
pub struct MutationDef {
    /// Identifier.
    pub id: MutationId,
    /// Display name.
    pub name: String,
    /// Multiplier applied to maximum health when acquired.
    #[serde(default = "default_multiplier")]
    pub max_hp_multiplier: f64,
    /// Health regenerated per second while below maximum.
    #[serde(default)]
    pub regen_per_second: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

fn resource_map<'de, D>(deserializer: D) -> Result<BTreeMap<ResourceKind, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, amount)| match ResourceKind::from_name(&name) {
            Some(kind) => Some((kind, amount)),
            None => {
                warn!(resource = %name, "ignoring unknown resource in game data");
                None
            }
        })
        .collect())
}

fn cost_map<'de, D>(deserializer: D) -> Result<Cost, D::Error>
where
    D: Deserializer<'de>,
{
    resource_map(deserializer).map(|amounts| amounts.into_iter().collect())
}
