#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Visceral Reclaimer engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems and
//! the presentation layer to react to. Systems consume event streams, query
//! immutable snapshots, and respond exclusively with new command batches.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests construction of a building on the provided cell.
    PlaceBuilding {
        /// Configured building type to construct.
        kind: BuildingKind,
        /// Cell the building should occupy.
        cell: CellCoord,
    },
    /// Requests deconstruction of an existing building. No refund is granted.
    RemoveBuilding {
        /// Identifier of the building to remove.
        building: BuildingId,
    },
    /// Requests a narrative description of the provided tile.
    InspectTile {
        /// Cell the player selected.
        cell: CellCoord,
    },
    /// Runs one economy step: building upkeep, production and survivor passives.
    RunEconomy {
        /// Duration covered by the economy step.
        dt: Duration,
    },
    /// Spends biomass to restore core integrity.
    RepairCore,
    /// Spends biomass to restore a survivor's health.
    HealSurvivor {
        /// Survivor receiving treatment.
        survivor: SurvivorId,
    },
    /// Spends biomass on an attempt to grant a survivor a new mutation.
    MutateSurvivor {
        /// Survivor undergoing the procedure.
        survivor: SurvivorId,
    },
    /// Requests the list of raid zones for an idle survivor.
    OfferRaidZones {
        /// Survivor the zones are offered to.
        survivor: SurvivorId,
    },
    /// Sends an idle survivor on a raid into the provided zone.
    DispatchRaid {
        /// Survivor leaving the base.
        survivor: SurvivorId,
        /// Zone the survivor travels to.
        zone: ZoneId,
    },
    /// Advances every active raid: progress, encounter checks and completion.
    PollRaids,
    /// Resolves the pending encounter of a paused raid.
    ResolveEncounter {
        /// Survivor whose raid is paused.
        survivor: SurvivorId,
        /// Choice applied to the encounter.
        choice: EncounterChoice,
    },
    /// Records that a new enemy wave began.
    BeginWave {
        /// Sequence number of the wave, starting at one.
        wave: u32,
        /// Number of enemies the wave will contain.
        enemies: u32,
    },
    /// Spawns an enemy on the right edge of the grid.
    SpawnEnemy {
        /// Configured enemy type to spawn.
        kind: EnemyKind,
        /// Grid row the enemy enters on.
        row: u32,
    },
    /// Recomputes an enemy's path towards the core.
    ReplanEnemyPath {
        /// Enemy requiring a new path.
        enemy: EnemyId,
    },
    /// Advances an enemy onto the head of its queued path.
    StepEnemy {
        /// Enemy taking the step.
        enemy: EnemyId,
    },
    /// Applies an enemy's damage to the core and removes the enemy.
    StrikeCore {
        /// Enemy standing on the core tile.
        enemy: EnemyId,
    },
    /// Applies a turret's damage to the selected enemy.
    FireTurret {
        /// Turret discharging.
        turret: BuildingId,
        /// Enemy receiving the damage.
        enemy: EnemyId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a building was constructed.
    BuildingPlaced {
        /// Identifier assigned to the building by the world.
        building: BuildingId,
        /// Type of building that was constructed.
        kind: BuildingKind,
        /// Cell occupied by the building.
        cell: CellCoord,
    },
    /// Confirms that a building was deconstructed.
    BuildingRemoved {
        /// Identifier of the removed building.
        building: BuildingId,
        /// Cell the building previously occupied.
        cell: CellCoord,
    },
    /// Reports that a placement request was rejected without side effects.
    PlacementRejected {
        /// Building type requested for placement.
        kind: BuildingKind,
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Announces that a building with upkeep powered up or down.
    BuildingActivationChanged {
        /// Building whose state changed.
        building: BuildingId,
        /// Whether the building is now operational.
        active: bool,
    },
    /// Publishes the latest resource totals.
    ResourcesChanged {
        /// Resource totals after the change.
        resources: Resources,
    },
    /// Reports that the core absorbed damage.
    CoreDamaged {
        /// Damage dealt to the core.
        amount: f64,
        /// Core hit points after the hit.
        hp: f64,
        /// Maximum core hit points.
        max_hp: f64,
    },
    /// Reports that the core was repaired.
    CoreRepaired {
        /// Hit points actually restored.
        amount: f64,
        /// Core hit points after the repair.
        hp: f64,
        /// Maximum core hit points.
        max_hp: f64,
    },
    /// Indicates that a survivor's health, status or mutations changed.
    SurvivorChanged {
        /// Survivor whose state changed.
        survivor: SurvivorId,
    },
    /// Confirms that a survivor left on a raid.
    RaidStarted {
        /// Survivor who departed.
        survivor: SurvivorId,
        /// Zone being raided.
        zone: ZoneId,
        /// Active duration of the raid.
        duration: Duration,
    },
    /// Announces that a raid paused on an encounter.
    EncounterStarted {
        /// Survivor whose raid paused.
        survivor: SurvivorId,
        /// Description of the encounter.
        encounter: Encounter,
    },
    /// Announces that a paused raid resumed.
    EncounterResolved {
        /// Survivor whose raid resumed.
        survivor: SurvivorId,
        /// Choice that resolved the encounter.
        choice: EncounterChoice,
    },
    /// Publishes the report of a finished raid.
    RaidCompleted {
        /// Summary of the raid.
        report: RaidReport,
    },
    /// Announces the start of an enemy wave.
    WaveStarted {
        /// Sequence number of the wave.
        wave: u32,
        /// Number of enemies in the wave.
        enemies: u32,
    },
    /// Confirms that an enemy entered the field.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Configured enemy type.
        kind: EnemyKind,
        /// Spawn position, possibly outside the grid.
        position: CellPoint,
    },
    /// Confirms that an enemy advanced one step.
    EnemyMoved {
        /// Enemy that moved.
        enemy: EnemyId,
        /// Position before the step.
        from: CellPoint,
        /// Position after the step.
        to: CellPoint,
    },
    /// Reports that an enemy took damage.
    EnemyDamaged {
        /// Enemy that was hit.
        enemy: EnemyId,
        /// Damage dealt.
        amount: f64,
        /// Remaining hit points.
        hp: f64,
    },
    /// Confirms that an enemy left the simulation, by death or by reaching the core.
    EnemyRemoved {
        /// Enemy that was removed.
        enemy: EnemyId,
    },
    /// Reports that a turret fired at an enemy.
    TurretFired {
        /// Turret that fired.
        turret: BuildingId,
        /// Enemy that was targeted.
        enemy: EnemyId,
        /// Centre of the turret cell.
        from: CellPoint,
        /// Centre of the enemy.
        to: CellPoint,
    },
    /// Reports that a player action was rejected without side effects.
    ActionRejected {
        /// Specific reason the action failed.
        reason: ActionError,
    },
    /// Narrative line for the player-facing log.
    LogLine {
        /// Rendered message.
        message: String,
        /// Presentation tone of the message.
        tone: LogTone,
    },
    /// Requests that the presentation layer show a dialog.
    DialogRequested {
        /// Dialog to display.
        dialog: Dialog,
    },
    /// Requests an audio or visual effect cue.
    Cue {
        /// Effect to play.
        cue: Cue,
    },
    /// Announces that the core fell and the simulation halted.
    GameOver {
        /// Last wave that started before the core fell.
        wave: u32,
    },
}

/// Unique identifier assigned to a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(u32);

impl BuildingId {
    /// Creates a new building identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a survivor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurvivorId(u32);

impl SurvivorId {
    /// Creates a new survivor identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

macro_rules! data_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a key from its configured name.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Configured name of the key.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

data_key!(
    /// Configured building type, such as `TURRET` or `WALL`.
    BuildingKind
);
data_key!(
    /// Configured enemy type, such as `SCRAPPER`.
    EnemyKind
);
data_key!(
    /// Configured raid zone.
    ZoneId
);
data_key!(
    /// Configured mutation, such as `MUT_THICK_HIDE`.
    MutationId
);

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Logical position of the cell's upper-left corner.
    #[must_use]
    pub fn to_point(self) -> CellPoint {
        CellPoint::new(self.column as f32, self.row as f32)
    }

    /// Position of the cell's centre.
    #[must_use]
    pub fn center(self) -> CellPoint {
        CellPoint::new(self.column as f32 + 0.5, self.row as f32 + 0.5)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Fractional position measured in cell units.
///
/// Enemies hold a point rather than a cell because they spawn one column past
/// the right edge of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CellPoint {
    column: f32,
    row: f32,
}

impl CellPoint {
    /// Creates a new point from column and row components.
    #[must_use]
    pub const fn new(column: f32, row: f32) -> Self {
        Self { column, row }
    }

    /// Horizontal component measured in cells.
    #[must_use]
    pub const fn column(&self) -> f32 {
        self.column
    }

    /// Vertical component measured in cells.
    #[must_use]
    pub const fn row(&self) -> f32 {
        self.row
    }

    /// Point shifted to the centre of the cell it anchors.
    #[must_use]
    pub fn center(self) -> CellPoint {
        CellPoint::new(self.column + 0.5, self.row + 0.5)
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: CellPoint) -> f32 {
        let dx = self.column - other.column;
        let dy = self.row - other.row;
        dx * dx + dy * dy
    }

    /// Floors the point and clamps it into a grid of the provided dimensions.
    ///
    /// Returns `None` when the grid has no cells.
    #[must_use]
    pub fn clamped_cell(self, columns: u32, rows: u32) -> Option<CellCoord> {
        if columns == 0 || rows == 0 {
            return None;
        }
        let column = clamp_axis(self.column, columns);
        let row = clamp_axis(self.row, rows);
        Some(CellCoord::new(column, row))
    }
}

fn clamp_axis(value: f32, extent: u32) -> u32 {
    let floored = value.floor();
    if floored.is_nan() || floored <= 0.0 {
        return 0;
    }
    let last = extent - 1;
    if floored >= last as f32 {
        last
    } else {
        floored as u32
    }
}

/// Resources tracked by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Salvaged metal, the construction currency.
    Scrap,
    /// Organic matter spent on upkeep, healing and mutation.
    Biomass,
    /// Rare salvage recovered from raids.
    Tech,
}

impl ResourceKind {
    /// Every resource in ledger order.
    pub const ALL: [ResourceKind; 3] = [Self::Scrap, Self::Biomass, Self::Tech];

    /// Resolves a configured resource name. Matching ignores ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(name))
    }

    /// Lowercase configuration key of the resource.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Scrap => "scrap",
            Self::Biomass => "biomass",
            Self::Tech => "tech",
        }
    }

    /// Player-facing name of the resource.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scrap => "Scrap",
            Self::Biomass => "Biomass",
            Self::Tech => "Tech",
        }
    }
}

/// Amounts of each resource required by an action or produced per second.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cost {
    amounts: BTreeMap<ResourceKind, f64>,
}

impl Cost {
    /// Creates an empty cost that is always affordable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cost consisting of a single resource.
    #[must_use]
    pub fn single(kind: ResourceKind, amount: f64) -> Self {
        Self::new().with(kind, amount)
    }

    /// Adds an amount for the provided resource, replacing any previous value.
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, amount: f64) -> Self {
        let _ = self.amounts.insert(kind, amount);
        self
    }

    /// Amount required for the provided resource.
    #[must_use]
    pub fn amount(&self, kind: ResourceKind) -> f64 {
        self.amounts.get(&kind).copied().unwrap_or(0.0)
    }

    /// Iterator over the resources in ledger order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        self.amounts.iter().map(|(kind, amount)| (*kind, *amount))
    }

    /// Reports whether the cost names no resource with a positive amount.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.amounts.values().all(|amount| *amount <= 0.0)
    }

    /// Cost multiplied by a scalar, used to turn per-second rates into tick amounts.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            amounts: self
                .amounts
                .iter()
                .map(|(kind, amount)| (*kind, amount * factor))
                .collect(),
        }
    }
}

impl FromIterator<(ResourceKind, f64)> for Cost {
    fn from_iter<T: IntoIterator<Item = (ResourceKind, f64)>>(iter: T) -> Self {
        Self {
            amounts: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.amounts.is_empty() {
            return f.write_str("free");
        }
        for (index, (kind, amount)) in self.amounts.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{amount} {}", kind.label())?;
        }
        Ok(())
    }
}

/// Snapshot of the resource ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    /// Scrap on hand.
    pub scrap: f64,
    /// Biomass on hand.
    pub biomass: f64,
    /// Tech on hand.
    pub tech: f64,
}

impl Resources {
    /// Amount held for the provided resource.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Scrap => self.scrap,
            ResourceKind::Biomass => self.biomass,
            ResourceKind::Tech => self.tech,
        }
    }

    /// Mutable access to the amount held for the provided resource.
    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Scrap => &mut self.scrap,
            ResourceKind::Biomass => &mut self.biomass,
            ResourceKind::Tech => &mut self.tech,
        }
    }
}

/// Role a building type plays in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingCategory {
    /// The structure enemies converge on. Exactly one exists.
    Core,
    /// Fires at enemies within range.
    Turret,
    /// Generates resources over time.
    Producer,
    /// Blocks enemy movement.
    Barrier,
}

/// Power state of a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpkeepState {
    /// The building has no upkeep and is always operational.
    NoUpkeep,
    /// The building pays upkeep every economy step.
    Upkept {
        /// Whether the last upkeep payment succeeded.
        active: bool,
    },
}

impl UpkeepState {
    /// Reports whether the building may fire or produce.
    #[must_use]
    pub const fn is_operational(self) -> bool {
        !matches!(self, Self::Upkept { active: false })
    }
}

/// Lifecycle state of a survivor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurvivorStatus {
    /// Available at base.
    Idle,
    /// Away on a raid.
    Raiding,
    /// Away on a raid that is halted by an encounter.
    Paused,
    /// Back at base with wounds that block raiding.
    Injured,
    /// Available at base and carrying at least one mutation.
    Mutated,
    /// Terminal.
    Dead,
}

impl SurvivorStatus {
    /// Player-facing label of the status.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Raiding => "raiding",
            Self::Paused => "paused",
            Self::Injured => "injured",
            Self::Mutated => "mutated",
            Self::Dead => "dead",
        }
    }

    /// Reports whether the survivor may receive a heal.
    #[must_use]
    pub const fn can_be_healed(self) -> bool {
        matches!(self, Self::Idle | Self::Injured | Self::Mutated)
    }

    /// Reports whether the survivor may undergo a mutation attempt.
    #[must_use]
    pub const fn can_mutate(self) -> bool {
        matches!(self, Self::Idle | Self::Mutated)
    }

    /// Reports whether the survivor is away from base.
    #[must_use]
    pub const fn is_away(self) -> bool {
        matches!(self, Self::Raiding | Self::Paused)
    }
}

impl fmt::Display for SurvivorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Categories of raid outcomes listed in the outcome table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaidOutcomeKind {
    /// Resources are recovered.
    Loot,
    /// The survivor returns empty-handed.
    Nothing,
    /// The survivor returns wounded.
    Injury,
    /// The survivor returns changed.
    Mutation,
    /// The survivor does not return.
    Death,
}

/// Severity of a raid injury.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjurySeverity {
    /// Loses 15-35% of maximum health.
    #[default]
    Minor,
    /// Loses 50-80% of maximum health.
    Major,
}

/// Choices available when resolving an encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterChoice {
    /// Press on with the raid.
    Continue,
}

impl EncounterChoice {
    /// Player-facing label of the choice.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Continue => "Continue",
        }
    }
}

/// Description of the encounter a paused raid is waiting on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encounter {
    /// Narrative shown to the player.
    pub message: String,
}

/// Summary produced when a raid completes.
#[derive(Clone, Debug, PartialEq)]
pub struct RaidReport {
    /// Survivor who went on the raid.
    pub survivor: SurvivorId,
    /// Survivor's name.
    pub survivor_name: String,
    /// Zone that was raided.
    pub zone: ZoneId,
    /// Zone's display name.
    pub zone_name: String,
    /// Active raid duration rounded to whole seconds.
    pub duration_secs: u64,
    /// Outcome drawn from the table.
    pub outcome: RaidOutcomeKind,
    /// Outcome message followed by the concrete effects.
    pub summary: String,
    /// Timestamped raid log.
    pub log: Vec<String>,
}

/// Presentation tone of a log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogTone {
    /// Neutral information.
    Info,
    /// Positive result.
    Success,
    /// Rejected or degraded action.
    Warning,
    /// Threat to the base.
    Danger,
    /// Raid narrative.
    Raid,
    /// Resource income.
    Resource,
}

/// Audio or visual effects requested by the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cue {
    /// A building was placed.
    Build,
    /// An action was rejected.
    Error,
    /// A survivor was healed or the core repaired.
    Heal,
    /// A mutation attempt finished.
    Mutate,
    /// A survivor left on a raid.
    RaidStart,
    /// A raid hit an encounter.
    RaidEvent,
    /// A raid ended well.
    RaidSuccess,
    /// A raid ended badly.
    RaidFail,
    /// A wave started.
    WaveAnnounce,
    /// A turret fired.
    TurretFire,
    /// An enemy took damage.
    Hit,
    /// An enemy died.
    EnemyDeath,
    /// The core took damage.
    CoreHit,
    /// A building regained power.
    PowerUp,
    /// A building lost power.
    PowerDown,
    /// The core fell.
    GameOver,
}

/// Dialogs the presentation layer is asked to show.
#[derive(Clone, Debug, PartialEq)]
pub enum Dialog {
    /// Informational message with a single acknowledgement.
    Message {
        /// Dialog title.
        title: String,
        /// Dialog body.
        body: String,
    },
    /// Raid zone picker for a survivor.
    ZoneChoice {
        /// Survivor who will be dispatched.
        survivor: SurvivorId,
        /// Zones available for selection.
        zones: Vec<ZoneOption>,
    },
}

/// Zone entry listed in a [`Dialog::ZoneChoice`].
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneOption {
    /// Zone identifier to confirm with.
    pub zone: ZoneId,
    /// Display name.
    pub name: String,
    /// Flavour description.
    pub description: String,
    /// Shortest possible raid in seconds.
    pub min_duration_secs: f64,
    /// Longest possible raid in seconds.
    pub max_duration_secs: f64,
    /// Loot multipliers applied per resource.
    pub loot_modifiers: Vec<(ResourceKind, f64)>,
}

/// Reasons a building placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// No building type with the requested name is configured.
    #[error("unknown building type")]
    UnknownKind,
    /// The requested cell lies outside the grid.
    #[error("cannot build outside the grid")]
    OutOfBounds,
    /// Another building already occupies the cell.
    #[error("tile is already occupied")]
    Occupied,
    /// The cell belongs to the core.
    #[error("cannot build on the core")]
    CoreTile,
    /// The building would seal every route to the core.
    #[error("placement would block all paths to the core")]
    BlocksCore,
    /// The ledger cannot cover the building's cost.
    #[error("insufficient resources")]
    Unaffordable,
    /// The building could not be created after payment; the cost was refunded.
    #[error("construction failed; resources refunded")]
    InstantiationFailed,
}

/// Reasons a player action may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ActionError {
    /// No survivor with the provided identifier exists.
    #[error("unknown survivor")]
    UnknownSurvivor,
    /// No building with the provided identifier exists.
    #[error("unknown building")]
    UnknownBuilding,
    /// No raid zone with the provided identifier is configured.
    #[error("unknown raid zone")]
    UnknownZone,
    /// No raid zones are configured.
    #[error("no raid zones available")]
    NoRaidZones,
    /// The survivor's status does not allow the action.
    #[error("survivor is {status}")]
    InvalidStatus {
        /// Status that blocked the action.
        status: SurvivorStatus,
    },
    /// The survivor is already at full health.
    #[error("survivor is already at full health")]
    AlreadyAtFullHealth,
    /// The core is already at full integrity.
    #[error("core integrity is already at maximum")]
    CoreAtFullIntegrity,
    /// The core cannot be deconstructed.
    #[error("the core cannot be deconstructed")]
    CoreIsPermanent,
    /// The ledger cannot cover the action's cost.
    #[error("insufficient resources")]
    Unaffordable,
    /// The action requires a selected survivor.
    #[error("no survivor selected")]
    NoSurvivorSelected,
    /// A zone was confirmed without a pending zone selection.
    #[error("no raid zone selection in progress")]
    NoZoneSelectionPending,
    /// The core has fallen and the simulation no longer accepts actions.
    #[error("the core has fallen")]
    GameOver,
}

/// Immutable representation of a single building's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildingSnapshot {
    /// Identifier allocated to the building by the world.
    pub id: BuildingId,
    /// Configured building type.
    pub kind: BuildingKind,
    /// Role of the building type.
    pub category: BuildingCategory,
    /// Cell occupied by the building.
    pub cell: CellCoord,
    /// Current hit points.
    pub hp: f64,
    /// Maximum hit points.
    pub max_hp: f64,
    /// Power state.
    pub upkeep: UpkeepState,
    /// Firing range in cells; zero for non-turrets.
    pub range: f32,
    /// Damage per shot; zero for non-turrets.
    pub damage: f64,
}

/// Read-only snapshot describing all buildings.
#[derive(Clone, Debug, Default)]
pub struct BuildingView {
    snapshots: Vec<BuildingSnapshot>,
}

impl BuildingView {
    /// Creates a new building view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<BuildingSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured building snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &BuildingSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<BuildingSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier allocated to the enemy.
    pub id: EnemyId,
    /// Configured enemy type.
    pub kind: EnemyKind,
    /// Logical position.
    pub position: CellPoint,
    /// Position before the last step, for interpolation.
    pub previous: CellPoint,
    /// Simulation time of the last step or path reset.
    pub last_moved_at: Duration,
    /// Current hit points.
    pub hp: f64,
    /// Maximum hit points.
    pub max_hp: f64,
    /// Movement speed, used by the presentation layer for interpolation.
    pub speed: f64,
    /// Damage dealt to the core on arrival.
    pub damage: f64,
    /// Head of the queued path, if any.
    pub next_hop: Option<CellCoord>,
    /// Number of cells left in the queued path.
    pub remaining_path: usize,
}

/// Read-only snapshot describing all enemies.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of an active raid.
#[derive(Clone, Debug, PartialEq)]
pub struct RaidSnapshot {
    /// Zone being raided.
    pub zone: ZoneId,
    /// Simulation time the raid began.
    pub started_at: Duration,
    /// Simulation time the raid ends, extended by every pause.
    pub ends_at: Duration,
    /// Active duration of the raid.
    pub duration: Duration,
    /// Completion fraction in `[0, 1]`.
    pub progress: f64,
    /// Whether the raid is halted by an encounter.
    pub paused: bool,
    /// Pending encounter, if any.
    pub encounter: Option<Encounter>,
    /// Simulation time of the next encounter roll.
    pub next_encounter_check: Duration,
    /// Timestamped raid log.
    pub log: Vec<String>,
}

/// Immutable representation of a survivor used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct SurvivorSnapshot {
    /// Identifier allocated to the survivor.
    pub id: SurvivorId,
    /// Survivor's name.
    pub name: String,
    /// Current hit points.
    pub hp: f64,
    /// Maximum hit points.
    pub max_hp: f64,
    /// Lifecycle state.
    pub status: SurvivorStatus,
    /// Mutations in acquisition order.
    pub mutations: Vec<MutationId>,
    /// Active raid, if any.
    pub raid: Option<RaidSnapshot>,
}

/// Target selected by the turret targeting system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurretTarget {
    /// Turret that should fire.
    pub turret: BuildingId,
    /// Enemy the turret selected.
    pub enemy: EnemyId,
    /// Squared distance between the turret and enemy centres.
    pub distance_squared: f32,
}
