//! Building registry, placement rules and the per-tick economy.

use std::collections::BTreeMap;

use tracing::{debug, info};
use visceral_reclaimer_config::BuildingDef;
use visceral_reclaimer_core::{
    ActionError, BuildingId, BuildingKind, CellCoord, Cost, Cue, Event, LogTone, PlacementError,
    ResourceKind, UpkeepState,
};

use crate::{push_cue, push_log, reject, World};

/// Building stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Building {
    pub(crate) id: BuildingId,
    pub(crate) kind: BuildingKind,
    pub(crate) cell: CellCoord,
    pub(crate) hp: f64,
    pub(crate) max_hp: f64,
    pub(crate) upkeep: UpkeepState,
}

/// Registry that stores buildings and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct BuildingRegistry {
    entries: BTreeMap<BuildingId, Building>,
    next_building_id: Option<BuildingId>,
}

impl BuildingRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_building_id: Some(BuildingId::new(0)),
        }
    }

    /// Creates a building from its definition. Returns `None` once the
    /// identifier space is exhausted.
    pub(crate) fn instantiate(
        &mut self,
        kind: BuildingKind,
        def: &BuildingDef,
        cell: CellCoord,
    ) -> Option<BuildingId> {
        let id = self.next_building_id?;
        self.next_building_id = id.get().checked_add(1).map(BuildingId::new);

        let upkeep = if def.upkeep.is_free() {
            UpkeepState::NoUpkeep
        } else {
            UpkeepState::Upkept { active: true }
        };
        let _ = self.entries.insert(
            id,
            Building {
                id,
                kind,
                cell,
                hp: def.hp,
                max_hp: def.hp,
                upkeep,
            },
        );
        Some(id)
    }

    pub(crate) fn remove(&mut self, id: BuildingId) -> Option<Building> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: BuildingId) -> Option<&Building> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Building> {
        self.entries.values()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Building> {
        self.entries.values_mut()
    }
}

impl World {
    pub(crate) fn place_building(
        &mut self,
        kind: BuildingKind,
        cell: CellCoord,
        out: &mut Vec<Event>,
    ) {
        let def = match self.validate_placement(&kind, cell) {
            Ok(def) => def.clone(),
            Err(reason) => {
                reject_placement(kind, cell, reason, out);
                return;
            }
        };

        self.ledger.spend(&def.cost);
        let Some(building) = self.buildings.instantiate(kind.clone(), &def, cell) else {
            self.ledger.refund(&def.cost);
            reject_placement(kind, cell, PlacementError::InstantiationFailed, out);
            return;
        };
        self.grid.occupy(cell, building);

        info!(building = building.get(), %kind, %cell, "building placed");
        out.push(Event::BuildingPlaced {
            building,
            kind,
            cell,
        });
        push_log(out, LogTone::Success, format!("Built {} at {cell}.", def.name));
        push_cue(out, Cue::Build);
        if !def.cost.is_free() {
            self.push_resources(out);
        }
    }

    /// Runs the placement checks in order without touching grid or ledger.
    fn validate_placement(
        &self,
        kind: &BuildingKind,
        cell: CellCoord,
    ) -> Result<&BuildingDef, PlacementError> {
        let def = self
            .config
            .buildings
            .get(kind)
            .ok_or(PlacementError::UnknownKind)?;
        if !self.grid.in_bounds(cell) {
            return Err(PlacementError::OutOfBounds);
        }
        if self.grid.occupant(cell).is_some() {
            return Err(PlacementError::Occupied);
        }
        if cell == self.grid.core() {
            return Err(PlacementError::CoreTile);
        }
        let origin = self.config.reachability_origin();
        if !self
            .grid
            .is_reachable_with(origin, self.grid.core(), Some(cell))
        {
            return Err(PlacementError::BlocksCore);
        }
        if !self.ledger.can_afford(&def.cost) {
            return Err(PlacementError::Unaffordable);
        }
        Ok(def)
    }

    pub(crate) fn remove_building(&mut self, building: BuildingId, out: &mut Vec<Event>) {
        if building == self.core {
            reject(
                out,
                ActionError::CoreIsPermanent,
                "The core cannot be deconstructed.",
            );
            return;
        }
        let Some(removed) = self.buildings.remove(building) else {
            reject(
                out,
                ActionError::UnknownBuilding,
                format!("No building #{} to deconstruct.", building.get()),
            );
            return;
        };
        self.grid.vacate(removed.cell);

        let name = self.building_name(&removed.kind);
        info!(building = building.get(), cell = %removed.cell, "building removed");
        out.push(Event::BuildingRemoved {
            building,
            cell: removed.cell,
        });
        push_log(out, LogTone::Info, format!("Deconstructed {name}."));
    }

    pub(crate) fn inspect_tile(&self, cell: CellCoord, out: &mut Vec<Event>) {
        if !self.grid.in_bounds(cell) {
            push_log(out, LogTone::Info, format!("Tile {cell} lies outside the grid."));
            return;
        }
        let message = match self
            .grid
            .occupant(cell)
            .and_then(|id| self.buildings.get(id))
        {
            Some(building) => {
                let name = self.building_name(&building.kind);
                let power = match building.upkeep {
                    UpkeepState::NoUpkeep => "",
                    UpkeepState::Upkept { active: true } => ", online",
                    UpkeepState::Upkept { active: false } => ", offline",
                };
                format!(
                    "Tile {cell}: {name} (HP {:.0}/{:.0}{power}).",
                    building.hp, building.max_hp
                )
            }
            None => format!("Tile {cell}: empty."),
        };
        push_log(out, LogTone::Info, message);
    }

    /// Charges upkeep and grants production for `dt` seconds. Returns whether
    /// any building or resource total changed.
    pub(crate) fn update_building_states(&mut self, dt: f64, out: &mut Vec<Event>) -> bool {
        let mut changed = false;

        for building in self.buildings.iter_mut() {
            let Some(def) = self.config.buildings.get(&building.kind) else {
                continue;
            };

            if let UpkeepState::Upkept { active } = building.upkeep {
                let due = def.upkeep.scaled(dt);
                let affordable = self.ledger.can_afford(&due);
                if affordable {
                    self.ledger.spend(&due);
                    changed |= !due.is_free();
                }
                if affordable != active {
                    building.upkeep = UpkeepState::Upkept { active: affordable };
                    changed = true;
                    out.push(Event::BuildingActivationChanged {
                        building: building.id,
                        active: affordable,
                    });
                    if affordable {
                        push_log(out, LogTone::Success, format!("{} reactivated.", def.name));
                        push_cue(out, Cue::PowerUp);
                    } else {
                        push_log(
                            out,
                            LogTone::Warning,
                            format!("{} powered down: upkeep of {} unpaid.", def.name, def.upkeep),
                        );
                        push_cue(out, Cue::PowerDown);
                    }
                }
            }

            if !building.upkeep.is_operational() {
                continue;
            }
            for (resource, rate) in def.production.iter() {
                if rate > 0.0 {
                    self.ledger.grant(resource, rate * dt);
                    changed = true;
                }
            }
        }

        changed
    }

    pub(crate) fn repair_core(&mut self, out: &mut Vec<Event>) {
        let actions = self.config.actions;
        let Some(core) = self.buildings.get(self.core) else {
            debug!("repair requested without a core building");
            return;
        };
        if core.hp >= core.max_hp {
            reject(
                out,
                ActionError::CoreAtFullIntegrity,
                "Core integrity is already at maximum.",
            );
            return;
        }

        let cost = Cost::single(ResourceKind::Biomass, actions.repair_cost);
        if !self.ledger.can_afford(&cost) {
            reject(
                out,
                ActionError::Unaffordable,
                format!("Core repair needs {cost}."),
            );
            return;
        }
        self.ledger.spend(&cost);

        let Some(core) = self.buildings.get_mut(self.core) else {
            return;
        };
        let before = core.hp;
        core.hp = (core.hp + actions.repair_amount).min(core.max_hp);
        let restored = core.hp - before;
        let (hp, max_hp) = (core.hp, core.max_hp);

        out.push(Event::CoreRepaired {
            amount: restored,
            hp,
            max_hp,
        });
        push_log(
            out,
            LogTone::Success,
            format!("Core repaired by {restored:.0} HP ({hp:.0}/{max_hp:.0})."),
        );
        push_cue(out, Cue::Heal);
        self.push_resources(out);
    }

    pub(crate) fn building_name(&self, kind: &BuildingKind) -> String {
        self.config
            .buildings
            .get(kind)
            .map_or_else(|| kind.to_string(), |def| def.name.clone())
    }
}

fn reject_placement(
    kind: BuildingKind,
    cell: CellCoord,
    reason: PlacementError,
    out: &mut Vec<Event>,
) {
    debug!(%kind, %cell, ?reason, "placement rejected");
    push_log(
        out,
        LogTone::Warning,
        format!("Cannot build {kind} at {cell}: {reason}."),
    );
    push_cue(out, Cue::Error);
    out.push(Event::PlacementRejected { kind, cell, reason });
}
