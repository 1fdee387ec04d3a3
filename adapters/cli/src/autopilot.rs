use visceral_reclaimer_core::{
    BuildingKind, CellCoord, EncounterChoice, Event, ResourceKind, SurvivorStatus,
};
use visceral_reclaimer_simulation::Simulation;
use visceral_reclaimer_world::query;

/// Turret offsets from the core, leaving the tile directly east open.
const TURRET_OFFSETS: [(i64, i64); 2] = [(2, -1), (2, 1)];
const PRODUCER_CELL: (u32, u32) = (0, 0);

/// Scripted player that builds an opening defence, keeps the core repaired
/// and sends idle survivors on raids.
#[derive(Debug, Default)]
pub(crate) struct Autopilot {
    opened: bool,
}

impl Autopilot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Takes whatever actions the current state calls for.
    pub(crate) fn act(&mut self, simulation: &mut Simulation, out: &mut Vec<Event>) {
        if !self.opened {
            self.opened = true;
            open_defence(simulation, out);
        }

        resolve_encounters(simulation, out);
        maintain_core(simulation, out);
        dispatch_idle(simulation, out);
    }
}

fn open_defence(simulation: &mut Simulation, out: &mut Vec<Event>) {
    let core = query::core_cell(simulation.world());
    let (columns, rows) = query::grid_dimensions(simulation.world());

    for (dx, dy) in TURRET_OFFSETS {
        let column = i64::from(core.column()) + dx;
        let row = i64::from(core.row()) + dy;
        let in_bounds =
            (0..i64::from(columns)).contains(&column) && (0..i64::from(rows)).contains(&row);
        if !in_bounds {
            continue;
        }
        if let (Ok(column), Ok(row)) = (u32::try_from(column), u32::try_from(row)) {
            simulation.place_building(
                BuildingKind::new("TURRET"),
                CellCoord::new(column, row),
                out,
            );
        }
    }

    simulation.select_build_kind(Some(BuildingKind::new("BIO_VAT")));
    simulation.click_tile(CellCoord::new(PRODUCER_CELL.0, PRODUCER_CELL.1), out);
}

fn resolve_encounters(simulation: &mut Simulation, out: &mut Vec<Event>) {
    let paused: Vec<_> = query::survivors(simulation.world())
        .into_iter()
        .filter(|survivor| survivor.status == SurvivorStatus::Paused)
        .map(|survivor| survivor.id)
        .collect();
    for survivor in paused {
        simulation.resolve_encounter(survivor, EncounterChoice::Continue, out);
    }
}

fn maintain_core(simulation: &mut Simulation, out: &mut Vec<Event>) {
    let world = simulation.world();
    let Some((hp, max_hp)) = query::core_integrity(world) else {
        return;
    };
    let cost = query::config(world).actions.repair_cost;
    let biomass = query::resources(world).get(ResourceKind::Biomass);
    if hp < max_hp && biomass >= cost {
        simulation.repair_core(out);
    }
}

fn dispatch_idle(simulation: &mut Simulation, out: &mut Vec<Event>) {
    let world = simulation.world();
    let Some(zone) = query::config(world).raid_zones.keys().next().cloned() else {
        return;
    };
    let Some(idle) = query::survivors(world)
        .into_iter()
        .find(|survivor| survivor.status == SurvivorStatus::Idle)
    else {
        return;
    };

    simulation.select_survivor(idle.id, out);
    simulation.initiate_raid_dispatch(out);
    if simulation.pending_zone_choice().is_some() {
        simulation.confirm_raid_zone(zone, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use visceral_reclaimer_config::GameConfig;

    #[test]
    fn opening_places_turrets_and_dispatches_a_raider() {
        let config = GameConfig::builtin().expect("builtin config");
        let mut simulation = Simulation::new(Arc::new(config), 3).expect("simulation");
        let mut autopilot = Autopilot::new();
        let mut events = Vec::new();

        autopilot.act(&mut simulation, &mut events);

        let placed = events
            .iter()
            .filter(|event| matches!(event, Event::BuildingPlaced { .. }))
            .count();
        assert_eq!(placed, 3);
        let raiding = query::survivors(simulation.world())
            .iter()
            .filter(|survivor| survivor.status == SurvivorStatus::Raiding)
            .count();
        assert_eq!(raiding, 1);
    }
}
