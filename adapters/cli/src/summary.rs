use serde::Serialize;
use visceral_reclaimer_core::ResourceKind;
use visceral_reclaimer_simulation::Simulation;
use visceral_reclaimer_world::query;

/// End-of-run snapshot printed as JSON.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct RunSummary {
    pub(crate) seed: u64,
    pub(crate) elapsed_secs: f64,
    pub(crate) wave: u32,
    pub(crate) game_over: bool,
    pub(crate) core_hp: Option<f64>,
    pub(crate) resources: ResourceTotals,
    pub(crate) buildings: usize,
    pub(crate) enemies: usize,
    pub(crate) survivors: Vec<SurvivorLine>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct ResourceTotals {
    pub(crate) scrap: f64,
    pub(crate) biomass: f64,
    pub(crate) tech: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct SurvivorLine {
    pub(crate) name: String,
    pub(crate) status: &'static str,
    pub(crate) hp: f64,
    pub(crate) mutations: usize,
}

impl RunSummary {
    pub(crate) fn capture(simulation: &Simulation, seed: u64) -> Self {
        let world = simulation.world();
        let resources = query::resources(world);

        Self {
            seed,
            elapsed_secs: query::clock(world).as_secs_f64(),
            wave: query::wave(world),
            game_over: query::is_game_over(world),
            core_hp: query::core_integrity(world).map(|(hp, _)| hp),
            resources: ResourceTotals {
                scrap: resources.get(ResourceKind::Scrap),
                biomass: resources.get(ResourceKind::Biomass),
                tech: resources.get(ResourceKind::Tech),
            },
            buildings: query::building_view(world).iter().count(),
            enemies: query::enemy_count(world),
            survivors: query::survivors(world)
                .into_iter()
                .map(|survivor| SurvivorLine {
                    name: survivor.name,
                    status: survivor.status.label(),
                    hp: survivor.hp,
                    mutations: survivor.mutations.len(),
                })
                .collect(),
        }
    }

    pub(crate) fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use visceral_reclaimer_config::GameConfig;

    #[test]
    fn fresh_run_reports_starting_state() {
        let config = GameConfig::builtin().expect("builtin config");
        let simulation = Simulation::new(Arc::new(config), 8).expect("simulation");

        let summary = RunSummary::capture(&simulation, 8);

        assert_eq!(summary.wave, 0);
        assert!(!summary.game_over);
        assert_eq!(summary.core_hp, Some(500.0));
        assert_eq!(summary.resources.scrap, 100.0);
        assert_eq!(summary.buildings, 1);
        assert_eq!(summary.survivors.len(), 3);

        let json = summary.to_json().expect("serializable");
        assert!(json.contains("\"seed\": 8"));
    }
}
