//! Survivor roster: healing, mutation and passive recovery.

use rand::{seq::SliceRandom, Rng};
use tracing::debug;
use visceral_reclaimer_config::MutationDef;
use visceral_reclaimer_core::{
    ActionError, Cost, Cue, Event, LogTone, MutationId, ResourceKind, SurvivorId,
    SurvivorSnapshot, SurvivorStatus,
};

use crate::{push_cue, push_log, raids::RaidState, reject, World};

/// Floor applied to maximum health after a mutation rescales it.
const MIN_MAX_HP: f64 = 10.0;

#[derive(Clone, Debug)]
pub(crate) struct Survivor {
    pub(crate) id: SurvivorId,
    pub(crate) name: String,
    pub(crate) hp: f64,
    pub(crate) max_hp: f64,
    pub(crate) status: SurvivorStatus,
    pub(crate) mutations: Vec<MutationId>,
    pub(crate) raid: Option<RaidState>,
}

impl Survivor {
    pub(crate) fn new(id: SurvivorId, name: String, max_hp: f64) -> Self {
        Self {
            id,
            name,
            hp: max_hp,
            max_hp,
            status: SurvivorStatus::Idle,
            mutations: Vec::new(),
            raid: None,
        }
    }

    /// Status a survivor returns to at base.
    pub(crate) fn settled_status(&self) -> SurvivorStatus {
        if self.mutations.is_empty() {
            SurvivorStatus::Idle
        } else {
            SurvivorStatus::Mutated
        }
    }

    /// Clears the injured status once health is full. Returns whether the
    /// survivor recovered.
    pub(crate) fn recover_if_healed(&mut self) -> bool {
        if self.status == SurvivorStatus::Injured && self.hp >= self.max_hp {
            self.status = self.settled_status();
            return true;
        }
        false
    }

    /// Appends the mutation and rescales maximum health.
    pub(crate) fn acquire_mutation(&mut self, def: &MutationDef) {
        self.mutations.push(def.id.clone());
        self.max_hp = (self.max_hp * def.max_hp_multiplier).floor().max(MIN_MAX_HP);
        self.hp = self.hp.min(self.max_hp);
        self.status = SurvivorStatus::Mutated;
    }

    /// Mutations from the table this survivor does not carry yet.
    pub(crate) fn unowned_mutations<'a>(&self, table: &'a [MutationDef]) -> Vec<&'a MutationDef> {
        table
            .iter()
            .filter(|def| !self.mutations.contains(&def.id))
            .collect()
    }

    pub(crate) fn snapshot(&self, now: std::time::Duration) -> SurvivorSnapshot {
        SurvivorSnapshot {
            id: self.id,
            name: self.name.clone(),
            hp: self.hp,
            max_hp: self.max_hp,
            status: self.status,
            mutations: self.mutations.clone(),
            raid: self.raid.as_ref().map(|raid| raid.snapshot(now)),
        }
    }
}

/// Health lost on a failed mutation attempt.
pub(crate) fn mutation_failure_loss(max_hp: f64, fraction: f64) -> f64 {
    (max_hp * fraction).floor().max(1.0)
}

/// Picks a mutation uniformly from the candidates.
pub(crate) fn choose_mutation<'a, R: Rng>(
    candidates: &[&'a MutationDef],
    rng: &mut R,
) -> Option<&'a MutationDef> {
    candidates.choose(rng).copied()
}

impl World {
    pub(crate) fn survivor_index(&self, survivor: SurvivorId) -> Option<usize> {
        self.survivors.iter().position(|entry| entry.id == survivor)
    }

    pub(crate) fn heal_survivor(&mut self, survivor: SurvivorId, out: &mut Vec<Event>) {
        let actions = self.config.actions;
        let Some(index) = self.survivor_index(survivor) else {
            reject(out, ActionError::UnknownSurvivor, "Heal failed: unknown survivor.");
            return;
        };
        let entry = &self.survivors[index];
        if entry.hp >= entry.max_hp {
            reject(
                out,
                ActionError::AlreadyAtFullHealth,
                format!("{} is already at full health.", entry.name),
            );
            return;
        }
        if !entry.status.can_be_healed() {
            reject(
                out,
                ActionError::InvalidStatus {
                    status: entry.status,
                },
                format!("Cannot heal {} while {}.", entry.name, entry.status),
            );
            return;
        }
        let cost = Cost::single(ResourceKind::Biomass, actions.heal_cost);
        if !self.ledger.can_afford(&cost) {
            reject(
                out,
                ActionError::Unaffordable,
                format!("Healing needs {cost}."),
            );
            return;
        }
        self.ledger.spend(&cost);

        let entry = &mut self.survivors[index];
        let before = entry.hp;
        entry.hp = (entry.hp + actions.heal_amount).min(entry.max_hp);
        let restored = entry.hp - before;
        let recovered = entry.recover_if_healed();

        push_log(
            out,
            LogTone::Success,
            format!(
                "Healed {} for {restored:.0} HP ({:.0}/{:.0}).",
                entry.name, entry.hp, entry.max_hp
            ),
        );
        if recovered {
            push_log(
                out,
                LogTone::Success,
                format!("{} has recovered from their injuries.", entry.name),
            );
        }
        push_cue(out, Cue::Heal);
        out.push(Event::SurvivorChanged { survivor });
        self.push_resources(out);
    }

    pub(crate) fn mutate_survivor(&mut self, survivor: SurvivorId, out: &mut Vec<Event>) {
        let actions = self.config.actions;
        let Some(index) = self.survivor_index(survivor) else {
            reject(out, ActionError::UnknownSurvivor, "Mutation failed: unknown survivor.");
            return;
        };
        let entry = &self.survivors[index];
        if !entry.status.can_mutate() {
            reject(
                out,
                ActionError::InvalidStatus {
                    status: entry.status,
                },
                format!("Cannot mutate {} while {}.", entry.name, entry.status),
            );
            return;
        }
        let cost = Cost::single(ResourceKind::Biomass, actions.mutate_cost);
        if !self.ledger.can_afford(&cost) {
            reject(
                out,
                ActionError::Unaffordable,
                format!("Mutation needs {cost}."),
            );
            return;
        }
        self.ledger.spend(&cost);

        let config = std::sync::Arc::clone(&self.config);
        let entry = &mut self.survivors[index];
        let available = entry.unowned_mutations(&config.mutations);
        let succeeded =
            !available.is_empty() && self.rng.gen::<f64>() < actions.mutate_success_chance;

        if succeeded {
            if let Some(def) = choose_mutation(&available, &mut self.rng) {
                entry.acquire_mutation(def);
                debug!(survivor = survivor.get(), mutation = %def.id, "mutation acquired");
                push_log(
                    out,
                    LogTone::Success,
                    format!(
                        "Mutation successful! {} gained {} (max HP now {:.0}).",
                        entry.name, def.name, entry.max_hp
                    ),
                );
            }
        } else if available.is_empty() {
            push_log(
                out,
                LogTone::Warning,
                format!(
                    "{} already carries every known mutation. The biomass is wasted.",
                    entry.name
                ),
            );
        } else {
            let loss = mutation_failure_loss(entry.max_hp, actions.mutate_failure_hp_fraction);
            entry.hp = (entry.hp - loss).max(1.0);
            push_log(
                out,
                LogTone::Danger,
                format!(
                    "Mutation rejected! {} lost {loss:.0} HP ({:.0}/{:.0}).",
                    entry.name, entry.hp, entry.max_hp
                ),
            );
        }

        push_cue(out, Cue::Mutate);
        out.push(Event::SurvivorChanged { survivor });
        self.push_resources(out);
    }

    /// Regeneration and recovery for `dt` seconds. Returns whether any
    /// survivor changed.
    pub(crate) fn update_survivor_passives(&mut self, dt: f64, out: &mut Vec<Event>) -> bool {
        let mut changed = false;

        for entry in self.survivors.iter_mut() {
            if entry.status == SurvivorStatus::Dead {
                continue;
            }

            let regen: f64 = entry
                .mutations
                .iter()
                .filter_map(|id| self.config.mutation(id))
                .map(|def| def.regen_per_second)
                .sum();
            let mut touched = false;
            if regen > 0.0 && entry.hp < entry.max_hp {
                entry.hp = (entry.hp + regen * dt).min(entry.max_hp);
                touched = true;
            }
            if entry.recover_if_healed() {
                push_log(
                    out,
                    LogTone::Success,
                    format!("{} has fully recovered.", entry.name),
                );
                touched = true;
            }
            if touched {
                out.push(Event::SurvivorChanged { survivor: entry.id });
                changed = true;
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn mutation(id: &str, multiplier: f64) -> MutationDef {
        MutationDef {
            id: MutationId::new(id),
            name: id.to_owned(),
            max_hp_multiplier: multiplier,
            regen_per_second: 0.0,
        }
    }

    #[test]
    fn thick_hide_raises_max_hp_without_healing() {
        let mut survivor = Survivor::new(SurvivorId::new(0), "Vex".into(), 100.0);
        survivor.hp = 60.0;

        survivor.acquire_mutation(&mutation("MUT_THICK_HIDE", 1.2));

        assert_eq!(survivor.max_hp, 120.0);
        assert_eq!(survivor.hp, 60.0);
        assert_eq!(survivor.status, SurvivorStatus::Mutated);
    }

    #[test]
    fn shrinking_mutation_clamps_health() {
        let mut survivor = Survivor::new(SurvivorId::new(0), "Vex".into(), 100.0);

        survivor.acquire_mutation(&mutation("MUT_REGEN", 0.85));

        assert_eq!(survivor.max_hp, 85.0);
        assert_eq!(survivor.hp, 85.0);
    }

    #[test]
    fn max_hp_never_drops_below_floor() {
        let mut survivor = Survivor::new(SurvivorId::new(0), "Vex".into(), 11.0);
        survivor.acquire_mutation(&mutation("MUT_SPEED", 0.5));
        assert_eq!(survivor.max_hp, MIN_MAX_HP);
    }

    #[test]
    fn failure_loss_is_at_least_one() {
        assert_eq!(mutation_failure_loss(100.0, 0.05), 5.0);
        assert_eq!(mutation_failure_loss(12.0, 0.05), 1.0);
    }

    #[test]
    fn injured_survivor_recovers_to_mutated_when_mutations_remain() {
        let mut survivor = Survivor::new(SurvivorId::new(0), "Vex".into(), 100.0);
        survivor.mutations.push(MutationId::new("MUT_SPEED"));
        survivor.status = SurvivorStatus::Injured;

        assert!(survivor.recover_if_healed());
        assert_eq!(survivor.status, SurvivorStatus::Mutated);
    }

    #[test]
    fn unowned_mutations_skip_acquired_ones() {
        let table = vec![mutation("A", 1.0), mutation("B", 1.0)];
        let mut survivor = Survivor::new(SurvivorId::new(0), "Vex".into(), 100.0);
        survivor.mutations.push(MutationId::new("A"));

        let available = survivor.unowned_mutations(&table);
        let mut rng = StepRng::new(0, 0);
        let chosen = choose_mutation(&available, &mut rng).expect("one candidate");

        assert_eq!(chosen.id, MutationId::new("B"));
    }
}
