//! Enemy roster, path following and combat resolution.

use std::{collections::BTreeMap, collections::VecDeque, sync::Arc, time::Duration};

use rand::Rng;
use tracing::{debug, info, warn};
use visceral_reclaimer_core::{
    BuildingCategory, BuildingId, CellCoord, CellPoint, Cue, Dialog, EnemyId, EnemyKind,
    EnemySnapshot, Event, LogTone, ResourceKind,
};

use crate::{push_cue, push_log, World};

/// Enemy stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    id: EnemyId,
    kind: EnemyKind,
    position: CellPoint,
    previous: CellPoint,
    last_moved_at: Duration,
    hp: f64,
    max_hp: f64,
    speed: f64,
    damage: f64,
    path: VecDeque<CellCoord>,
}

impl Enemy {
    pub(crate) fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            kind: self.kind.clone(),
            position: self.position,
            previous: self.previous,
            last_moved_at: self.last_moved_at,
            hp: self.hp,
            max_hp: self.max_hp,
            speed: self.speed,
            damage: self.damage,
            next_hop: self.path.front().copied(),
            remaining_path: self.path.len(),
        }
    }
}

/// Registry that stores enemies and allocates sequential identifiers.
#[derive(Debug)]
pub(crate) struct EnemyRoster {
    entries: BTreeMap<EnemyId, Enemy>,
    next_enemy_id: EnemyId,
}

impl EnemyRoster {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_enemy_id: EnemyId::new(0),
        }
    }

    fn allocate(&mut self) -> EnemyId {
        let id = self.next_enemy_id;
        self.next_enemy_id = EnemyId::new(id.get().wrapping_add(1));
        id
    }

    pub(crate) fn get(&self, id: EnemyId) -> Option<&Enemy> {
        self.entries.get(&id)
    }

    fn get_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.entries.get_mut(&id)
    }

    fn remove(&mut self, id: EnemyId) -> Option<Enemy> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Resources granted when an enemy without configured drops dies.
fn fallback_drop<R: Rng>(rng: &mut R) -> Vec<(ResourceKind, f64)> {
    vec![(ResourceKind::Scrap, f64::from(rng.gen_range(1u32..=3)))]
}

impl World {
    pub(crate) fn spawn_enemy(&mut self, kind: EnemyKind, row: u32, out: &mut Vec<Event>) {
        let Some(def) = self.config.enemies.get(&kind) else {
            warn!(%kind, "unknown enemy kind requested");
            return;
        };
        let (columns, rows) = self.grid.dimensions();
        let row = if row >= rows {
            warn!(%kind, row, rows, "spawn row outside the grid; clamping");
            rows.saturating_sub(1)
        } else {
            row
        };

        let id = self.enemies.allocate();
        let position = CellPoint::new(columns as f32, row as f32);
        let enemy = Enemy {
            id,
            kind: kind.clone(),
            position,
            previous: position,
            last_moved_at: self.clock,
            hp: def.hp,
            max_hp: def.hp,
            speed: def.speed,
            damage: def.damage,
            path: VecDeque::new(),
        };
        let name = def.name.clone();
        let _ = self.enemies.entries.insert(id, enemy);

        debug!(enemy = id.get(), %kind, row, "enemy spawned");
        out.push(Event::EnemySpawned {
            enemy: id,
            kind,
            position,
        });

        self.replan_enemy_path(id);
        let stranded = self
            .enemies
            .get(id)
            .is_some_and(|enemy| enemy.path.is_empty());
        if stranded {
            push_log(
                out,
                LogTone::Warning,
                format!(
                    "WARN: Enemy {} ({name}) at [{columns}, {row}] failed initial pathfinding.",
                    id.get()
                ),
            );
        }
    }

    /// Recomputes the path from the enemy's clamped cell to the core.
    pub(crate) fn replan_enemy_path(&mut self, enemy: EnemyId) {
        let (columns, rows) = self.grid.dimensions();
        let core = self.grid.core();
        let now = self.clock;
        let Some(entry) = self.enemies.get_mut(enemy) else {
            debug!(enemy = enemy.get(), "replan requested for missing enemy");
            return;
        };
        let Some(start) = entry.position.clamped_cell(columns, rows) else {
            entry.path.clear();
            return;
        };

        entry.path = self
            .grid
            .find_path(start, core)
            .map(VecDeque::from)
            .unwrap_or_default();
        entry.previous = start.to_point();
        entry.last_moved_at = now;
    }

    /// Moves the enemy onto the head of its path.
    pub(crate) fn step_enemy(&mut self, enemy: EnemyId, out: &mut Vec<Event>) {
        let now = self.clock;
        let Some(entry) = self.enemies.get_mut(enemy) else {
            return;
        };
        let Some(next) = entry.path.pop_front() else {
            return;
        };
        let from = entry.position;
        let to = next.to_point();
        entry.previous = from;
        entry.position = to;
        entry.last_moved_at = now;
        out.push(Event::EnemyMoved { enemy, from, to });
    }

    pub(crate) fn strike_core(&mut self, enemy: EnemyId, out: &mut Vec<Event>) {
        let Some(damage) = self.enemies.get(enemy).map(|entry| entry.damage) else {
            warn!(enemy = enemy.get(), "strike requested for missing enemy");
            return;
        };
        self.damage_core(damage, out);
        self.remove_enemy(enemy, out);
        if self.game_over {
            self.declare_game_over(out);
        }
    }

    pub(crate) fn fire_turret(&mut self, turret: BuildingId, enemy: EnemyId, out: &mut Vec<Event>) {
        let config = Arc::clone(&self.config);
        let Some(building) = self.buildings.get(turret) else {
            debug!(turret = turret.get(), "fire requested for missing turret");
            return;
        };
        let Some(def) = config.buildings.get(&building.kind) else {
            return;
        };
        if def.category != BuildingCategory::Turret || !building.upkeep.is_operational() {
            debug!(turret = turret.get(), "fire requested for inactive turret");
            return;
        }
        let Some(target) = self.enemies.get(enemy).filter(|target| target.hp > 0.0) else {
            return;
        };

        out.push(Event::TurretFired {
            turret,
            enemy,
            from: building.cell.center(),
            to: target.position.center(),
        });
        push_cue(out, Cue::TurretFire);
        self.damage_enemy(enemy, def.damage, out);
    }

    pub(crate) fn damage_enemy(&mut self, enemy: EnemyId, amount: f64, out: &mut Vec<Event>) {
        let Some(entry) = self.enemies.get_mut(enemy) else {
            return;
        };
        if entry.hp <= 0.0 {
            return;
        }
        entry.hp -= amount;
        let hp = entry.hp;
        let kind = entry.kind.clone();
        out.push(Event::EnemyDamaged { enemy, amount, hp });
        push_cue(out, Cue::Hit);
        if hp > 0.0 {
            return;
        }

        let config = Arc::clone(&self.config);
        let def = config.enemies.get(&kind);
        let name = def.map_or("Enemy", |def| def.name.as_str());
        push_log(out, LogTone::Success, format!("{name} destroyed."));

        let drops: Vec<(ResourceKind, f64)> = match def {
            Some(def) if !def.drops.is_free() => def.drops.iter().collect(),
            _ => fallback_drop(&mut self.rng),
        };
        let mut granted = false;
        for (resource, amount) in drops {
            if amount > 0.0 {
                self.ledger.grant(resource, amount);
                push_log(
                    out,
                    LogTone::Resource,
                    format!("+{amount:.0} {}.", resource.label()),
                );
                granted = true;
            }
        }

        push_cue(out, Cue::EnemyDeath);
        self.remove_enemy(enemy, out);
        if granted {
            self.push_resources(out);
        }
    }

    pub(crate) fn remove_enemy(&mut self, enemy: EnemyId, out: &mut Vec<Event>) {
        if self.enemies.remove(enemy).is_none() {
            warn!(enemy = enemy.get(), "attempted to remove a missing enemy");
            return;
        }
        out.push(Event::EnemyRemoved { enemy });
    }

    /// Subtracts core health and latches game over at zero.
    fn damage_core(&mut self, amount: f64, out: &mut Vec<Event>) {
        if self.game_over {
            return;
        }
        let Some(core) = self.buildings.get_mut(self.core) else {
            warn!("core damage requested without a core building");
            push_log(out, LogTone::Danger, "CRITICAL ERROR: Core reference lost!");
            return;
        };
        core.hp -= amount;
        let (hp, max_hp) = (core.hp, core.max_hp);
        let shown = hp.max(0.0);

        out.push(Event::CoreDamaged {
            amount,
            hp: shown,
            max_hp,
        });
        push_log(
            out,
            LogTone::Danger,
            format!("CORE INTEGRITY COMPROMISED! HP: {shown:.0}/{max_hp:.0}"),
        );
        push_cue(out, Cue::CoreHit);
        if hp <= 0.0 {
            self.game_over = true;
        }
    }

    fn declare_game_over(&mut self, out: &mut Vec<Event>) {
        self.timers.clear();
        info!(wave = self.wave, "core destroyed");
        push_log(
            out,
            LogTone::Danger,
            format!("CORE DESTROYED. The base fell during wave {}.", self.wave),
        );
        push_cue(out, Cue::GameOver);
        out.push(Event::DialogRequested {
            dialog: Dialog::Message {
                title: "TRANSMISSION LOST".to_owned(),
                body: format!(
                    "CORE DESTROYED.\n\nThe base held out until wave {}.",
                    self.wave
                ),
            },
        });
        out.push(Event::GameOver { wave: self.wave });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn roster_allocates_sequential_ids() {
        let mut roster = EnemyRoster::new();
        assert_eq!(roster.allocate(), EnemyId::new(0));
        assert_eq!(roster.allocate(), EnemyId::new(1));
        assert_eq!(roster.len(), 0);
    }

    #[test]
    fn fallback_drop_is_scrap_between_one_and_three() {
        let mut rng = StepRng::new(0, 0);
        let drop = fallback_drop(&mut rng);
        assert_eq!(drop, vec![(ResourceKind::Scrap, 1.0)]);
    }
}
