#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic turret targets from world snapshots.

use visceral_reclaimer_core::{
    BuildingCategory, BuildingId, BuildingView, CellPoint, EnemyId, EnemyView, TurretTarget,
    UpkeepState,
};

/// Slack added to every squared range so enemies exactly on the boundary count.
const RANGE_EPSILON: f32 = 0.01;

/// Turret targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TurretTargeting {
    turret_workspace: Vec<TurretWorkspace>,
    enemy_workspace: Vec<EnemyCandidate>,
}

impl TurretTargeting {
    /// Creates a new turret targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes one firing round for the provided world snapshot.
    ///
    /// Turrets are resolved in identifier order and each selected shot is
    /// charged against the target's predicted health, so a later turret never
    /// picks an enemy an earlier one has already killed. The output buffer is
    /// cleared before populating it.
    pub fn handle(
        &mut self,
        buildings: &BuildingView,
        enemies: &EnemyView,
        out: &mut Vec<TurretTarget>,
    ) {
        out.clear();

        self.prepare_turret_workspace(buildings);
        if self.turret_workspace.is_empty() {
            return;
        }

        self.prepare_enemy_workspace(enemies);
        if self.enemy_workspace.is_empty() {
            return;
        }

        for turret in &self.turret_workspace {
            let max_distance = turret.range * turret.range + RANGE_EPSILON;
            let mut best: Option<BestCandidate> = None;

            for (index, candidate) in self.enemy_workspace.iter().enumerate() {
                if candidate.predicted_hp <= 0.0 {
                    continue;
                }
                let distance_squared = turret.center.distance_squared(candidate.center);
                if distance_squared > max_distance {
                    continue;
                }

                let current = BestCandidate {
                    index,
                    enemy: candidate.id,
                    distance_squared,
                };
                match &mut best {
                    Some(existing) => {
                        if current.precedes(existing) {
                            *existing = current;
                        }
                    }
                    None => best = Some(current),
                }
            }

            if let Some(best_candidate) = best {
                self.enemy_workspace[best_candidate.index].predicted_hp -= turret.damage;
                out.push(TurretTarget {
                    turret: turret.id,
                    enemy: best_candidate.enemy,
                    distance_squared: best_candidate.distance_squared,
                });
            }
        }
    }

    fn prepare_turret_workspace(&mut self, buildings: &BuildingView) {
        self.turret_workspace.clear();

        for snapshot in buildings.iter() {
            if snapshot.category != BuildingCategory::Turret {
                continue;
            }
            if snapshot.upkeep == (UpkeepState::Upkept { active: false }) {
                continue;
            }
            if snapshot.range <= 0.0 {
                continue;
            }

            self.turret_workspace.push(TurretWorkspace {
                id: snapshot.id,
                center: snapshot.cell.center(),
                range: snapshot.range,
                damage: snapshot.damage,
            });
        }
    }

    fn prepare_enemy_workspace(&mut self, enemies: &EnemyView) {
        self.enemy_workspace.clear();
        let (lower, _) = enemies.iter().size_hint();
        self.enemy_workspace.reserve(lower);

        for snapshot in enemies.iter() {
            if snapshot.hp <= 0.0 {
                continue;
            }
            self.enemy_workspace.push(EnemyCandidate {
                id: snapshot.id,
                center: snapshot.position.center(),
                predicted_hp: snapshot.hp,
            });
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TurretWorkspace {
    id: BuildingId,
    center: CellPoint,
    range: f32,
    damage: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct EnemyCandidate {
    id: EnemyId,
    center: CellPoint,
    predicted_hp: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    index: usize,
    enemy: EnemyId,
    distance_squared: f32,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_squared != other.distance_squared {
            return self.distance_squared < other.distance_squared;
        }

        self.enemy < other.enemy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use visceral_reclaimer_core::{
        BuildingKind, BuildingSnapshot, CellCoord, EnemyKind, EnemySnapshot,
    };

    fn turret(id: u32, cell: (u32, u32), upkeep: UpkeepState) -> BuildingSnapshot {
        BuildingSnapshot {
            id: BuildingId::new(id),
            kind: BuildingKind::new("TURRET"),
            category: BuildingCategory::Turret,
            cell: CellCoord::new(cell.0, cell.1),
            hp: 50.0,
            max_hp: 50.0,
            upkeep,
            range: 3.5,
            damage: 4.0,
        }
    }

    fn enemy(id: u32, position: (f32, f32), hp: f64) -> EnemySnapshot {
        let position = CellPoint::new(position.0, position.1);
        EnemySnapshot {
            id: EnemyId::new(id),
            kind: EnemyKind::new("SCRAPPER"),
            position,
            previous: position,
            last_moved_at: Duration::ZERO,
            hp,
            max_hp: hp,
            speed: 1.0,
            damage: 10.0,
            next_hop: None,
            remaining_path: 0,
        }
    }

    fn active() -> UpkeepState {
        UpkeepState::Upkept { active: true }
    }

    #[test]
    fn targets_closest_enemy_within_range() {
        let mut system = TurretTargeting::new();
        let buildings = BuildingView::from_snapshots(vec![turret(1, (5, 5), active())]);
        let enemies = EnemyView::from_snapshots(vec![
            enemy(2, (8.0, 5.0), 10.0),
            enemy(3, (6.0, 5.0), 10.0),
        ]);

        let mut out = Vec::new();
        system.handle(&buildings, &enemies, &mut out);

        assert_eq!(
            out,
            vec![TurretTarget {
                turret: BuildingId::new(1),
                enemy: EnemyId::new(3),
                distance_squared: 1.0,
            }]
        );
    }

    #[test]
    fn enemy_on_range_boundary_is_targeted() {
        let mut system = TurretTargeting::new();
        let buildings = BuildingView::from_snapshots(vec![turret(1, (0, 0), active())]);
        let enemies = EnemyView::from_snapshots(vec![enemy(1, (3.5, 0.0), 10.0)]);

        let mut out = Vec::new();
        system.handle(&buildings, &enemies, &mut out);

        assert_eq!(out.len(), 1);
    }

    #[test]
    fn enemy_outside_range_is_ignored() {
        let mut system = TurretTargeting::new();
        let buildings = BuildingView::from_snapshots(vec![turret(1, (0, 0), active())]);
        let enemies = EnemyView::from_snapshots(vec![enemy(2, (10.0, 10.0), 10.0)]);

        let mut out = Vec::new();
        system.handle(&buildings, &enemies, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn smaller_enemy_id_is_preferred_when_distances_match() {
        let mut system = TurretTargeting::new();
        let buildings = BuildingView::from_snapshots(vec![turret(1, (5, 5), active())]);
        let enemies = EnemyView::from_snapshots(vec![
            enemy(20, (6.0, 5.0), 10.0),
            enemy(10, (4.0, 5.0), 10.0),
        ]);

        let mut out = Vec::new();
        system.handle(&buildings, &enemies, &mut out);

        assert_eq!(out[0].enemy, EnemyId::new(10));
    }

    #[test]
    fn unpowered_turret_does_not_fire() {
        let mut system = TurretTargeting::new();
        let buildings = BuildingView::from_snapshots(vec![turret(
            1,
            (5, 5),
            UpkeepState::Upkept { active: false },
        )]);
        let enemies = EnemyView::from_snapshots(vec![enemy(1, (5.0, 5.0), 10.0)]);

        let mut out = vec![TurretTarget {
            turret: BuildingId::new(9),
            enemy: EnemyId::new(9),
            distance_squared: 0.0,
        }];
        system.handle(&buildings, &enemies, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn later_turret_skips_enemy_killed_earlier_in_the_round() {
        let mut system = TurretTargeting::new();
        let buildings = BuildingView::from_snapshots(vec![
            turret(1, (5, 5), active()),
            turret(2, (5, 6), active()),
        ]);
        let enemies = EnemyView::from_snapshots(vec![
            enemy(1, (5.0, 5.0), 3.0),
            enemy(2, (8.0, 6.0), 10.0),
        ]);

        let mut out = Vec::new();
        system.handle(&buildings, &enemies, &mut out);

        let picks: Vec<_> = out.iter().map(|target| (target.turret, target.enemy)).collect();
        assert_eq!(
            picks,
            vec![
                (BuildingId::new(1), EnemyId::new(1)),
                (BuildingId::new(2), EnemyId::new(2)),
            ]
        );
    }

    #[test]
    fn non_turret_buildings_never_fire() {
        let mut system = TurretTargeting::new();
        let mut wall = turret(1, (5, 5), UpkeepState::NoUpkeep);
        wall.category = BuildingCategory::Barrier;
        let buildings = BuildingView::from_snapshots(vec![wall]);
        let enemies = EnemyView::from_snapshots(vec![enemy(1, (5.0, 5.0), 10.0)]);

        let mut out = Vec::new();
        system.handle(&buildings, &enemies, &mut out);

        assert!(out.is_empty());
    }
}
