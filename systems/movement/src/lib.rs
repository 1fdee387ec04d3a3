#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that decides, per enemy, whether to strike
//! the core, re-plan its path or advance one cell.

use visceral_reclaimer_core::{CellCoord, Command, EnemySnapshot, EnemyView};

/// Pure system that inspects enemy snapshots and emits movement commands.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Emits commands for every enemy in identifier order.
    ///
    /// `is_cell_blocked` reports tiles occupied by anything other than the
    /// core.
    pub fn handle<F>(
        &mut self,
        enemies: &EnemyView,
        core: CellCoord,
        is_cell_blocked: F,
        out: &mut Vec<Command>,
    )
    where
        F: Fn(CellCoord) -> bool,
    {
        for enemy in enemies.iter() {
            decide(enemy, core, &is_cell_blocked, out);
        }
    }
}

fn decide<F>(enemy: &EnemySnapshot, core: CellCoord, is_cell_blocked: &F, out: &mut Vec<Command>)
where
    F: Fn(CellCoord) -> bool,
{
    let id = enemy.id;
    if enemy.position == core.to_point() {
        out.push(Command::StrikeCore { enemy: id });
        return;
    }

    let needs_replan = match enemy.next_hop {
        None => true,
        Some(next) => next != core && is_cell_blocked(next),
    };
    if needs_replan {
        out.push(Command::ReplanEnemyPath { enemy: id });
    }
    out.push(Command::StepEnemy { enemy: id });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use visceral_reclaimer_core::{CellPoint, EnemyId, EnemyKind};

    fn enemy(id: u32, position: CellPoint, next_hop: Option<CellCoord>) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            kind: EnemyKind::new("SCRAPPER"),
            position,
            previous: position,
            last_moved_at: Duration::ZERO,
            hp: 10.0,
            max_hp: 10.0,
            speed: 1.0,
            damage: 10.0,
            next_hop,
            remaining_path: usize::from(next_hop.is_some()),
        }
    }

    #[test]
    fn enemy_on_core_strikes_instead_of_moving() {
        let core = CellCoord::new(2, 7);
        let view = EnemyView::from_snapshots(vec![enemy(0, core.to_point(), None)]);
        let mut commands = Vec::new();

        Movement.handle(&view, core, |_| false, &mut commands);

        assert_eq!(
            commands,
            vec![Command::StrikeCore {
                enemy: EnemyId::new(0)
            }]
        );
    }

    #[test]
    fn empty_path_replans_before_stepping() {
        let core = CellCoord::new(2, 7);
        let view = EnemyView::from_snapshots(vec![enemy(4, CellPoint::new(20.0, 3.0), None)]);
        let mut commands = Vec::new();

        Movement.handle(&view, core, |_| false, &mut commands);

        assert_eq!(
            commands,
            vec![
                Command::ReplanEnemyPath {
                    enemy: EnemyId::new(4)
                },
                Command::StepEnemy {
                    enemy: EnemyId::new(4)
                },
            ]
        );
    }

    #[test]
    fn core_as_next_hop_is_never_treated_as_blocked() {
        let core = CellCoord::new(2, 7);
        let view = EnemyView::from_snapshots(vec![enemy(1, CellPoint::new(3.0, 7.0), Some(core))]);
        let mut commands = Vec::new();

        Movement.handle(&view, core, |_| true, &mut commands);

        assert_eq!(
            commands,
            vec![Command::StepEnemy {
                enemy: EnemyId::new(1)
            }]
        );
    }
}
