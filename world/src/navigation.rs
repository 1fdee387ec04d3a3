//! Occupancy grid and breadth-first pathfinding towards the core.

use std::collections::VecDeque;

use tracing::error;
use visceral_reclaimer_core::{BuildingId, CellCoord};

/// Dense building occupancy grid stored in row-major order.
///
/// The core occupies its own cell like any other building, but the cell stays
/// traversable so enemies can path onto it.
#[derive(Clone, Debug)]
pub(crate) struct OccupancyGrid {
    columns: u32,
    rows: u32,
    core: CellCoord,
    cells: Vec<Option<BuildingId>>,
}

impl OccupancyGrid {
    pub(crate) fn new(columns: u32, rows: u32, core: CellCoord) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            core,
            cells: vec![None; capacity],
        }
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub(crate) fn core(&self) -> CellCoord {
        self.core
    }

    pub(crate) fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<BuildingId> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    pub(crate) fn occupy(&mut self, cell: CellCoord, building: BuildingId) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = Some(building);
            }
        }
    }

    pub(crate) fn vacate(&mut self, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = None;
            }
        }
    }

    /// Reports whether an occupied, non-core cell stands in the way.
    pub(crate) fn is_blocked(&self, cell: CellCoord) -> bool {
        cell != self.core && self.occupant(cell).is_some()
    }

    fn is_traversable(&self, cell: CellCoord, extra_block: Option<CellCoord>) -> bool {
        if !self.in_bounds(cell) {
            return false;
        }
        if cell == self.core {
            return true;
        }
        Some(cell) != extra_block && self.occupant(cell).is_none()
    }

    /// Shortest 4-connected path from `start` to `target`, excluding `start`.
    pub(crate) fn find_path(&self, start: CellCoord, target: CellCoord) -> Option<Vec<CellCoord>> {
        self.search(start, target, None)
    }

    pub(crate) fn is_target_reachable(&self, start: CellCoord, target: CellCoord) -> bool {
        self.is_reachable_with(start, target, None)
    }

    /// Reachability test that treats `extra_block` as occupied, used to test a
    /// placement before committing it.
    pub(crate) fn is_reachable_with(
        &self,
        start: CellCoord,
        target: CellCoord,
        extra_block: Option<CellCoord>,
    ) -> bool {
        if start == target && self.in_bounds(start) {
            return true;
        }
        self.search(start, target, extra_block).is_some()
    }

    fn search(
        &self,
        start: CellCoord,
        target: CellCoord,
        extra_block: Option<CellCoord>,
    ) -> Option<Vec<CellCoord>> {
        if !self.is_traversable(start, extra_block) || !self.is_traversable(target, extra_block) {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let start_index = self.index(start)?;
        let mut predecessors: Vec<Option<usize>> = vec![None; self.cells.len()];
        let mut visited = vec![false; self.cells.len()];
        visited[start_index] = true;

        let ceiling = self.cells.len().saturating_mul(2);
        let mut iterations = 0usize;
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(cell) = queue.pop_front() {
            iterations += 1;
            if iterations > ceiling {
                error!(
                    ?start,
                    ?target,
                    iterations,
                    "pathfinding exceeded its iteration ceiling"
                );
                return None;
            }

            if cell == target {
                return Some(self.reconstruct(&predecessors, start, target, width));
            }

            let Some(current_index) = self.index(cell) else {
                continue;
            };

            for neighbor in neighbors(cell, self.columns, self.rows) {
                if !self.is_traversable(neighbor, extra_block) {
                    continue;
                }
                let Some(neighbor_index) = self.index(neighbor) else {
                    continue;
                };
                if visited[neighbor_index] {
                    continue;
                }
                visited[neighbor_index] = true;
                predecessors[neighbor_index] = Some(current_index);
                queue.push_back(neighbor);
            }
        }

        None
    }

    fn reconstruct(
        &self,
        predecessors: &[Option<usize>],
        start: CellCoord,
        target: CellCoord,
        width: usize,
    ) -> Vec<CellCoord> {
        let mut path = Vec::new();
        let mut cursor = target;
        while cursor != start {
            path.push(cursor);
            let Some(previous) = self
                .index(cursor)
                .and_then(|index| predecessors.get(index).copied().flatten())
            else {
                break;
            };
            cursor = cell_at(previous, width);
        }
        path.reverse();
        path
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.in_bounds(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

fn cell_at(index: usize, width: usize) -> CellCoord {
    let column = u32::try_from(index % width).unwrap_or(u32::MAX);
    let row = u32::try_from(index / width).unwrap_or(u32::MAX);
    CellCoord::new(column, row)
}

/// Neighbours in north, east, south, west order, which breaks ties between
/// equal-length paths.
fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(columns: u32, rows: u32) -> OccupancyGrid {
        OccupancyGrid::new(columns, rows, CellCoord::new(0, 0))
    }

    fn wall(grid: &mut OccupancyGrid, cells: &[(u32, u32)]) {
        for (index, (column, row)) in cells.iter().enumerate() {
            grid.occupy(CellCoord::new(*column, *row), BuildingId::new(index as u32 + 1));
        }
    }

    #[test]
    fn open_grid_paths_have_manhattan_length() {
        let grid = grid(6, 5);
        let start = CellCoord::new(5, 4);
        let target = CellCoord::new(1, 2);

        let path = grid.find_path(start, target).expect("path on open grid");

        assert_eq!(path.len() as u32, start.manhattan_distance(target));
        assert_eq!(path.last(), Some(&target));
        assert!(!path.contains(&start));
    }

    #[test]
    fn steps_are_adjacent() {
        let grid = grid(4, 4);
        let start = CellCoord::new(3, 3);
        let path = grid.find_path(start, CellCoord::new(0, 0)).expect("path");

        let mut previous = start;
        for cell in path {
            assert_eq!(previous.manhattan_distance(cell), 1);
            previous = cell;
        }
    }

    #[test]
    fn ties_prefer_north_before_east() {
        let grid = grid(3, 3);
        let path = grid
            .find_path(CellCoord::new(0, 2), CellCoord::new(1, 1))
            .expect("path");
        assert_eq!(path, vec![CellCoord::new(0, 1), CellCoord::new(1, 1)]);
    }

    #[test]
    fn single_opening_forces_route_through_it() {
        let mut grid = grid(5, 5);
        wall(&mut grid, &[(2, 0), (2, 1), (2, 3), (2, 4)]);

        let path = grid
            .find_path(CellCoord::new(4, 2), CellCoord::new(0, 2))
            .expect("route through the gap");

        assert!(path.contains(&CellCoord::new(2, 2)));
    }

    #[test]
    fn sealed_target_is_unreachable() {
        let mut grid = grid(5, 5);
        wall(&mut grid, &[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)]);

        assert_eq!(grid.find_path(CellCoord::new(4, 2), CellCoord::new(0, 2)), None);
        assert!(!grid.is_target_reachable(CellCoord::new(4, 2), CellCoord::new(0, 2)));
    }

    #[test]
    fn occupied_start_has_no_path() {
        let mut grid = grid(3, 3);
        wall(&mut grid, &[(2, 2)]);
        assert_eq!(grid.find_path(CellCoord::new(2, 2), CellCoord::new(1, 1)), None);
    }

    #[test]
    fn core_cell_is_traversable_while_occupied() {
        let mut grid = OccupancyGrid::new(3, 1, CellCoord::new(0, 0));
        grid.occupy(CellCoord::new(0, 0), BuildingId::new(0));

        let path = grid
            .find_path(CellCoord::new(2, 0), CellCoord::new(0, 0))
            .expect("core is a valid destination");
        assert_eq!(path, vec![CellCoord::new(1, 0), CellCoord::new(0, 0)]);
        assert!(!grid.is_blocked(CellCoord::new(0, 0)));
    }

    #[test]
    fn reachability_is_trivial_for_identical_cells() {
        let grid = grid(2, 2);
        let cell = CellCoord::new(1, 1);
        assert!(grid.is_target_reachable(cell, cell));
        assert!(!grid.is_target_reachable(CellCoord::new(9, 9), CellCoord::new(9, 9)));
    }

    #[test]
    fn hypothetical_block_does_not_mutate_the_grid() {
        let grid = OccupancyGrid::new(3, 1, CellCoord::new(0, 0));
        let start = CellCoord::new(2, 0);
        let target = CellCoord::new(0, 0);

        assert!(!grid.is_reachable_with(start, target, Some(CellCoord::new(1, 0))));
        assert!(grid.is_target_reachable(start, target));
    }

    #[test]
    fn out_of_bounds_endpoints_have_no_path() {
        let grid = grid(3, 3);
        assert_eq!(grid.find_path(CellCoord::new(3, 0), CellCoord::new(0, 0)), None);
        assert_eq!(grid.find_path(CellCoord::new(0, 0), CellCoord::new(0, 3)), None);
    }
}
