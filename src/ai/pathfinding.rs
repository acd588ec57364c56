//! A* pathfinding on a ground-plane grid
//!
//! The grid covers the world's XZ plane. Paths are returned as world-space
//! waypoints at the height of the goal.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;

type Cell = (usize, usize);

/// Walkability grid over the XZ plane
#[derive(Debug, Clone)]
pub struct NavGrid {
    /// Cells along X
    pub width: usize,
    /// Cells along Z
    pub depth: usize,
    /// Cell size in world units
    pub cell_size: f32,
    /// World XZ of the grid's (0, 0) corner
    pub origin: Vec2,
    /// Walkable cells (true = walkable)
    cells: Vec<bool>,
}

impl NavGrid {
    /// Create a grid with every cell walkable, anchored at the world origin
    #[must_use]
    pub fn new(width: usize, depth: usize, cell_size: f32) -> Self {
        Self {
            width,
            depth,
            cell_size,
            origin: Vec2::ZERO,
            cells: vec![true; width * depth],
        }
    }

    /// Create a grid centered on the world origin
    #[must_use]
    pub fn centered(width: usize, depth: usize, cell_size: f32) -> Self {
        let mut grid = Self::new(width, depth, cell_size);
        grid.origin = -Vec2::new(width as f32, depth as f32) * cell_size * 0.5;
        grid
    }

    /// Set a cell's walkability
    pub fn set_walkable(&mut self, x: usize, z: usize, walkable: bool) {
        if x < self.width && z < self.depth {
            self.cells[z * self.width + x] = walkable;
        }
    }

    /// Check if a cell is walkable
    #[must_use]
    pub fn is_walkable(&self, x: usize, z: usize) -> bool {
        x < self.width && z < self.depth && self.cells[z * self.width + x]
    }

    /// Mark every cell whose center lies inside the box footprint as blocked
    pub fn block_box(&mut self, center: Vec3, half_extents: Vec3) {
        for z in 0..self.depth {
            for x in 0..self.width {
                let c = self.cell_center(x, z);
                if (c.x - center.x).abs() <= half_extents.x && (c.z - center.z).abs() <= half_extents.z
                {
                    self.cells[z * self.width + x] = false;
                }
            }
        }
    }

    /// Cell containing a world position, if inside the grid
    #[must_use]
    pub fn cell_at(&self, pos: Vec3) -> Option<Cell> {
        let local = Vec2::new(pos.x, pos.z) - self.origin;
        let x = (local.x / self.cell_size).floor();
        let z = (local.y / self.cell_size).floor();
        if x < 0.0 || z < 0.0 || x >= self.width as f32 || z >= self.depth as f32 {
            return None;
        }
        Some((x as usize, z as usize))
    }

    /// World position of a cell center (y = 0)
    #[must_use]
    pub fn cell_center(&self, x: usize, z: usize) -> Vec3 {
        let p = self.origin
            + Vec2::new(
                (x as f32 + 0.5) * self.cell_size,
                (z as f32 + 0.5) * self.cell_size,
            );
        Vec3::new(p.x, 0.0, p.y)
    }

    /// Whether the position lies on a walkable cell
    #[must_use]
    pub fn is_walkable_at(&self, pos: Vec3) -> bool {
        self.cell_at(pos)
            .is_some_and(|(x, z)| self.is_walkable(x, z))
    }

    /// Closest walkable point to `point` within `max_distance` (XZ plane).
    ///
    /// A point already on a walkable cell is returned unchanged; otherwise the
    /// nearest walkable cell center is used.
    #[must_use]
    pub fn nearest_walkable(&self, point: Vec3, max_distance: f32) -> Option<Vec3> {
        if self.is_walkable_at(point) {
            return Some(point);
        }

        let flat = |v: Vec3| Vec2::new(v.x, v.z);
        let mut best: Option<(f32, Vec3)> = None;
        for z in 0..self.depth {
            for x in 0..self.width {
                if !self.is_walkable(x, z) {
                    continue;
                }
                let mut center = self.cell_center(x, z);
                center.y = point.y;
                let d = flat(center).distance(flat(point));
                if d <= max_distance && best.is_none_or(|(bd, _)| d < bd) {
                    best = Some((d, center));
                }
            }
        }
        best.map(|(_, p)| p)
    }

    /// Walkable neighbors with their step cost (8-directional, no corner cutting)
    fn neighbors(&self, x: usize, z: usize) -> impl Iterator<Item = (Cell, f32)> + '_ {
        const STEPS: [(i32, i32); 8] = [
            (1, 0),
            (-1, 0),
            (0, 1),
            (0, -1),
            (1, 1),
            (1, -1),
            (-1, 1),
            (-1, -1),
        ];
        STEPS.iter().filter_map(move |&(dx, dz)| {
            let nx = x.checked_add_signed(dx as isize)?;
            let nz = z.checked_add_signed(dz as isize)?;
            if !self.is_walkable(nx, nz) {
                return None;
            }
            if dx != 0 && dz != 0 && !(self.is_walkable(nx, z) && self.is_walkable(x, nz)) {
                return None;
            }
            let cost = if dx != 0 && dz != 0 {
                std::f32::consts::SQRT_2
            } else {
                1.0
            };
            Some(((nx, nz), cost))
        })
    }
}

/// Result of pathfinding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    /// Waypoints in world coordinates, ending at the goal
    pub waypoints: Vec<Vec3>,
    /// Total length from the start position
    pub length: f32,
}

impl Path {
    /// Check if the path has no waypoints
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// A* node for priority queue
#[derive(Debug, Clone, Copy)]
struct Node {
    cell: Cell,
    f_cost: f32, // g_cost + heuristic
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell
    }
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path from `start` to `goal` using A*.
///
/// Returns `None` if either end is off the grid or blocked, or if the goal is
/// unreachable.
#[must_use]
pub fn find_path(grid: &NavGrid, start: Vec3, goal: Vec3) -> Option<Path> {
    let start_cell = grid.cell_at(start)?;
    let goal_cell = grid.cell_at(goal)?;
    if !grid.is_walkable(start_cell.0, start_cell.1) || !grid.is_walkable(goal_cell.0, goal_cell.1)
    {
        return None;
    }

    // Octile distance
    let heuristic = |(x, z): Cell| -> f32 {
        let dx = (x as f32 - goal_cell.0 as f32).abs();
        let dz = (z as f32 - goal_cell.1 as f32).abs();
        dx.max(dz) + (std::f32::consts::SQRT_2 - 1.0) * dx.min(dz)
    };

    let mut open_set = BinaryHeap::new();
    let mut came_from: FxHashMap<Cell, Cell> = FxHashMap::default();
    let mut g_score: FxHashMap<Cell, f32> = FxHashMap::default();

    g_score.insert(start_cell, 0.0);
    open_set.push(Node {
        cell: start_cell,
        f_cost: heuristic(start_cell),
    });

    while let Some(current) = open_set.pop() {
        if current.cell == goal_cell {
            let mut cells = vec![goal_cell];
            let mut curr = goal_cell;
            while let Some(&prev) = came_from.get(&curr) {
                cells.push(prev);
                curr = prev;
            }
            cells.reverse();
            return Some(build_path(grid, &cells, start, goal));
        }

        let current_g = g_score.get(&current.cell).copied().unwrap_or(f32::MAX);
        for (next, cost) in grid.neighbors(current.cell.0, current.cell.1) {
            let tentative_g = current_g + cost;
            if tentative_g < g_score.get(&next).copied().unwrap_or(f32::MAX) {
                came_from.insert(next, current.cell);
                g_score.insert(next, tentative_g);
                open_set.push(Node {
                    cell: next,
                    f_cost: tentative_g + heuristic(next),
                });
            }
        }
    }

    None
}

/// Turn a cell chain into waypoints: interior cell centers, then the exact goal.
fn build_path(grid: &NavGrid, cells: &[Cell], start: Vec3, goal: Vec3) -> Path {
    let interior = cells.len().saturating_sub(1);
    let mut waypoints: Vec<Vec3> = cells[..interior]
        .iter()
        .skip(1)
        .map(|&(x, z)| {
            let mut p = grid.cell_center(x, z);
            p.y = goal.y;
            p
        })
        .collect();
    waypoints.push(goal);

    let mut length = 0.0;
    let mut prev = start;
    for &point in &waypoints {
        length += prev.distance(point);
        prev = point;
    }
    Path { waypoints, length }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_pathfinding_around_wall() {
        let mut grid = NavGrid::new(10, 10, 1.0);
        for z in 2..8 {
            grid.set_walkable(5, z, false);
        }

        let start = Vec3::new(2.5, 0.0, 5.5);
        let goal = Vec3::new(8.5, 0.0, 5.5);
        let path = find_path(&grid, start, goal).unwrap();

        assert!(path.waypoints.len() > 2);
        assert!(path.length > start.distance(goal));
        assert_eq!(path.waypoints.last(), Some(&goal));
    }

    #[test]
    fn test_direct_path() {
        let grid = NavGrid::new(10, 10, 1.0);
        let path = find_path(&grid, Vec3::new(0.5, 0.0, 0.5), Vec3::new(3.5, 0.0, 0.5)).unwrap();
        assert_eq!(path.waypoints.len(), 3);
        assert!((path.length - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_same_cell_path_is_goal_only() {
        let grid = NavGrid::new(4, 4, 2.0);
        let goal = Vec3::new(1.5, 0.0, 1.0);
        let path = find_path(&grid, Vec3::new(0.5, 0.0, 0.5), goal).unwrap();
        assert_eq!(path.waypoints, vec![goal]);
    }

    #[test]
    fn test_no_path() {
        let mut grid = NavGrid::new(5, 5, 1.0);
        grid.set_walkable(3, 2, false);
        grid.set_walkable(3, 4, false);
        grid.set_walkable(2, 3, false);
        grid.set_walkable(4, 3, false);

        assert!(find_path(&grid, Vec3::new(0.5, 0.0, 0.5), Vec3::new(3.5, 0.0, 3.5)).is_none());
        assert!(find_path(&grid, Vec3::new(-1.0, 0.0, 0.5), Vec3::new(1.5, 0.0, 0.5)).is_none());
    }

    #[test]
    fn test_block_box_and_nearest_walkable() {
        let mut grid = NavGrid::centered(10, 10, 1.0);
        grid.block_box(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));

        assert!(!grid.is_walkable_at(Vec3::new(0.2, 0.0, 0.2)));
        let snapped = grid.nearest_walkable(Vec3::new(0.2, 0.0, 0.2), 3.0).unwrap();
        assert!(grid.is_walkable_at(snapped));
        assert!(grid.nearest_walkable(Vec3::new(0.2, 0.0, 0.2), 0.1).is_none());

        let open = Vec3::new(3.2, 0.0, 3.2);
        assert_eq!(grid.nearest_walkable(open, 1.0), Some(open));
    }
}
