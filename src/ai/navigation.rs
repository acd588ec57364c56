//! Navigation agent interface
//!
//! Enemy states steer through a [`Navigator`], the same way a navmesh agent
//! would be driven: set a destination, query the remaining distance, and let
//! the agent advance the owner's position each frame.

use std::rc::Rc;

use glam::Vec3;

use super::pathfinding::{NavGrid, find_path};

/// Path-following agent attached to a single enemy.
pub trait Navigator {
    /// Plan a path from `from` to `destination`. Returns `false` if no path exists
    /// or the agent is disabled.
    fn set_destination(&mut self, from: Vec3, destination: Vec3) -> bool;

    /// Current destination, if a path is active
    fn destination(&self) -> Option<Vec3>;

    /// Distance left along the active path; zero without one
    fn remaining_distance(&self, from: Vec3) -> f32;

    fn stopping_distance(&self) -> f32;

    fn set_stopping_distance(&mut self, distance: f32);

    fn speed(&self) -> f32;

    fn set_speed(&mut self, speed: f32);

    /// Pause or resume path following without dropping the path
    fn set_stopped(&mut self, stopped: bool);

    fn is_stopped(&self) -> bool;

    /// A disabled agent neither plans nor moves
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Nearest navigable point within `max_distance` of `point`
    fn sample_position(&self, point: Vec3, max_distance: f32) -> Option<Vec3>;

    /// Move along the path for `dt` seconds and return the new position
    fn advance(&mut self, from: Vec3, dt: f32) -> Vec3;

    /// Within stopping distance of the end of the path (or without a path)
    fn has_arrived(&self, from: Vec3) -> bool {
        self.remaining_distance(from) <= self.stopping_distance() + ARRIVAL_TOLERANCE
    }
}

/// Slack allowed when comparing the remaining distance to the stopping distance
pub const ARRIVAL_TOLERANCE: f32 = 0.05;

/// [`Navigator`] backed by A* on a shared [`NavGrid`].
#[derive(Debug)]
pub struct GridNavigator {
    grid: Rc<NavGrid>,
    waypoints: Vec<Vec3>,
    next: usize,
    speed: f32,
    stopping_distance: f32,
    stopped: bool,
    enabled: bool,
}

impl GridNavigator {
    /// Create an agent on `grid`
    #[must_use]
    pub fn new(grid: Rc<NavGrid>) -> Self {
        Self {
            grid,
            waypoints: Vec::new(),
            next: 0,
            speed: 3.5,
            stopping_distance: 0.0,
            stopped: false,
            enabled: true,
        }
    }

    fn clear_path(&mut self) {
        self.waypoints.clear();
        self.next = 0;
    }

    fn pending(&self) -> &[Vec3] {
        self.waypoints.get(self.next..).unwrap_or(&[])
    }
}

impl Navigator for GridNavigator {
    fn set_destination(&mut self, from: Vec3, destination: Vec3) -> bool {
        if !self.enabled {
            return false;
        }
        let snap = self.grid.cell_size * 2.0;
        let start = self.grid.nearest_walkable(from, snap).unwrap_or(from);
        let Some(goal) = self.grid.nearest_walkable(destination, snap) else {
            log::trace!("No navigable point near {destination}");
            self.clear_path();
            return false;
        };

        match find_path(&self.grid, start, goal) {
            Some(path) => {
                self.waypoints = path.waypoints;
                self.next = 0;
                true
            }
            None => {
                log::trace!("No path from {from} to {destination}");
                self.clear_path();
                false
            }
        }
    }

    fn destination(&self) -> Option<Vec3> {
        self.waypoints.last().copied()
    }

    fn remaining_distance(&self, from: Vec3) -> f32 {
        let mut prev = from;
        let mut total = 0.0;
        for &point in self.pending() {
            total += flat_distance(prev, point);
            prev = point;
        }
        total
    }

    fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }

    fn set_stopping_distance(&mut self, distance: f32) {
        self.stopping_distance = distance.max(0.0);
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn sample_position(&self, point: Vec3, max_distance: f32) -> Option<Vec3> {
        self.grid.nearest_walkable(point, max_distance)
    }

    fn advance(&mut self, from: Vec3, dt: f32) -> Vec3 {
        if !self.enabled || self.stopped || self.pending().is_empty() {
            return from;
        }
        let remaining = self.remaining_distance(from);
        if remaining <= self.stopping_distance {
            return from;
        }

        let mut position = from;
        let mut budget = (self.speed * dt).min(remaining - self.stopping_distance);
        while budget > 0.0 {
            let Some(&target) = self.waypoints.get(self.next) else {
                break;
            };
            let to = Vec3::new(target.x - position.x, 0.0, target.z - position.z);
            let dist = to.length();
            if dist <= budget {
                position.x = target.x;
                position.z = target.z;
                budget -= dist;
                self.next += 1;
            } else {
                position += to / dist * budget;
                budget = 0.0;
            }
        }
        position
    }
}

fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    Vec3::new(b.x - a.x, 0.0, b.z - a.z).length()
}
