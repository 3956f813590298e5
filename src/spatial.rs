//! Spatial model - points in the plane, the city disk, and a bucketed point index

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Whether `self` lies strictly within `radius` of `center`.
    pub fn inside(self, center: Point, radius: f64) -> bool {
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        if dx > radius || dx < -radius || dy > radius || dy < -radius {
            return false;
        }
        self.distance(center) < radius
    }
}

/// Every integer-coordinate point strictly inside the disk of `radius` about the origin.
pub fn lattice_points(radius: f64) -> Vec<Point> {
    let bound = radius.floor() as i64;
    let mut points = Vec::new();
    for x in -bound..=bound {
        for y in -bound..=bound {
            let point = Point::new(x as f64, y as f64);
            if point.inside(Point::ORIGIN, radius) {
                points.push(point);
            }
        }
    }
    points
}

type CellKey = (i64, i64);

/// Uniform-cell bucket index over a fixed set of points.
///
/// Queries only prefilter by cell; the exact strict-distance test is always
/// applied, so results match a linear scan. Returned indices are ascending.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    points: Vec<Point>,
    cells: HashMap<CellKey, Vec<usize>>,
    min_cell: CellKey,
    max_cell: CellKey,
}

impl SpatialIndex {
    pub fn new(points: Vec<Point>, cell_size: f64) -> Self {
        let cell_size = if cell_size > 0.0 && cell_size.is_finite() {
            cell_size
        } else {
            1.0
        };
        let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
        let mut min_cell = (i64::MAX, i64::MAX);
        let mut max_cell = (i64::MIN, i64::MIN);
        for (index, point) in points.iter().enumerate() {
            let key = cell_of(*point, cell_size);
            min_cell = (min_cell.0.min(key.0), min_cell.1.min(key.1));
            max_cell = (max_cell.0.max(key.0), max_cell.1.max(key.1));
            cells.entry(key).or_default().push(index);
        }
        Self {
            cell_size,
            points,
            cells,
            min_cell,
            max_cell,
        }
    }

    /// Indices of all points strictly within `radius` of `center`, ascending.
    pub fn within(&self, center: Point, radius: f64) -> Vec<usize> {
        if self.points.is_empty() || radius <= 0.0 || radius.is_nan() {
            return Vec::new();
        }
        let low = cell_of(Point::new(center.x - radius, center.y - radius), self.cell_size);
        let high = cell_of(Point::new(center.x + radius, center.y + radius), self.cell_size);
        let x_range = low.0.max(self.min_cell.0)..=high.0.min(self.max_cell.0);
        let y_range = low.1.max(self.min_cell.1)..=high.1.min(self.max_cell.1);

        let span = (x_range.end() - x_range.start() + 1).max(0) as u128
            * (y_range.end() - y_range.start() + 1).max(0) as u128;
        let mut found: Vec<usize> = if span > self.cells.len() as u128 {
            // Query box covers more cells than are populated; walk the buckets instead.
            self.cells
                .iter()
                .filter(|(key, _)| x_range.contains(&key.0) && y_range.contains(&key.1))
                .flat_map(|(_, members)| members.iter().copied())
                .filter(|&index| self.points[index].inside(center, radius))
                .collect()
        } else {
            let mut hits = Vec::new();
            for cx in x_range.clone() {
                for cy in y_range.clone() {
                    if let Some(members) = self.cells.get(&(cx, cy)) {
                        hits.extend(
                            members
                                .iter()
                                .copied()
                                .filter(|&index| self.points[index].inside(center, radius)),
                        );
                    }
                }
            }
            hits
        };
        found.sort_unstable();
        found
    }
}

fn cell_of(point: Point, cell_size: f64) -> CellKey {
    (
        (point.x / cell_size).floor() as i64,
        (point.y / cell_size).floor() as i64,
    )
}
