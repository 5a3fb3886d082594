//! A uniform grid of square cells.

use super::{SpatialIndex, Sweep, AABB};
use crate::{
    math as m,
    physics::{Shape, ShapeKey},
};

use std::collections::BTreeMap;

pub const DEFAULT_CELL_SIZE: f64 = 2.0;
/// Adaptive cells are this many times the average size of a movable shape.
pub const CELL_SIZE_FACTOR: f64 = 1.5;
/// Shapes covering more cells than this are kept in a separate list
/// instead of being written into every cell.
pub const MAX_CELLS_PER_ITEM: u64 = 1024;

/// Parameters for the creation of a grid.
#[derive(Clone, Copy, Debug)]
pub struct GridParams {
    /// Side length of a cell. `None` sizes cells by the shapes inserted
    /// during the previous tick, starting from [`DEFAULT_CELL_SIZE`].
    pub cell_size: Option<f64>,
    /// Whether to sort shapes by their swept bounding boxes.
    pub sweep: Sweep,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            cell_size: None,
            sweep: Sweep::Static,
        }
    }
}

type Cell = (i64, i64);

/// Every shape goes into each cell its bounding box touches.
/// The grid is unbounded, cells exist only while something occupies them.
#[derive(Clone, Debug)]
pub struct Grid {
    params: GridParams,
    cell_size: f64,
    // ordered so that groups come out the same way every run
    cells: BTreeMap<Cell, Vec<ShapeKey>>,
    large: Vec<(ShapeKey, AABB)>,
    // sum and count of movable shape sizes since the last refresh
    extent_sum: f64,
    extent_count: usize,
}

impl Grid {
    pub fn new(params: GridParams) -> Self {
        let cell_size = match params.cell_size {
            Some(size) if size.is_finite() && size > 0.0 => size,
            _ => DEFAULT_CELL_SIZE,
        };
        Self {
            params,
            cell_size,
            cells: BTreeMap::new(),
            large: Vec::new(),
            extent_sum: 0.0,
            extent_count: 0,
        }
    }

    #[inline]
    pub fn params(&self) -> &GridParams {
        &self.params
    }

    /// Side length of the cells currently in use.
    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of cells with at least one shape in them.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    fn cell_of(&self, p: m::Vec2) -> Cell {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    /// Inclusive range of cells an AABB touches, and how many there are.
    fn cell_range(&self, aabb: &AABB) -> (Cell, Cell, u64) {
        let (lo, hi) = (self.cell_of(aabb.min), self.cell_of(aabb.max));
        let span = |a: i64, b: i64| (b.saturating_sub(a) as u64).saturating_add(1);
        let count = span(lo.0, hi.0).saturating_mul(span(lo.1, hi.1));
        (lo, hi, count)
    }

    fn cell_bounds(&self, (x, y): Cell) -> AABB {
        let min = m::Vec2::new(x as f64, y as f64) * self.cell_size;
        AABB {
            min,
            max: min + m::Vec2::new(self.cell_size, self.cell_size),
        }
    }

    fn large_overlapping<'a>(&'a self, aabb: &'a AABB) -> impl Iterator<Item = ShapeKey> + 'a {
        self.large
            .iter()
            .filter(move |(_, large)| large.overlaps(aabb))
            .map(|&(key, _)| key)
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(GridParams::default())
    }
}

impl SpatialIndex for Grid {
    fn refresh(&mut self) {
        if self.params.cell_size.is_none() && self.extent_count > 0 {
            let average = self.extent_sum / self.extent_count as f64;
            if average.is_finite() && average > 0.0 {
                self.cell_size = average * CELL_SIZE_FACTOR;
            }
        }
        self.extent_sum = 0.0;
        self.extent_count = 0;
        self.cells.clear();
        self.large.clear();
    }

    fn insert(&mut self, key: ShapeKey, shape: &Shape) {
        if !shape.is_immovable() {
            let own = shape.aabb();
            self.extent_sum += (own.width() + own.height()) / 2.0;
            self.extent_count += 1;
        }

        let aabb = self.params.sweep.aabb(shape);
        let (lo, hi, count) = self.cell_range(&aabb);
        if count > MAX_CELLS_PER_ITEM {
            self.large.push((key, aabb));
            return;
        }
        for x in lo.0..=hi.0 {
            for y in lo.1..=hi.1 {
                self.cells.entry((x, y)).or_default().push(key);
            }
        }
    }

    fn possible_collisions(&self) -> Vec<Vec<ShapeKey>> {
        let mut groups: Vec<Vec<ShapeKey>> = self
            .cells
            .iter()
            .filter_map(|(&cell, keys)| {
                let bounds = self.cell_bounds(cell);
                let mut group = keys.clone();
                group.extend(self.large_overlapping(&bounds));
                (group.len() > 1).then_some(group)
            })
            .collect();
        if self.large.len() > 1 {
            groups.push(self.large.iter().map(|&(key, _)| key).collect());
        }
        groups
    }

    fn possible_colliders(&self, aabb: &AABB) -> Vec<ShapeKey> {
        let (lo, hi, count) = self.cell_range(aabb);
        let mut found: Vec<ShapeKey> = Vec::new();
        if count as usize > self.cells.len() {
            // cheaper to look at what's there than at everything the box covers
            for (&(x, y), keys) in &self.cells {
                if (lo.0..=hi.0).contains(&x) && (lo.1..=hi.1).contains(&y) {
                    found.extend(keys);
                }
            }
        } else {
            for x in lo.0..=hi.0 {
                for y in lo.1..=hi.1 {
                    if let Some(keys) = self.cells.get(&(x, y)) {
                        found.extend(keys);
                    }
                }
            }
        }
        found.extend(self.large_overlapping(aabb));
        found.sort_by_key(|k| k.bits());
        found.dedup();
        found
    }

    fn draw(&self, draw_bounds: &mut dyn FnMut(&AABB, usize)) {
        for &cell in self.cells.keys() {
            draw_bounds(&self.cell_bounds(cell), 0);
        }
    }
}
