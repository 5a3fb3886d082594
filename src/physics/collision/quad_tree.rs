//! A region quadtree.

use super::{
    spatial_index::{Item, Node, Nodes, Partition},
    SpatialIndex, Sweep, AABB,
};
use crate::{
    math as m,
    physics::{Shape, ShapeKey},
};

pub const DEFAULT_MAX_ITEMS: usize = 4;
pub const DEFAULT_DEPTH_CAP: usize = 5;

/// Parameters for the creation of a quadtree.
#[derive(Clone, Copy, Debug)]
pub struct QuadTreeParams {
    /// Bounds of the root node. Shapes outside them still get grouped correctly.
    pub bounds: AABB,
    /// How many items a leaf can hold before it splits.
    pub max_items: usize,
    /// Maximum depth of the tree. Leaves at this depth never split.
    pub depth_cap: usize,
    /// Whether to sort shapes by their swept bounding boxes.
    pub sweep: Sweep,
}

impl Default for QuadTreeParams {
    fn default() -> Self {
        Self {
            bounds: AABB {
                min: m::Vec2::new(-40.0, -10.0),
                max: m::Vec2::new(40.0, 10.0),
            },
            max_items: DEFAULT_MAX_ITEMS,
            depth_cap: DEFAULT_DEPTH_CAP,
            sweep: Sweep::Static,
        }
    }
}

// child order
const BOTTOM_LEFT: usize = 0;
const TOP_LEFT: usize = 1;
const TOP_RIGHT: usize = 2;
const BOTTOM_RIGHT: usize = 3;

/// A quadtree where every split divides a node into four equal quadrants.
///
/// A shape goes into every quadrant its bounding box touches.
#[derive(Clone, Debug)]
pub struct QuadTree {
    nodes: Nodes<4>,
    params: QuadTreeParams,
}

impl QuadTree {
    pub fn new(params: QuadTreeParams) -> Self {
        Self {
            nodes: Nodes::new(params.bounds, params.max_items, params.depth_cap),
            params,
        }
    }

    #[inline]
    pub fn params(&self) -> &QuadTreeParams {
        &self.params
    }

    /// Number of nodes currently in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Partition<4> for QuadTree {
    fn route(node: &Node<4>, aabb: &AABB) -> [bool; 4] {
        let mid = node.bounds.center();
        let left = aabb.min.x < mid.x;
        let right = aabb.max.x >= mid.x;
        let bottom = aabb.min.y < mid.y;
        let top = aabb.max.y >= mid.y;
        let mut goes = [false; 4];
        goes[BOTTOM_LEFT] = bottom && left;
        goes[TOP_LEFT] = top && left;
        goes[TOP_RIGHT] = top && right;
        goes[BOTTOM_RIGHT] = bottom && right;
        goes
    }

    fn split(node: &Node<4>) -> [AABB; 4] {
        let b = node.bounds;
        let mid = b.center();
        let mut quadrants = [b; 4];
        quadrants[BOTTOM_LEFT] = AABB { min: b.min, max: mid };
        quadrants[TOP_LEFT] = AABB {
            min: m::Vec2::new(b.min.x, mid.y),
            max: m::Vec2::new(mid.x, b.max.y),
        };
        quadrants[TOP_RIGHT] = AABB { min: mid, max: b.max };
        quadrants[BOTTOM_RIGHT] = AABB {
            min: m::Vec2::new(mid.x, b.min.y),
            max: m::Vec2::new(b.max.x, mid.y),
        };
        quadrants
    }
}

impl Default for QuadTree {
    fn default() -> Self {
        Self::new(QuadTreeParams::default())
    }
}

impl SpatialIndex for QuadTree {
    fn refresh(&mut self) {
        self.nodes.clear();
    }

    fn insert(&mut self, key: ShapeKey, shape: &Shape) {
        let aabb = self.params.sweep.aabb(shape);
        self.nodes.insert::<Self>(Item { key, aabb });
    }

    fn possible_collisions(&self) -> Vec<Vec<ShapeKey>> {
        self.nodes.leaf_groups()
    }

    fn possible_colliders(&self, aabb: &AABB) -> Vec<ShapeKey> {
        self.nodes.query::<Self>(aabb)
    }

    fn draw(&self, draw_bounds: &mut dyn FnMut(&AABB, usize)) {
        self.nodes.draw(draw_bounds);
    }
}
