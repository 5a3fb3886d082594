//! A binary space partitioning tree that halves space alternately
//! along the x and y axes.

use super::{
    spatial_index::{Item, Node, Nodes, Partition},
    SpatialIndex, Sweep, AABB,
};
use crate::{
    math as m,
    physics::{Shape, ShapeKey},
};

pub const DEFAULT_MAX_ITEMS: usize = 4;
pub const DEFAULT_DEPTH_CAP: usize = 12;

/// Parameters for the creation of a BSP tree.
#[derive(Clone, Copy, Debug)]
pub struct BspTreeParams {
    /// Bounds of the root node. Shapes outside them are still handled correctly,
    /// but they end up in the outermost leaves which can get crowded.
    pub bounds: AABB,
    /// How many items a leaf can hold before it splits.
    pub max_items: usize,
    /// Maximum depth of the tree. Leaves at this depth never split.
    /// See [`BspTree::calculate_depth_cap`] for a way to pick this.
    pub depth_cap: usize,
    /// Whether to sort shapes by their swept bounding boxes.
    pub sweep: Sweep,
}

impl Default for BspTreeParams {
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

/// A binary space partitioning tree.
///
/// Even depths split at the vertical line through the node's center, odd depths at the
/// horizontal one. A shape straddling the split line goes into both children.
#[derive(Clone, Debug)]
pub struct BspTree {
    nodes: Nodes<2>,
    params: BspTreeParams,
}

impl BspTree {
    pub fn new(params: BspTreeParams) -> Self {
        Self {
            nodes: Nodes::new(params.bounds, params.max_items, params.depth_cap),
            params,
        }
    }

    #[inline]
    pub fn params(&self) -> &BspTreeParams {
        &self.params
    }

    /// Change the depth cap. Applies to splits made from now on.
    pub fn set_depth_cap(&mut self, depth_cap: usize) {
        self.params.depth_cap = depth_cap;
        self.nodes.depth_cap = depth_cap;
    }

    /// A depth cap at which leaves are about the size of the average shape,
    /// given the shapes' bounding boxes.
    ///
    /// Every level halves the area of a node, so this is the number of halvings
    /// from the world's area to the average bounding box area, at least 1
    /// and at most [`DEFAULT_DEPTH_CAP`].
    pub fn calculate_depth_cap(world: &AABB, aabbs: impl IntoIterator<Item = AABB>) -> usize {
        let (count, total_area) = aabbs
            .into_iter()
            .fold((0usize, 0.0), |(n, area), aabb| (n + 1, area + aabb.area()));
        if count == 0 || total_area <= 0.0 {
            return DEFAULT_DEPTH_CAP;
        }
        let avg_area = total_area / count as f64;
        let halvings = (world.area() / avg_area).log2().ceil();
        if halvings.is_finite() {
            (halvings.max(1.0) as usize).min(DEFAULT_DEPTH_CAP)
        } else {
            DEFAULT_DEPTH_CAP
        }
    }

    /// Number of nodes currently in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Partition<2> for BspTree {
    fn route(node: &Node<2>, aabb: &AABB) -> [bool; 2] {
        let center = node.bounds.center();
        let (min, max, mid) = if node.depth % 2 == 0 {
            (aabb.min.x, aabb.max.x, center.x)
        } else {
            (aabb.min.y, aabb.max.y, center.y)
        };
        [min < mid, max >= mid]
    }

    fn split(node: &Node<2>) -> [AABB; 2] {
        let (bounds, center) = (node.bounds, node.bounds.center());
        if node.depth % 2 == 0 {
            [
                AABB {
                    min: bounds.min,
                    max: m::Vec2::new(center.x, bounds.max.y),
                },
                AABB {
                    min: m::Vec2::new(center.x, bounds.min.y),
                    max: bounds.max,
                },
            ]
        } else {
            [
                AABB {
                    min: bounds.min,
                    max: m::Vec2::new(bounds.max.x, center.y),
                },
                AABB {
                    min: m::Vec2::new(bounds.min.x, center.y),
                    max: bounds.max,
                },
            ]
        }
    }
}

impl Default for BspTree {
    fn default() -> Self {
        Self::new(BspTreeParams::default())
    }
}

impl SpatialIndex for BspTree {
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
