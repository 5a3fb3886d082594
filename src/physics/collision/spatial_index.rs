//! The spatial index is responsible for grouping possibly
//! intersecting objects for further, more accurate narrow phase inspection.

use super::AABB;
use crate::physics::{Shape, ShapeKey};

/// Which bounding box a spatial index sorts shapes by.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub enum Sweep {
    /// The shape's current bounding box.
    Static,
    /// The bounding box covering the shape's motion over a tick of length `dt`,
    /// so that fast shapes are grouped with anything they might reach.
    Swept { dt: f64 },
}

impl Sweep {
    pub fn aabb(&self, shape: &Shape) -> AABB {
        match *self {
            Sweep::Static => shape.aabb(),
            Sweep::Swept { dt } => shape.swept_aabb(dt),
        }
    }
}

/// A broad phase structure, rebuilt from scratch every tick.
pub trait SpatialIndex {
    /// Remove everything, leaving an empty root node.
    fn refresh(&mut self);

    fn insert(&mut self, key: ShapeKey, shape: &Shape);

    /// Groups of shapes that share a leaf node.
    ///
    /// Every pair of shapes whose bounding boxes overlap appears together in at least
    /// one group. Groups may also contain pairs that don't overlap.
    fn possible_collisions(&self) -> Vec<Vec<ShapeKey>>;

    /// Every shape sharing a leaf node with the given bounding box.
    fn possible_colliders(&self, aabb: &AABB) -> Vec<ShapeKey>;

    /// Visit the bounds of every node with its depth, for debug visualization.
    fn draw(&self, draw_bounds: &mut dyn FnMut(&AABB, usize));
}

//
// Shared tree internals
//

#[derive(Clone, Copy, Debug)]
pub(super) struct Item {
    pub key: ShapeKey,
    pub aabb: AABB,
}

/// A tree node with `N` children once split.
#[derive(Clone, Debug)]
pub(super) struct Node<const N: usize> {
    pub bounds: AABB,
    pub depth: usize,
    pub items: Vec<Item>,
    pub children: Option<[usize; N]>,
}

impl<const N: usize> Node<N> {
    pub fn leaf(bounds: AABB, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }
}

/// How a tree divides a node among its `N` children.
pub(super) trait Partition<const N: usize> {
    /// Which children of a node an AABB overlaps.
    fn route(node: &Node<N>, aabb: &AABB) -> [bool; N];

    /// Bounds of the children of a node, in the order `route` refers to them.
    fn split(node: &Node<N>) -> [AABB; N];
}

/// Tree nodes stored flat in a `Vec`, root first, with children referring to their
/// indices. Items go into every leaf their bounding box touches.
#[derive(Clone, Debug)]
pub(super) struct Nodes<const N: usize> {
    nodes: Vec<Node<N>>,
    bounds: AABB,
    pub max_items: usize,
    pub depth_cap: usize,
}

impl<const N: usize> Nodes<N> {
    pub fn new(bounds: AABB, max_items: usize, depth_cap: usize) -> Self {
        Self {
            nodes: vec![Node::leaf(bounds, 0)],
            bounds,
            max_items,
            depth_cap,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Remove everything, leaving an empty root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::leaf(self.bounds, 0));
    }

    pub fn insert<P: Partition<N>>(&mut self, item: Item) {
        self.insert_at::<P>(0, item);
    }

    fn insert_at<P: Partition<N>>(&mut self, node_idx: usize, item: Item) {
        if let Some(children) = self.nodes[node_idx].children {
            let goes = P::route(&self.nodes[node_idx], &item.aabb);
            for (child, go) in children.into_iter().zip(goes) {
                if go {
                    self.insert_at::<P>(child, item);
                }
            }
            return;
        }

        let node = &mut self.nodes[node_idx];
        node.items.push(item);
        if node.items.len() > self.max_items && node.depth < self.depth_cap {
            self.split::<P>(node_idx);
        }
    }

    fn split<P: Partition<N>>(&mut self, node_idx: usize) {
        let child_bounds = P::split(&self.nodes[node_idx]);
        let depth = self.nodes[node_idx].depth;

        let first_child = self.nodes.len();
        self.nodes
            .extend(child_bounds.iter().map(|&b| Node::leaf(b, depth + 1)));
        let items = std::mem::take(&mut self.nodes[node_idx].items);
        self.nodes[node_idx].children = Some(std::array::from_fn(|i| first_child + i));
        for item in items {
            self.insert_at::<P>(node_idx, item);
        }
    }

    /// Keys of every leaf with more than one item.
    pub fn leaf_groups(&self) -> Vec<Vec<ShapeKey>> {
        self.nodes
            .iter()
            .filter(|n| n.children.is_none() && n.items.len() > 1)
            .map(|n| n.items.iter().map(|item| item.key).collect())
            .collect()
    }

    /// Keys of the items in every leaf the AABB reaches, without duplicates.
    pub fn query<P: Partition<N>>(&self, aabb: &AABB) -> Vec<ShapeKey> {
        let mut found: Vec<ShapeKey> = Vec::new();
        let mut stack: Vec<usize> = vec![0];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            match node.children {
                Some(children) => {
                    let goes = P::route(node, aabb);
                    for (child, go) in children.into_iter().zip(goes) {
                        if go {
                            stack.push(child);
                        }
                    }
                }
                None => found.extend(node.items.iter().map(|item| item.key)),
            }
        }
        found.sort_by_key(|k| k.bits());
        found.dedup();
        found
    }

    pub fn draw(&self, draw_bounds: &mut dyn FnMut(&AABB, usize)) {
        for node in &self.nodes {
            draw_bounds(&node.bounds, node.depth);
        }
    }
}

#[cfg(test)]
pub(super) mod test_util {
    //! Checks shared by the tree implementations.

    use super::*;
    use crate::{
        math as m,
        physics::{collision::CollisionPair, BodySet, Material},
    };
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    pub fn random_bodies(seed: u64, count: usize, world: &AABB) -> BodySet {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut bodies = BodySet::new();
        for _ in 0..count {
            // some shapes slightly outside the world too
            let pos = m::Vec2::new(
                rng.gen_range(world.min.x - 2.0..world.max.x + 2.0),
                rng.gen_range(world.min.y - 2.0..world.max.y + 2.0),
            );
            let vel = m::Vec2::new(rng.gen_range(-30.0..30.0), rng.gen_range(-30.0..30.0));
            let shape = if rng.gen_bool(0.5) {
                Shape::circle(pos, rng.gen_range(0.1..1.5), Material::WOOD)
            } else {
                Shape::rectangle(
                    pos,
                    rng.gen_range(0.2..3.0),
                    rng.gen_range(0.2..3.0),
                    m::Angle::Deg(rng.gen_range(0.0..90.0)),
                    Material::WOOD,
                )
            };
            bodies.insert(shape.unwrap().with_velocity(vel));
        }
        bodies
    }

    /// Assert every pair with overlapping (swept) bounding boxes shares a group.
    pub fn assert_complete(index: &mut impl SpatialIndex, bodies: &BodySet, sweep: Sweep) {
        index.refresh();
        for (key, shape) in bodies.iter() {
            index.insert(key, shape);
        }
        let mut grouped: HashSet<CollisionPair> = HashSet::new();
        for group in index.possible_collisions() {
            for (i, &a) in group.iter().enumerate() {
                for &b in &group[i + 1..] {
                    grouped.insert(CollisionPair::new(a, b));
                }
            }
        }
        let shapes: Vec<_> = bodies.iter().collect();
        let mut overlapping = 0;
        for (i, (ka, sa)) in shapes.iter().enumerate() {
            for (kb, sb) in &shapes[i + 1..] {
                if sweep.aabb(sa).overlaps(&sweep.aabb(sb)) {
                    overlapping += 1;
                    assert!(
                        grouped.contains(&CollisionPair::new(*ka, *kb)),
                        "{} and {} overlap but were never grouped",
                        sa,
                        sb
                    );
                }
            }
        }
        assert!(overlapping > 0);
    }
}
