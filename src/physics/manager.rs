//! The per-tick collision pipeline: broad phase, narrow phase,
//! and discrete or speculative contact response.

use super::{
    collision::{
        bsp_tree::BspTreeParams, grid::GridParams, quad_tree::QuadTreeParams, BspTree,
        CollisionPair, CollisionSolver, GjkEpa, Grid, Mpr, QuadTree, Resolution, Sat,
        SpatialIndex, Sweep, AABB,
    },
    forcefield::{ForceField, Gravity},
    impulse, BodySet, Shape, ShapeKey,
};
use crate::math as m;

use itertools::Itertools;
use std::collections::HashSet;

/// Errors from invalid [`ManagerParams`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("Timestep must be positive and finite, got {0}")]
    NonPositiveTimestep(f64),
    #[error("World bounds must have positive width and height")]
    InvalidWorldBounds,
    #[error("Gravity must be finite")]
    NonFiniteGravity,
}

/// Which narrow phase algorithm to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverKind {
    #[default]
    GjkEpa,
    Mpr,
    Sat,
}

/// Which broad phase structure to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexKind {
    Bsp,
    #[default]
    Quad,
    Grid,
}

/// Construction parameters of a [`CollisionManager`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct ManagerParams {
    /// Length of a tick in seconds.
    pub dt: f64,
    /// Bounds of the spatial index's root node.
    /// Bodies may leave them, at some cost to broad phase efficiency.
    pub world_bounds: AABB,
    pub solver: SolverKind,
    pub index: IndexKind,
    /// Sort bodies into the index by their swept bounding boxes,
    /// so that fast bodies are paired with anything they could reach within a tick.
    pub swept: bool,
    /// Resolve impending collisions within the tick they would happen in.
    /// Without this, fast bodies can pass through thin obstacles.
    pub speculative: bool,
    /// Uniform gravitational acceleration.
    pub gravity: m::Vec2,
}

impl Default for ManagerParams {
    fn default() -> Self {
        Self {
            dt: 1.0 / 50.0,
            world_bounds: AABB {
                min: m::Vec2::new(-40.0, -10.0),
                max: m::Vec2::new(40.0, 10.0),
            },
            solver: SolverKind::default(),
            index: IndexKind::default(),
            swept: true,
            speculative: true,
            gravity: m::Vec2::new(0.0, -9.81),
        }
    }
}

impl ManagerParams {
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_world_bounds(mut self, bounds: AABB) -> Self {
        self.world_bounds = bounds;
        self
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    pub fn with_swept(mut self, swept: bool) -> Self {
        self.swept = swept;
        self
    }

    pub fn with_speculative(mut self, speculative: bool) -> Self {
        self.speculative = speculative;
        self
    }

    pub fn with_gravity(mut self, gravity: m::Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    fn validate(&self) -> Result<(), ParamsError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ParamsError::NonPositiveTimestep(self.dt));
        }
        if !self.world_bounds.is_valid() {
            return Err(ParamsError::InvalidWorldBounds);
        }
        if !(self.gravity.x.is_finite() && self.gravity.y.is_finite()) {
            return Err(ParamsError::NonFiniteGravity);
        }
        Ok(())
    }
}

/// Counts from the most recent tick, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Groups returned by the broad phase.
    pub groups: usize,
    /// Distinct pairs considered by the narrow phase.
    pub pairs: usize,
    /// Narrow phase queries, counting a pair again whenever a contact
    /// changed the course of one of its shapes.
    pub pairs_tested: usize,
    /// Pairs found overlapping and pushed apart.
    pub discrete: usize,
    /// Impending contacts resolved ahead of time.
    pub speculative: usize,
}

/// Cap on speculative contacts in one tick, per pair under consideration.
/// Bodies wedged between others could otherwise keep trading impulses.
const MAX_CONTACTS_PER_PAIR: usize = 4;

/// Closing speeds below this are treated as resting contact.
const MIN_CLOSING_SPEED: f64 = 1e-9;

/// An impending contact between the shapes of a pair.
#[derive(Clone, Copy, Debug)]
struct Prediction {
    // as a fraction of the whole tick
    time: f64,
    normal: m::Unit<m::Vec2>,
}

// bookkeeping that lives for the duration of one tick
#[derive(Default)]
struct Tick {
    pairs: Vec<CollisionPair>,
    // next contact of the pair at the same index
    predictions: Vec<Option<Prediction>>,
    seen: HashSet<CollisionPair>,
    // bodies that received the whole tick's gravity up front
    forced: HashSet<ShapeKey>,
    // fraction of the tick every body has been advanced by
    elapsed: f64,
    stats: TickStats,
}

impl Tick {
    /// Start tracking a pair unless it already is or it can never collide.
    fn add_pair(&mut self, bodies: &BodySet, a: ShapeKey, b: ShapeKey) -> bool {
        if a == b {
            return false;
        }
        match (bodies.get(a), bodies.get(b)) {
            (Some(sa), Some(sb)) if !(sa.is_immovable() && sb.is_immovable()) => {}
            _ => return false,
        }
        let pair = CollisionPair::new(a, b);
        if !self.seen.insert(pair) {
            return false;
        }
        self.pairs.push(pair);
        self.predictions.push(None);
        true
    }

    /// The soonest predicted contact. Ties go to the pair found first.
    fn earliest(&self) -> Option<(usize, Prediction)> {
        self.predictions
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (i, p)))
            .min_by(|(_, p1), (_, p2)| p1.time.total_cmp(&p2.time))
    }
}

/// Steps a [`BodySet`] forward in time one fixed tick at a time,
/// detecting and responding to collisions along the way.
pub struct CollisionManager {
    params: ManagerParams,
    solver: Box<dyn CollisionSolver>,
    index: Box<dyn SpatialIndex>,
    forcefield: Box<dyn ForceField>,
    last_tick: TickStats,
}

impl CollisionManager {
    pub fn new(params: ManagerParams) -> Result<Self, ParamsError> {
        params.validate()?;

        let sweep = if params.swept {
            Sweep::Swept { dt: params.dt }
        } else {
            Sweep::Static
        };
        let index: Box<dyn SpatialIndex> = match params.index {
            IndexKind::Bsp => Box::new(BspTree::new(BspTreeParams {
                bounds: params.world_bounds,
                sweep,
                ..Default::default()
            })),
            IndexKind::Quad => Box::new(QuadTree::new(QuadTreeParams {
                bounds: params.world_bounds,
                sweep,
                ..Default::default()
            })),
            IndexKind::Grid => Box::new(Grid::new(GridParams {
                sweep,
                ..Default::default()
            })),
        };
        let solver: Box<dyn CollisionSolver> = match params.solver {
            SolverKind::GjkEpa => Box::new(GjkEpa),
            SolverKind::Mpr => Box::new(Mpr),
            SolverKind::Sat => Box::new(Sat),
        };

        Ok(Self {
            params,
            solver,
            index,
            forcefield: Box::new(Gravity(params.gravity)),
            last_tick: TickStats::default(),
        })
    }

    /// Replace the narrow phase algorithm chosen by the params.
    pub fn with_solver(mut self, solver: impl CollisionSolver + 'static) -> Self {
        self.solver = Box::new(solver);
        self
    }

    /// Replace the broad phase structure chosen by the params.
    pub fn with_index(mut self, index: impl SpatialIndex + 'static) -> Self {
        self.index = Box::new(index);
        self
    }

    /// Replace the uniform gravity given in the params with an arbitrary force field.
    pub fn with_force_field(mut self, field: impl ForceField + 'static) -> Self {
        self.forcefield = Box::new(field);
        self
    }

    #[inline]
    pub fn params(&self) -> &ManagerParams {
        &self.params
    }

    /// The broad phase structure as it was built during the last tick,
    /// e.g. for drawing it with [`SpatialIndex::draw`].
    #[inline]
    pub fn index(&self) -> &dyn SpatialIndex {
        self.index.as_ref()
    }

    #[inline]
    pub fn last_tick(&self) -> TickStats {
        self.last_tick
    }

    /// Advance every body by one tick.
    ///
    /// Overlapping pairs are pushed apart first. With speculation on, impending
    /// contacts are then handled in the order they happen: all bodies advance to the
    /// earliest one, it's resolved, and the pairs of the bodies whose course changed
    /// are predicted again for the rest of the tick.
    ///
    /// Every movable body receives one tick's worth of gravity and travels for exactly
    /// one tick. Immovable bodies are never changed.
    pub fn run_manager(&mut self, bodies: &mut BodySet) {
        let _span = tracy_span!("run_manager", "run_manager");

        let mut tick = Tick::default();
        for (_, shape) in bodies.iter_mut() {
            shape.begin_tick();
        }

        //
        // Broad phase
        //

        let groups = {
            let _span = tracy_span!("broad phase", "run_manager");
            self.index.refresh();
            for (key, shape) in bodies.iter() {
                self.index.insert(key, shape);
            }
            self.index.possible_collisions()
        };
        tick.stats.groups = groups.len();
        for group in &groups {
            for (a, b) in group.iter().copied().tuple_combinations() {
                tick.add_pair(bodies, a, b);
            }
        }

        //
        // Overlaps
        //

        let mut resolutions = Vec::with_capacity(tick.pairs.len());
        let mut disturbed: Vec<ShapeKey> = Vec::new();
        for i in 0..tick.pairs.len() {
            let pair = tick.pairs[i];
            let res = self.query(bodies, &mut tick, pair);
            if let Resolution::Penetrating { normal, depth } = res {
                self.resolve_overlap(bodies, &mut tick, pair, normal, depth);
                let (a, b) = pair.keys();
                for key in [a, b] {
                    let movable = bodies.get(key).map_or(false, |s| !s.is_immovable());
                    if movable && !disturbed.contains(&key) {
                        disturbed.push(key);
                    }
                }
            }
            resolutions.push(res);
        }

        //
        // Impending contacts
        //

        if self.params.speculative {
            let _span = tracy_span!("speculative contacts", "run_manager");
            for (i, res) in resolutions.into_iter().enumerate() {
                let pair = tick.pairs[i];
                let (a, b) = pair.keys();
                if disturbed.contains(&a) || disturbed.contains(&b) {
                    continue;
                }
                let prediction = self.predict(bodies, &tick, pair, res);
                tick.predictions[i] = prediction;
            }
            self.repredict(bodies, &mut tick, &disturbed);
            self.speculate(bodies, &mut tick);
        }

        let rest = (1.0 - tick.elapsed).max(0.0);
        self.advance(bodies, &mut tick, rest);

        tick.stats.pairs = tick.pairs.len();
        log::debug!(
            "tick: {} groups, {} pairs, {} tests, {} discrete, {} speculative",
            tick.stats.groups,
            tick.stats.pairs,
            tick.stats.pairs_tested,
            tick.stats.discrete,
            tick.stats.speculative
        );
        self.last_tick = tick.stats;
    }

    /// Run the narrow phase on a pair at the bodies' current positions.
    fn query(&self, bodies: &BodySet, tick: &mut Tick, pair: CollisionPair) -> Resolution {
        let (a, b) = pair.keys();
        match (bodies.get(a), bodies.get(b)) {
            (Some(sa), Some(sb)) => {
                tick.stats.pairs_tested += 1;
                self.solver.collision_resolution(sa, sb)
            }
            _ => Resolution::Unresolved,
        }
    }

    fn resolve_overlap(
        &self,
        bodies: &mut BodySet,
        tick: &mut Tick,
        pair: CollisionPair,
        normal: m::Unit<m::Vec2>,
        depth: f64,
    ) {
        let (a, b) = pair.keys();
        let (shape_a, shape_b) = match bodies.get2_mut(a, b) {
            (Some(sa), Some(sb)) => (sa, sb),
            _ => return,
        };
        log::trace!("{} and {} overlap by {:.4}", shape_a, shape_b, depth);
        tick.stats.discrete += 1;

        for (key, shape) in [(a, &mut *shape_a), (b, &mut *shape_b)] {
            if tick.forced.insert(key) {
                self.apply_gravity(shape, 1.0);
            }
        }
        unstick(shape_a, shape_b, normal, depth);
        impulse::resolve(shape_a, shape_b, normal);
    }

    /// When, if at all, the shapes of a pair touch during the rest of the tick.
    fn predict(
        &self,
        bodies: &BodySet,
        tick: &Tick,
        pair: CollisionPair,
        res: Resolution,
    ) -> Option<Prediction> {
        let (a, b) = pair.keys();
        let relative_vel = bodies.get(a)?.velocity() - bodies.get(b)?.velocity();
        let remaining = 1.0 - tick.elapsed;
        match res {
            Resolution::Separated { normal, distance } => {
                let closing_speed = relative_vel.dot(*normal);
                if closing_speed <= MIN_CLOSING_SPEED {
                    return None;
                }
                let t = contact_fraction(closing_speed, distance, self.params.dt * remaining)?;
                Some(Prediction {
                    time: tick.elapsed + t * remaining,
                    normal,
                })
            }
            // overlapping and still closing in, resolve right away
            Resolution::Penetrating { normal, .. }
                if relative_vel.dot(*normal) > MIN_CLOSING_SPEED =>
            {
                Some(Prediction {
                    time: tick.elapsed,
                    normal,
                })
            }
            _ => None,
        }
    }

    /// Predict every pair involving the given bodies again, first pairing them
    /// with anything the broad phase finds along their remaining path.
    fn repredict(&self, bodies: &BodySet, tick: &mut Tick, keys: &[ShapeKey]) {
        if keys.is_empty() {
            return;
        }
        let remaining_dt = self.params.dt * (1.0 - tick.elapsed);
        for &key in keys {
            let reach = match bodies.get(key) {
                Some(shape) => shape.swept_aabb(remaining_dt),
                None => continue,
            };
            for other in self.index.possible_colliders(&reach) {
                tick.add_pair(bodies, key, other);
            }
        }

        for i in 0..tick.pairs.len() {
            let pair = tick.pairs[i];
            let (a, b) = pair.keys();
            if !(keys.contains(&a) || keys.contains(&b)) {
                continue;
            }
            let res = self.query(bodies, tick, pair);
            let prediction = self.predict(bodies, tick, pair, res);
            tick.predictions[i] = prediction;
        }
    }

    /// Resolve predicted contacts earliest first until none remain in this tick.
    fn speculate(&self, bodies: &mut BodySet, tick: &mut Tick) {
        let mut contacts = 0;
        while let Some((i, contact)) = tick.earliest() {
            if contacts >= MAX_CONTACTS_PER_PAIR * tick.pairs.len() {
                log::warn!(
                    "gave up on speculative contacts after {} at {:.3} of the tick",
                    contacts,
                    tick.elapsed
                );
                break;
            }
            contacts += 1;
            tick.predictions[i] = None;

            let step = (contact.time - tick.elapsed).max(0.0);
            self.advance(bodies, tick, step);

            let (a, b) = tick.pairs[i].keys();
            if let (Some(shape_a), Some(shape_b)) = bodies.get2_mut(a, b) {
                log::trace!(
                    "{} and {} collide at {:.3} of the tick",
                    shape_a,
                    shape_b,
                    contact.time
                );
                impulse::resolve(shape_a, shape_b, contact.normal);
                tick.stats.speculative += 1;
            }

            let changed: Vec<ShapeKey> = [a, b]
                .into_iter()
                .filter(|&key| bodies.get(key).map_or(false, |s| !s.is_immovable()))
                .collect();
            self.repredict(bodies, tick, &changed);
        }
    }

    /// Move every body forward by a fraction of the tick,
    /// with gravity for that fraction unless it was already given in full.
    fn advance(&self, bodies: &mut BodySet, tick: &mut Tick, fraction: f64) {
        for (key, shape) in bodies.iter_mut() {
            if !tick.forced.contains(&key) {
                self.apply_gravity(shape, fraction);
            }
            shape.integrate(self.params.dt, fraction);
        }
        tick.elapsed += fraction;
    }

    /// Add a fraction of a tick's worth of gravity to a shape's pending forces.
    fn apply_gravity(&self, shape: &mut Shape, fraction: f64) {
        if let Some(mass) = shape.mass().finite() {
            let accel = self.forcefield.value_at(shape.center_of_mass());
            shape.add_force(accel * mass * self.params.dt * fraction);
        }
    }
}

/// Push two overlapping shapes apart along `normal`, which points from A toward B.
/// The lighter shape moves more, and immovable shapes don't move at all.
fn unstick(a: &mut Shape, b: &mut Shape, normal: m::Unit<m::Vec2>, depth: f64) {
    let (inv_a, inv_b) = (a.inv_mass(), b.inv_mass());
    let inv_sum = inv_a + inv_b;
    if inv_sum == 0.0 {
        return;
    }
    let offset = *normal * depth;
    a.translate(-offset * (inv_a / inv_sum));
    b.translate(offset * (inv_b / inv_sum));
}

/// The fraction of a tick after which two shapes `distance` apart,
/// approaching each other at `closing_speed`, come into contact.
/// `None` if they don't within this tick.
fn contact_fraction(closing_speed: f64, distance: f64, dt: f64) -> Option<f64> {
    let reach = closing_speed * dt;
    if closing_speed > 0.0 && distance >= 0.0 && reach >= distance {
        Some((distance / reach).clamp(0.0, 1.0))
    } else {
        None
    }
}
