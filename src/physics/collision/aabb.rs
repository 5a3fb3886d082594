use crate::math as m;

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub struct AABB {
    pub min: m::Vec2,
    pub max: m::Vec2,
}

impl AABB {
    /// The smallest box containing all the given points.
    /// Degenerate (min = max = origin) if there are none.
    pub fn from_points(points: &[m::Vec2]) -> Self {
        let mut iter = points.iter();
        let first = match iter.next() {
            Some(&p) => p,
            None => {
                return AABB {
                    min: m::Vec2::zero(),
                    max: m::Vec2::zero(),
                }
            }
        };
        iter.fold(
            AABB {
                min: first,
                max: first,
            },
            |acc, &p| AABB {
                min: acc.min.min_by_component(p),
                max: acc.max.max_by_component(p),
            },
        )
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> m::Vec2 {
        (self.min + self.max) / 2.0
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Check whether two boxes overlap. Touching edges count as overlapping.
    #[inline]
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    #[inline]
    pub fn contains_point(&self, p: m::Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// The smallest box containing both boxes.
    #[inline]
    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.min_by_component(other.min),
            max: self.max.max_by_component(other.max),
        }
    }

    #[inline]
    pub fn translated(&self, offset: m::Vec2) -> AABB {
        AABB {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// The four corners in clockwise order starting from the bottom left.
    pub fn corners(&self) -> [m::Vec2; 4] {
        [
            self.min,
            m::Vec2::new(self.min.x, self.max.y),
            self.max,
            m::Vec2::new(self.max.x, self.min.y),
        ]
    }

    /// Check that the box has positive finite extent on both axes.
    pub(crate) fn is_valid(&self) -> bool {
        let finite = [self.min.x, self.min.y, self.max.x, self.max.y]
            .iter()
            .all(|c| c.is_finite());
        finite && self.width() > 0.0 && self.height() > 0.0
    }
}
