//! Coordinate types for world positions and bounding volumes.

use serde::{Deserialize, Serialize};

/// Integer world position of an emitter or listener.
///
/// `x` runs left to right, `y` is height above the ground plane and `z`
/// runs into the scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate in world space
    pub x: i32,
    /// Y coordinate in world space
    pub y: i32,
    /// Z coordinate in world space
    pub z: i32,
}

impl Position {
    /// The world origin.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Creates a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance between two positions.
    ///
    /// Computed in `i64`; saturates at `i64::MAX` for positions near
    /// opposite ends of the `i32` range.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        sum_of_squares(
            self.x as i64 - other.x as i64,
            self.y as i64 - other.y as i64,
            self.z as i64 - other.z as i64,
        )
    }

    /// Returns this position offset by the given deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }
}

/// Axis-aligned bounding box with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner (inclusive)
    pub min: Position,
    /// Maximum corner (inclusive)
    pub max: Position,
}

impl Aabb {
    /// Creates a box from two corners, in any order.
    #[must_use]
    pub fn new(a: Position, b: Position) -> Self {
        Self {
            min: Position::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Position::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Creates a box centred on `center` extending `half` in each axis.
    #[must_use]
    pub fn around(center: Position, half: Position) -> Self {
        Self::new(
            center.offset(-half.x, -half.y, -half.z),
            center.offset(half.x, half.y, half.z),
        )
    }

    /// Whether the point lies inside the box.
    #[must_use]
    pub const fn contains(&self, p: Position) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Squared distance from the box surface to a point (0 when inside).
    #[must_use]
    pub const fn distance_squared_to(&self, p: Position) -> i64 {
        sum_of_squares(
            axis_gap(p.x, self.min.x, self.max.x),
            axis_gap(p.y, self.min.y, self.max.y),
            axis_gap(p.z, self.min.z, self.max.z),
        )
    }
}

const fn sum_of_squares(dx: i64, dy: i64, dz: i64) -> i64 {
    dx.saturating_mul(dx)
        .saturating_add(dy.saturating_mul(dy))
        .saturating_add(dz.saturating_mul(dz))
}

const fn axis_gap(v: i32, min: i32, max: i32) -> i64 {
    if v < min {
        min as i64 - v as i64
    } else if v > max {
        v as i64 - max as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_distance_squared() {
        let a = Position::new(0, 0, 0);
        let b = Position::new(3, 4, 0);
        assert_eq!(a.distance_squared(b), 25);
        assert_eq!(b.distance_squared(a), 25);
    }

    #[test]
    fn test_distance_squared_extremes_saturate() {
        let a = Position::new(i32::MIN, i32::MIN, i32::MIN);
        let b = Position::new(i32::MAX, 0, 0);
        assert_eq!(a.distance_squared(b), i64::MAX);

        let c = Position::new(i32::MAX, 0, 0);
        let d = Position::new(0, 0, 0);
        assert_eq!(c.distance_squared(d), i64::from(i32::MAX) * i64::from(i32::MAX));
    }

    #[test]
    fn test_aabb_normalises_corners() {
        let bounds = Aabb::new(Position::new(5, 5, 5), Position::new(-5, 0, 1));
        assert_eq!(bounds.min, Position::new(-5, 0, 1));
        assert_eq!(bounds.max, Position::new(5, 5, 5));
    }

    #[test]
    fn test_aabb_distance() {
        let bounds = Aabb::around(Position::ZERO, Position::new(10, 10, 10));

        assert!(bounds.contains(Position::new(10, -10, 0)));
        assert_eq!(bounds.distance_squared_to(Position::new(3, 3, 3)), 0);
        assert_eq!(bounds.distance_squared_to(Position::new(13, 0, 0)), 9);
        assert_eq!(bounds.distance_squared_to(Position::new(13, 14, 0)), 9 + 16);
    }

    fn position() -> impl Strategy<Value = Position> {
        (-100_000..100_000i32, -100_000..100_000i32, -100_000..100_000i32)
            .prop_map(|(x, y, z)| Position::new(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_distance_symmetric(a in position(), b in position()) {
            prop_assert_eq!(a.distance_squared(b), b.distance_squared(a));
            prop_assert_eq!(a.distance_squared(a), 0);
        }

        #[test]
        fn prop_aabb_distance_zero_iff_inside(
            center in position(),
            half in (0..500i32, 0..500i32, 0..500i32),
            p in position(),
        ) {
            let bounds = Aabb::around(center, Position::new(half.0, half.1, half.2));
            prop_assert_eq!(bounds.distance_squared_to(p) == 0, bounds.contains(p));
            prop_assert!(bounds.distance_squared_to(p) <= center.distance_squared(p));
        }
    }
}
