//! Geometric primitives for spatial indexing.
//!
//! Shapes are immutable n-dimensional values. Two kinds exist:
//! - [`Point`]: a coordinate vector
//! - [`Region`]: an axis-aligned bounding box given by low/high corners
//!
//! All pairwise operations require both operands to share one dimension;
//! mixing dimensions is a contract violation and panics. Recoverable
//! dimension checking happens at the index boundary, not here.

mod point;
mod region;

pub use point::Point;
pub use region::Region;

use serde::{Deserialize, Serialize};

/// Tolerance used for `touches` proximity checks and `Point` equality.
///
/// Equality of `Region` values is exact and does not use this constant.
pub const EPSILON: f64 = 1.192_092_896e-07;

pub(crate) fn check_dimension(a: usize, b: usize) {
    assert_eq!(a, b, "Dimension mismatch: {} vs {}", a, b);
}

/// A geometric value, either a point or an axis-aligned region.
///
/// Every combination of the two kinds is supported by the pairwise
/// operations below, so there is no "unsupported combination" failure mode.
///
/// # Examples
///
/// ```rust,ignore
/// use cairn::shape::{Point, Region, Shape};
///
/// let query = Shape::from(Region::new(vec![0.0, 0.0], vec![10.0, 10.0]));
/// let data = Shape::from(Point::new(vec![5.0, 5.0]));
/// assert!(query.contains(&data));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point(Point),
    Region(Region),
}

impl Shape {
    /// Returns the dimensionality of this shape.
    pub fn dimension(&self) -> usize {
        match self {
            Shape::Point(p) => p.dimension(),
            Shape::Region(r) => r.dimension(),
        }
    }

    /// Returns the minimum bounding region: the region itself, or a
    /// degenerate region for a point.
    pub fn mbr(&self) -> Region {
        match self {
            Shape::Point(p) => p.mbr(),
            Shape::Region(r) => r.clone(),
        }
    }

    /// Returns the area covered by this shape; always 0 for a point.
    pub fn area(&self) -> f64 {
        match self {
            Shape::Point(_) => 0.0,
            Shape::Region(r) => r.area(),
        }
    }

    /// Returns the center of this shape.
    pub fn center(&self) -> Point {
        match self {
            Shape::Point(p) => p.clone(),
            Shape::Region(r) => r.center(),
        }
    }

    /// Checks whether this shape intersects `other`. Two points intersect
    /// when they are equal within [`EPSILON`].
    ///
    /// # Panics
    ///
    /// Panics if the shapes have different dimensions.
    pub fn intersects(&self, other: &Shape) -> bool {
        check_dimension(self.dimension(), other.dimension());
        match (self, other) {
            (Shape::Region(a), Shape::Region(b)) => a.intersects_region(b),
            (Shape::Region(r), Shape::Point(p)) | (Shape::Point(p), Shape::Region(r)) => {
                r.contains_point(p)
            }
            (Shape::Point(a), Shape::Point(b)) => a == b,
        }
    }

    /// Checks whether this shape fully contains `other`. A point contains
    /// nothing, not even an equal point.
    ///
    /// # Panics
    ///
    /// Panics if the shapes have different dimensions.
    pub fn contains(&self, other: &Shape) -> bool {
        check_dimension(self.dimension(), other.dimension());
        match (self, other) {
            (Shape::Region(a), Shape::Region(b)) => a.contains_region(b),
            (Shape::Region(r), Shape::Point(p)) => r.contains_point(p),
            (Shape::Point(_), _) => false,
        }
    }

    /// Checks whether this shape touches `other` within [`EPSILON`].
    ///
    /// # Panics
    ///
    /// Panics if the shapes have different dimensions.
    pub fn touches(&self, other: &Shape) -> bool {
        check_dimension(self.dimension(), other.dimension());
        match (self, other) {
            (Shape::Region(a), Shape::Region(b)) => a.touches_region(b),
            (Shape::Region(r), Shape::Point(p)) | (Shape::Point(p), Shape::Region(r)) => {
                r.touches_point(p)
            }
            (Shape::Point(a), Shape::Point(b)) => a == b,
        }
    }

    /// Returns the minimum Euclidean distance between this shape and
    /// `other`; 0 when they intersect.
    ///
    /// # Panics
    ///
    /// Panics if the shapes have different dimensions.
    pub fn min_distance(&self, other: &Shape) -> f64 {
        check_dimension(self.dimension(), other.dimension());
        match (self, other) {
            (Shape::Point(a), Shape::Point(b)) => a.min_distance_point(b),
            (Shape::Region(a), Shape::Region(b)) => a.min_distance_region(b),
            (Shape::Region(r), Shape::Point(p)) | (Shape::Point(p), Shape::Region(r)) => {
                r.min_distance_point(p)
            }
        }
    }
}

impl From<Point> for Shape {
    fn from(p: Point) -> Self {
        Shape::Point(p)
    }
}

impl From<Region> for Shape {
    fn from(r: Region) -> Self {
        Shape::Region(r)
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Point(p) => write!(f, "{}", p),
            Shape::Region(r) => write!(f, "{}", r),
        }
    }
}
