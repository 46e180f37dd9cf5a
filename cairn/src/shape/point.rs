use serde::{Deserialize, Serialize};

use super::{check_dimension, Region, EPSILON};

/// An n-dimensional point.
///
/// Equality is tolerant: two points are equal when every coordinate pair
/// differs by at most [`EPSILON`](super::EPSILON). Because that relation is
/// not transitive, `Point` deliberately implements neither `Eq` nor `Hash`.
///
/// # Examples
///
/// ```rust,ignore
/// use cairn::shape::Point;
///
/// let p = Point::new(vec![1.0, 2.0]);
/// assert_eq!(p.dimension(), 2);
/// assert_eq!(p.area(), 0.0);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Point {
    coords: Vec<f64>,
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.coords.len() == other.coords.len()
            && self
                .coords
                .iter()
                .zip(&other.coords)
                .all(|(a, b)| (a - b).abs() <= EPSILON)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Point(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

impl Point {
    /// Creates a point from its coordinate vector.
    pub fn new(coords: Vec<f64>) -> Point {
        Point { coords }
    }

    /// Returns the coordinate vector.
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Returns the coordinate on the given axis.
    ///
    /// # Panics
    ///
    /// Panics if `axis >= self.dimension()`.
    pub fn coord(&self, axis: usize) -> f64 {
        self.coords[axis]
    }

    /// Returns the dimensionality of this point.
    pub fn dimension(&self) -> usize {
        self.coords.len()
    }

    /// Returns the minimum bounding region: a degenerate region with both
    /// corners at this point.
    pub fn mbr(&self) -> Region {
        Region::from_point(self)
    }

    /// Returns the area covered by a point, which is always 0.
    pub fn area(&self) -> f64 {
        0.0
    }

    /// Returns the center of this point, which is the point itself.
    pub fn center(&self) -> Point {
        self.clone()
    }

    /// Returns the Euclidean distance to another point.
    ///
    /// # Panics
    ///
    /// Panics if the points have different dimensions.
    pub fn min_distance_point(&self, other: &Point) -> f64 {
        check_dimension(self.dimension(), other.dimension());
        self.coords
            .iter()
            .zip(&other.coords)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Returns the minimum distance from this point to a region; 0 when
    /// the region contains the point.
    ///
    /// # Panics
    ///
    /// Panics if the shapes have different dimensions.
    pub fn min_distance_region(&self, region: &Region) -> f64 {
        region.min_distance_point(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let p = Point::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(p.coords(), &[1.0, 2.0, 3.0]);
        assert_eq!(p.dimension(), 3);
        assert_eq!(p.coord(1), 2.0);
    }

    #[test]
    fn test_equality_within_epsilon() {
        let p = Point::new(vec![1.0, 2.0]);
        let same = Point::new(vec![1.0 + EPSILON / 2.0, 2.0 - EPSILON / 2.0]);
        let different = Point::new(vec![1.0 + 1.0e-6, 2.0]);

        assert_eq!(p, same);
        assert_ne!(p, different);
    }

    #[test]
    fn test_equality_requires_same_dimension() {
        let p2 = Point::new(vec![1.0, 2.0]);
        let p3 = Point::new(vec![1.0, 2.0, 3.0]);
        assert_ne!(p2, p3);
    }

    #[test]
    fn test_min_distance_point() {
        let a = Point::new(vec![0.0, 0.0]);
        let b = Point::new(vec![3.0, 4.0]);
        assert_eq!(a.min_distance_point(&b), 5.0);
        assert_eq!(b.min_distance_point(&a), 5.0);
        assert_eq!(a.min_distance_point(&a), 0.0);
    }

    #[test]
    fn test_center_is_self() {
        let p = Point::new(vec![7.0, 8.0]);
        assert_eq!(p.center(), p);
    }

    #[test]
    fn test_serde_round_trip() {
        let p = Point::new(vec![1.5, -2.5]);
        let json = serde_json::to_string(&p).unwrap();
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    #[should_panic(expected = "Dimension mismatch")]
    fn test_min_distance_dimension_mismatch() {
        let a = Point::new(vec![0.0, 0.0]);
        let b = Point::new(vec![0.0, 0.0, 0.0]);
        a.min_distance_point(&b);
    }
}
