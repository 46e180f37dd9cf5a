use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::{check_dimension, Point, EPSILON};

/// An axis-aligned n-dimensional bounding box given by low/high corners.
///
/// `low[i] <= high[i]` is expected on every axis but is not enforced at
/// construction; degenerate (zero-extent) and inverted regions are
/// representable, and the merge helpers treat inverted regions as empty.
///
/// Unlike [`Point`](super::Point), equality is exact over the raw
/// coordinates, and hashing follows it bit for bit. [`EPSILON`] plays a
/// role only in the `touches` proximity checks.
///
/// # Examples
///
/// ```rust,ignore
/// use cairn::shape::Region;
///
/// let a = Region::new(vec![0.0, 0.0], vec![10.0, 10.0]);
/// let b = Region::new(vec![5.0, 5.0], vec![15.0, 15.0]);
/// assert!(a.intersects_region(&b));
/// assert_eq!(a.intersecting_area(&b), 25.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    low: Vec<f64>,
    high: Vec<f64>,
}

impl Eq for Region {}

impl Hash for Region {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for c in &self.low {
            c.to_bits().hash(state);
        }
        for c in &self.high {
            c.to_bits().hash(state);
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let join = |coords: &[f64]| {
            coords
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "Region([{}], [{}])", join(&self.low), join(&self.high))
    }
}

impl Region {
    /// Creates a region from its corner vectors.
    ///
    /// # Panics
    ///
    /// Panics if `low` and `high` have different lengths.
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Region {
        check_dimension(low.len(), high.len());
        Region { low, high }
    }

    /// Creates a degenerate region with both corners at `point`.
    pub fn from_point(point: &Point) -> Region {
        Region {
            low: point.coords().to_vec(),
            high: point.coords().to_vec(),
        }
    }

    /// Creates a region covering all of n-dimensional space.
    pub fn infinite(dimension: usize) -> Region {
        Region {
            low: vec![f64::NEG_INFINITY; dimension],
            high: vec![f64::INFINITY; dimension],
        }
    }

    /// Creates an inverted region that acts as the identity for
    /// [`combine`](Region::combine): merging anything into it yields that
    /// shape's bounds unchanged.
    pub fn empty(dimension: usize) -> Region {
        Region {
            low: vec![f64::INFINITY; dimension],
            high: vec![f64::NEG_INFINITY; dimension],
        }
    }

    /// Returns the low corner.
    pub fn low(&self) -> &[f64] {
        &self.low
    }

    /// Returns the high corner.
    pub fn high(&self) -> &[f64] {
        &self.high
    }

    /// Returns the dimensionality of this region.
    pub fn dimension(&self) -> usize {
        self.low.len()
    }

    /// Returns the minimum bounding region, which is the region itself.
    pub fn mbr(&self) -> Region {
        self.clone()
    }

    /// Returns the area (n-dimensional volume) of this region.
    pub fn area(&self) -> f64 {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(l, h)| h - l)
            .product()
    }

    /// Returns the center point of this region.
    pub fn center(&self) -> Point {
        Point::new(
            self.low
                .iter()
                .zip(&self.high)
                .map(|(l, h)| (l + h) / 2.0)
                .collect(),
        )
    }

    /// Returns the margin `2^(d-1) * sum(high[i] - low[i])`, the
    /// perimeter proxy used by split heuristics.
    pub fn margin(&self) -> f64 {
        let mul = 2f64.powi(self.dimension() as i32 - 1);
        self.low
            .iter()
            .zip(&self.high)
            .map(|(l, h)| h - l)
            .sum::<f64>()
            * mul
    }

    /// Checks whether this region intersects another, boundaries included.
    ///
    /// # Panics
    ///
    /// Panics if the regions have different dimensions.
    pub fn intersects_region(&self, other: &Region) -> bool {
        check_dimension(self.dimension(), other.dimension());
        for i in 0..self.low.len() {
            if self.low[i] > other.high[i] || self.high[i] < other.low[i] {
                return false;
            }
        }
        true
    }

    /// Checks whether this region fully contains another, boundaries
    /// included.
    ///
    /// # Panics
    ///
    /// Panics if the regions have different dimensions.
    pub fn contains_region(&self, other: &Region) -> bool {
        check_dimension(self.dimension(), other.dimension());
        for i in 0..self.low.len() {
            if self.low[i] > other.low[i] || self.high[i] < other.high[i] {
                return false;
            }
        }
        true
    }

    /// Checks whether this region touches another: some axis has a low or
    /// high coordinate within [`EPSILON`] of the other's.
    ///
    /// # Panics
    ///
    /// Panics if the regions have different dimensions.
    pub fn touches_region(&self, other: &Region) -> bool {
        check_dimension(self.dimension(), other.dimension());
        for i in 0..self.low.len() {
            if (self.low[i] - other.low[i]).abs() < EPSILON
                || (self.high[i] - other.high[i]).abs() < EPSILON
            {
                return true;
            }
        }
        false
    }

    /// Checks whether this region contains a point, boundaries included.
    ///
    /// # Panics
    ///
    /// Panics if the shapes have different dimensions.
    pub fn contains_point(&self, point: &Point) -> bool {
        check_dimension(self.dimension(), point.dimension());
        for i in 0..self.low.len() {
            if self.low[i] > point.coord(i) || self.high[i] < point.coord(i) {
                return false;
            }
        }
        true
    }

    /// Checks whether a point lies within [`EPSILON`] of this region's low
    /// or high coordinate on some axis.
    ///
    /// # Panics
    ///
    /// Panics if the shapes have different dimensions.
    pub fn touches_point(&self, point: &Point) -> bool {
        check_dimension(self.dimension(), point.dimension());
        for i in 0..self.low.len() {
            if (self.low[i] - point.coord(i)).abs() < EPSILON
                || (self.high[i] - point.coord(i)).abs() < EPSILON
            {
                return true;
            }
        }
        false
    }

    /// Returns the minimum distance between this region and another; 0
    /// when they intersect.
    ///
    /// # Panics
    ///
    /// Panics if the regions have different dimensions.
    pub fn min_distance_region(&self, other: &Region) -> f64 {
        check_dimension(self.dimension(), other.dimension());
        let mut total = 0.0;
        for i in 0..self.low.len() {
            let gap = if other.high[i] < self.low[i] {
                self.low[i] - other.high[i]
            } else if self.high[i] < other.low[i] {
                other.low[i] - self.high[i]
            } else {
                0.0
            };
            total += gap * gap;
        }
        total.sqrt()
    }

    /// Returns the minimum distance from this region to a point; 0 when
    /// the region contains the point.
    ///
    /// # Panics
    ///
    /// Panics if the shapes have different dimensions.
    pub fn min_distance_point(&self, point: &Point) -> f64 {
        check_dimension(self.dimension(), point.dimension());
        let mut total = 0.0;
        for i in 0..self.low.len() {
            let c = point.coord(i);
            if c < self.low[i] {
                total += (self.low[i] - c) * (self.low[i] - c);
            } else if c > self.high[i] {
                total += (c - self.high[i]) * (c - self.high[i]);
            }
        }
        total.sqrt()
    }

    /// Returns the area of the overlap with another region, 0 when they
    /// are disjoint.
    ///
    /// # Panics
    ///
    /// Panics if the regions have different dimensions.
    pub fn intersecting_area(&self, other: &Region) -> f64 {
        check_dimension(self.dimension(), other.dimension());
        let mut area = 1.0;
        for i in 0..self.low.len() {
            if self.low[i] > other.high[i] || self.high[i] < other.low[i] {
                return 0.0;
            }
            area *= self.high[i].min(other.high[i]) - self.low[i].max(other.low[i]);
        }
        area
    }

    /// Returns the minimal region covering both this region and another.
    ///
    /// # Panics
    ///
    /// Panics if the regions have different dimensions.
    pub fn combined(&self, other: &Region) -> Region {
        let mut combined = self.clone();
        combined.combine(other);
        combined
    }

    /// Expands this region in place to cover another.
    ///
    /// # Panics
    ///
    /// Panics if the regions have different dimensions.
    pub fn combine(&mut self, other: &Region) {
        check_dimension(self.dimension(), other.dimension());
        for i in 0..self.low.len() {
            self.low[i] = self.low[i].min(other.low[i]);
            self.high[i] = self.high[i].max(other.high[i]);
        }
    }

    /// Returns the minimal region covering every region in `regions`.
    ///
    /// # Panics
    ///
    /// Panics if `regions` is empty or its members have mixed dimensions.
    pub fn combined_all(regions: &[Region]) -> Region {
        let (first, rest) = regions
            .split_first()
            .expect("combined_all requires at least one region");
        let mut combined = first.clone();
        for r in rest {
            combined.combine(r);
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn region(low: &[f64], high: &[f64]) -> Region {
        Region::new(low.to_vec(), high.to_vec())
    }

    fn random_region(rng: &mut StdRng) -> Region {
        let a: (f64, f64) = (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        let b: (f64, f64) = (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        region(
            &[a.0.min(b.0), a.1.min(b.1)],
            &[a.0.max(b.0), a.1.max(b.1)],
        )
    }

    #[test]
    fn test_new() {
        let r = region(&[1.0, 2.0], &[3.0, 4.0]);
        assert_eq!(r.low(), &[1.0, 2.0]);
        assert_eq!(r.high(), &[3.0, 4.0]);
        assert_eq!(r.dimension(), 2);
    }

    #[test]
    fn test_area_and_margin() {
        let r = region(&[0.0, 0.0], &[4.0, 3.0]);
        assert_eq!(r.area(), 12.0);
        // 2^(2-1) * (4 + 3)
        assert_eq!(r.margin(), 14.0);

        let cube = region(&[0.0, 0.0, 0.0], &[2.0, 2.0, 2.0]);
        assert_eq!(cube.area(), 8.0);
        // 2^(3-1) * (2 + 2 + 2)
        assert_eq!(cube.margin(), 24.0);
    }

    #[test]
    fn test_center() {
        let r = region(&[0.0, 0.0], &[10.0, 4.0]);
        assert_eq!(r.center(), Point::new(vec![5.0, 2.0]));
    }

    #[test]
    fn test_intersects_region() {
        let a = region(&[0.0, 0.0], &[10.0, 10.0]);
        let overlapping = region(&[5.0, 5.0], &[15.0, 15.0]);
        let disjoint = region(&[20.0, 20.0], &[30.0, 30.0]);
        let edge = region(&[10.0, 0.0], &[20.0, 10.0]);

        assert!(a.intersects_region(&overlapping));
        assert!(!a.intersects_region(&disjoint));
        assert!(a.intersects_region(&edge));
    }

    #[test]
    fn test_contains_region() {
        let outer = region(&[0.0, 0.0], &[10.0, 10.0]);
        let inner = region(&[2.0, 2.0], &[8.0, 8.0]);
        let straddling = region(&[8.0, 8.0], &[12.0, 12.0]);

        assert!(outer.contains_region(&inner));
        assert!(!inner.contains_region(&outer));
        assert!(!outer.contains_region(&straddling));
        assert!(outer.contains_region(&outer));
    }

    #[test]
    fn test_touches_region() {
        let a = region(&[0.0, 0.0], &[10.0, 10.0]);
        let shared_low = region(&[0.0, 20.0], &[5.0, 30.0]);
        let near_high = region(&[-5.0, -5.0], &[10.0 + EPSILON / 2.0, -1.0]);
        let unrelated = region(&[1.0, 1.0], &[2.0, 2.0]);

        assert!(a.touches_region(&shared_low));
        assert!(a.touches_region(&near_high));
        assert!(!a.touches_region(&unrelated));
    }

    #[test]
    fn test_contains_and_touches_point() {
        let r = region(&[0.0, 0.0], &[10.0, 10.0]);

        assert!(r.contains_point(&Point::new(vec![5.0, 5.0])));
        assert!(r.contains_point(&Point::new(vec![0.0, 10.0])));
        assert!(!r.contains_point(&Point::new(vec![5.0, 10.1])));

        assert!(r.touches_point(&Point::new(vec![10.0, 5.0])));
        assert!(r.touches_point(&Point::new(vec![0.0, 5.0])));
        assert!(!r.touches_point(&Point::new(vec![5.0, 5.0])));
    }

    #[test]
    fn test_min_distance_region() {
        let a = region(&[0.0, 0.0], &[2.0, 2.0]);
        let right = region(&[5.0, 0.0], &[6.0, 2.0]);
        let diagonal = region(&[5.0, 6.0], &[7.0, 8.0]);

        assert_eq!(a.min_distance_region(&right), 3.0);
        assert_eq!(a.min_distance_region(&diagonal), 5.0);
        assert_eq!(a.min_distance_region(&a), 0.0);
    }

    #[test]
    fn test_min_distance_point() {
        let r = region(&[0.0, 0.0], &[2.0, 2.0]);
        assert_eq!(r.min_distance_point(&Point::new(vec![5.0, 6.0])), 5.0);
        assert_eq!(r.min_distance_point(&Point::new(vec![1.0, 1.0])), 0.0);
    }

    #[test]
    fn test_intersecting_area() {
        let a = region(&[0.0, 0.0], &[10.0, 10.0]);
        let b = region(&[5.0, 5.0], &[15.0, 15.0]);
        let disjoint = region(&[20.0, 20.0], &[30.0, 30.0]);

        assert_eq!(a.intersecting_area(&b), 25.0);
        assert_eq!(b.intersecting_area(&a), 25.0);
        assert_eq!(a.intersecting_area(&disjoint), 0.0);
        assert_eq!(a.intersecting_area(&a), 100.0);
    }

    #[test]
    fn test_combined_and_combine() {
        let a = region(&[0.0, 0.0], &[5.0, 5.0]);
        let b = region(&[3.0, -2.0], &[8.0, 4.0]);

        let c = a.combined(&b);
        assert_eq!(c, region(&[0.0, -2.0], &[8.0, 5.0]));

        let mut d = a.clone();
        d.combine(&b);
        assert_eq!(d, c);
    }

    #[test]
    fn test_combined_all() {
        let regions = vec![
            region(&[0.0, 0.0], &[1.0, 1.0]),
            region(&[5.0, 5.0], &[6.0, 6.0]),
            region(&[-3.0, 2.0], &[0.0, 4.0]),
        ];
        let all = Region::combined_all(&regions);
        assert_eq!(all, region(&[-3.0, 0.0], &[6.0, 6.0]));
        for r in &regions {
            assert!(all.contains_region(r));
        }
    }

    #[test]
    fn test_empty_is_combine_identity() {
        let mut acc = Region::empty(2);
        acc.combine(&region(&[2.0, 3.0], &[4.0, 5.0]));
        assert_eq!(acc, region(&[2.0, 3.0], &[4.0, 5.0]));
    }

    #[test]
    fn test_infinite_contains_everything() {
        let inf = Region::infinite(2);
        assert!(inf.contains_region(&region(&[-1.0e12, -1.0e12], &[1.0e12, 1.0e12])));
        assert!(inf.contains_point(&Point::new(vec![f64::MAX, f64::MIN])));
    }

    #[test]
    fn test_degenerate_region_from_point() {
        let p = Point::new(vec![3.0, 4.0]);
        let r = Region::from_point(&p);
        assert!(r.contains_point(&p));
        assert_eq!(r.area(), 0.0);
    }

    #[test]
    fn test_equality_is_exact() {
        let a = region(&[0.0, 0.0], &[1.0, 1.0]);
        let nudged = region(&[0.0, 0.0], &[1.0 + EPSILON / 2.0, 1.0]);
        assert_ne!(a, nudged);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_hash_follows_equality() {
        let mut set = HashSet::new();
        set.insert(region(&[0.0, 0.0], &[1.0, 1.0]));
        set.insert(region(&[0.0, 0.0], &[1.0, 1.0]));
        set.insert(region(&[0.0, 0.0], &[2.0, 1.0]));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&region(&[0.0, 0.0], &[1.0, 1.0])));
    }

    #[test]
    fn test_region_algebra_laws() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let a = random_region(&mut rng);
            let b = random_region(&mut rng);

            assert_eq!(a.intersects_region(&b), b.intersects_region(&a));

            let combined = a.combined(&b);
            assert!(combined.contains_region(&a));
            assert!(combined.contains_region(&b));

            if !a.intersects_region(&b) {
                assert_eq!(a.intersecting_area(&b), 0.0);
            }
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let r = region(&[0.5, -1.5], &[2.5, 3.5]);
        let json = serde_json::to_string(&r).unwrap();
        let back: Region = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }

    #[test]
    #[should_panic(expected = "Dimension mismatch")]
    fn test_corner_length_mismatch() {
        Region::new(vec![0.0, 0.0], vec![1.0]);
    }
}
