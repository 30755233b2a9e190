/// A shape projected onto an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub min: f64,
    pub max: f64,
}

impl Projection {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn overlaps(&self, other: &Projection) -> bool {
        self.max > other.min && other.max > self.min
    }

    /// Length of the overlapping interval, or 0 when disjoint.
    pub fn overlap(&self, other: &Projection) -> f64 {
        if self.overlaps(other) {
            if self.max > other.max {
                other.max - self.min
            } else {
                self.max - other.min
            }
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_projection_overlap() {
        let a = Projection::new(0.0, 10.0);
        let b = Projection::new(7.0, 15.0);
        assert!(a.overlaps(&b));
        assert!((a.overlap(&b) - 3.0).abs() < EPSILON);
        assert!((b.overlap(&a) - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_projection_disjoint() {
        let a = Projection::new(0.0, 10.0);
        let touching = Projection::new(10.0, 12.0);
        assert!(!a.overlaps(&touching));
        assert_eq!(a.overlap(&touching), 0.0);
    }
}
