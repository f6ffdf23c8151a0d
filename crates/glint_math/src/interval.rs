/// Closed span `[min, max]` along one axis or along a ray.
///
/// `min > max` marks an empty span; [`Interval::EMPTY`] is the identity for
/// [`Interval::include`] and [`Interval::surrounding`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Extent of the span. Negative when empty.
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, x: f32) -> bool {
        (self.min..=self.max).contains(&x)
    }

    /// Smallest span covering `self` and `x`.
    pub fn include(&self, x: f32) -> Interval {
        Interval::new(self.min.min(x), self.max.max(x))
    }

    /// Smallest span covering both `a` and `b`.
    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_from_empty() {
        let span = [3.0, -1.0, 2.5]
            .into_iter()
            .fold(Interval::EMPTY, |acc, x| acc.include(x));
        assert_eq!(span, Interval::new(-1.0, 3.0));
        assert_eq!(span.size(), 4.0);
    }

    #[test]
    fn test_empty_span() {
        assert!(Interval::EMPTY.is_empty());
        assert!(!Interval::EMPTY.contains(0.0));
        assert!(!Interval::new(0.0, 0.0).is_empty());
    }

    #[test]
    fn test_closed_bounds() {
        let t = Interval::new(0.001, 100.0);
        assert!(t.contains(0.001));
        assert!(t.contains(100.0));
        assert!(!t.contains(0.0));
    }

    #[test]
    fn test_surrounding_ignores_empty() {
        let a = Interval::new(-2.0, 1.0);
        assert_eq!(Interval::surrounding(&a, &Interval::EMPTY), a);
        let b = Interval::new(0.5, 4.0);
        assert_eq!(Interval::surrounding(&a, &b), Interval::new(-2.0, 4.0));
    }
}
