/// Decides when a loss counts as better than another.
///
/// Differences are rounded to a fixed number of decimals before comparison, so oracle noise
/// below that resolution never counts as progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    pub decimals: u32,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self { decimals: 3 }
    }
}

impl Tolerance {
    pub fn round(&self, value: f64) -> f64 {
        let scale = 10f64.powi(self.decimals as i32);
        (value * scale).round() / scale
    }

    /// True if `new` beats `old` by at least the rounding resolution.
    pub fn improves(&self, old: f64, new: f64) -> bool {
        self.round(old - new) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_resolution_gain_is_ignored() {
        let t = Tolerance::default();
        assert!(!t.improves(100.0, 99.9996));
        assert!(t.improves(100.0, 99.9994));
        assert!(!t.improves(100.0, 100.0));
        assert!(!t.improves(100.0, 100.5));
    }
}
