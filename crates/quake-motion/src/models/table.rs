//! Period-indexed coefficient tables.

/// Regression coefficients tabulated at ascending periods.
#[derive(Debug, Clone, Copy)]
pub struct CoefficientTable<const N: usize> {
    periods: &'static [f64],
    rows: &'static [[f64; N]],
}

impl<const N: usize> CoefficientTable<N> {
    /// Wrap a table; `periods` must be ascending and parallel to `rows`.
    pub const fn new(periods: &'static [f64], rows: &'static [[f64; N]]) -> Self {
        Self { periods, rows }
    }

    /// Whether `period` lies within the tabulated range.
    pub fn covers(&self, period: f64) -> bool {
        match (self.periods.first(), self.periods.last()) {
            (Some(&lo), Some(&hi)) => (lo..=hi).contains(&period),
            _ => false,
        }
    }

    /// Coefficients at `period`, linearly interpolated between neighbours.
    pub fn at(&self, period: f64) -> Option<[f64; N]> {
        if !self.covers(period) {
            return None;
        }
        let upper = self
            .periods
            .iter()
            .position(|&p| p >= period)
            .unwrap_or(self.periods.len() - 1);
        if upper == 0 || self.periods[upper].total_cmp(&period).is_eq() {
            return self.rows.get(upper).copied();
        }
        let (p0, p1) = (self.periods[upper - 1], self.periods[upper]);
        let t = (period - p0) / (p1 - p0);
        let (r0, r1) = (&self.rows[upper - 1], &self.rows[upper]);
        let mut out = [0.0; N];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = r0[i] + t * (r1[i] - r0[i]);
        }
        Some(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TABLE: CoefficientTable<2> =
        CoefficientTable::new(&[0.0, 0.5, 1.0], &[[0.0, 10.0], [1.0, 20.0], [3.0, 20.0]]);

    #[test]
    fn exact_periods_return_rows() {
        assert_eq!(TABLE.at(0.5).unwrap(), [1.0, 20.0]);
        assert_eq!(TABLE.at(0.0).unwrap(), [0.0, 10.0]);
    }

    #[test]
    fn tabulated_rows_are_returned_bit_for_bit() {
        const SIGMAS: CoefficientTable<1> =
            CoefficientTable::new(&[0.1, 0.2, 0.4, 1.0], &[[0.72], [0.71], [0.74], [0.80]]);
        for (period, sigma) in [(0.2, 0.71), (0.4, 0.74), (1.0, 0.80)] {
            assert_eq!(SIGMAS.at(period).unwrap()[0].to_bits(), f64::to_bits(sigma));
        }
    }

    #[test]
    fn interior_periods_interpolate() {
        let row = TABLE.at(0.75).unwrap();
        assert!((row[0] - 2.0).abs() < 1e-12);
        assert!((row[1] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_is_none() {
        assert!(TABLE.at(1.5).is_none());
        assert!(TABLE.at(-0.1).is_none());
    }
}
