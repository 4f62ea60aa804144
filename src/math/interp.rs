use nalgebra::{DMatrix, DVector};

// ---------------------------------------------------------------------------
// Piecewise-linear table lookup
// ---------------------------------------------------------------------------

/// Piecewise-linear interpolation over a sorted set of (x, y) points.
/// Values outside the table are clamped to the end points.
#[derive(Debug, Clone, Default)]
pub struct LinearInterpolator {
    points: Vec<(f64, f64)>,
}

impl LinearInterpolator {
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.retain(|(x, y)| x.is_finite() && y.is_finite());
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        points.dedup_by(|a, b| a.0 == b.0);
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn x_min(&self) -> Option<f64> {
        self.points.first().map(|p| p.0)
    }

    pub fn x_max(&self) -> Option<f64> {
        self.points.last().map(|p| p.0)
    }

    pub fn value(&self, x: f64) -> f64 {
        match self.segment(x) {
            Segment::Empty => 0.0,
            Segment::Below(y) | Segment::Above(y) => y,
            Segment::Inside((x0, y0), (x1, y1)) => y0 + (y1 - y0) * (x - x0) / (x1 - x0),
        }
    }

    /// Slope of the segment containing `x`. At a knot the segment to the
    /// right is used; outside the table the slope is zero.
    pub fn slope(&self, x: f64) -> f64 {
        match self.segment(x) {
            Segment::Inside((x0, y0), (x1, y1)) => (y1 - y0) / (x1 - x0),
            _ => 0.0,
        }
    }

    fn segment(&self, x: f64) -> Segment {
        let n = self.points.len();
        if n == 0 {
            return Segment::Empty;
        }
        if x < self.points[0].0 || n == 1 {
            return Segment::Below(self.points[0].1);
        }
        if x >= self.points[n - 1].0 {
            return Segment::Above(self.points[n - 1].1);
        }
        // first index whose x is strictly greater than the query
        let hi = self.points.partition_point(|p| p.0 <= x);
        Segment::Inside(self.points[hi - 1], self.points[hi])
    }
}

enum Segment {
    Empty,
    Below(f64),
    Above(f64),
    Inside((f64, f64), (f64, f64)),
}

// ---------------------------------------------------------------------------
// Boundary-matched polynomial interpolation
// ---------------------------------------------------------------------------

/// Polynomial interpolator defined by value/derivative constraints.
///
/// `constraints[d]` lists the x positions at which the d-th derivative is
/// prescribed. The polynomial degree is one less than the total number of
/// constraints, and the constraint matrix is inverted once at construction;
/// [`interpolate`](Self::interpolate) then maps the prescribed values (in the
/// same order as the positions) to coefficients, lowest power first.
#[derive(Debug, Clone)]
pub struct PolyInterpolator {
    inverse: DMatrix<f64>,
}

impl PolyInterpolator {
    /// Returns `None` if the constraints do not determine a unique polynomial.
    pub fn new(constraints: &[&[f64]]) -> Option<Self> {
        let n: usize = constraints.iter().map(|c| c.len()).sum();
        if n == 0 {
            return None;
        }
        let mut matrix = DMatrix::<f64>::zeros(n, n);
        let mut row = 0;
        for (order, xs) in constraints.iter().enumerate() {
            for &x in xs.iter() {
                for power in order..n {
                    // d^order/dx^order of x^power
                    let factor: f64 = ((power - order + 1)..=power).map(|k| k as f64).product();
                    matrix[(row, power)] = factor * x.powi((power - order) as i32);
                }
                row += 1;
            }
        }
        matrix.try_inverse().map(|inverse| Self { inverse })
    }

    pub fn order(&self) -> usize {
        self.inverse.nrows()
    }

    /// Polynomial coefficients (lowest power first) for the given constraint
    /// values. Missing trailing values are treated as zero.
    pub fn interpolate(&self, values: &[f64]) -> Vec<f64> {
        let n = self.order();
        let rhs = DVector::from_iterator(n, (0..n).map(|i| values.get(i).copied().unwrap_or(0.0)));
        (&self.inverse * rhs).iter().copied().collect()
    }

    /// Evaluate a polynomial with coefficients ordered lowest power first.
    pub fn eval(x: f64, coefficients: &[f64]) -> f64 {
        coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    /// First derivative of a polynomial with coefficients lowest power first.
    pub fn eval_derivative(x: f64, coefficients: &[f64]) -> f64 {
        coefficients
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0, |acc, (i, c)| acc * x + i as f64 * c)
    }
}
