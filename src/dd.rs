/// A double-double number: an unevaluated sum of a value and an error term,
/// giving roughly 106 bits of significand.
///
/// Matrix arithmetic accumulates in this type so that quantities entered with
/// extra precision (datum-shift rotations, unit conversion factors) survive
/// multiplication and inversion of the surrounding affine transforms.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DoubleDouble {
    value: f64,
    error: f64,
}

/// Error-free sum of two doubles (Knuth / Moller).
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let e = (a - (s - bb)) + (b - bb);
    (s, e)
}

/// Error-free sum assuming |a| >= |b|.
fn quick_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let e = b - (s - a);
    (s, e)
}

/// Error-free product via fused multiply-add.
fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let e = a.mul_add(b, -p);
    (p, e)
}

impl DoubleDouble {
    pub const ZERO: Self = Self {
        value: 0.0,
        error: 0.0,
    };

    pub const ONE: Self = Self {
        value: 1.0,
        error: 0.0,
    };

    /// π with its f64 representation error restored.
    pub const PI: Self = Self {
        value: std::f64::consts::PI,
        error: 1.224_646_799_147_353_2e-16,
    };

    pub fn new(value: f64, error: f64) -> Self {
        if !value.is_finite() {
            return Self { value, error: 0.0 };
        }
        let (value, error) = quick_two_sum(value, error);
        Self { value, error }
    }

    /// The sum `a + b` with the rounding error captured in the error term.
    pub fn from_sum(a: f64, b: f64) -> Self {
        let (value, error) = two_sum(a, b);
        Self::new(value, error)
    }

    /// The product `a * b` with the rounding error captured in the error term.
    pub fn from_product(a: f64, b: f64) -> Self {
        let (value, error) = two_prod(a, b);
        Self::new(value, error)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    /// Collapse to the nearest f64.
    pub fn to_f64(self) -> f64 {
        self.value + self.error
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0 && self.error == 0.0
    }

    pub fn abs(self) -> Self {
        if self.value.is_sign_negative() {
            -self
        } else {
            self
        }
    }

    pub fn add(self, other: Self) -> Self {
        let (s, e) = two_sum(self.value, other.value);
        Self::new(s, e + self.error + other.error)
    }

    pub fn sub(self, other: Self) -> Self {
        self.add(-other)
    }

    pub fn mul(self, other: Self) -> Self {
        let (p, e) = two_prod(self.value, other.value);
        Self::new(
            p,
            e + self.value * other.error + self.error * other.value,
        )
    }

    /// Long division: one refinement of the f64 quotient.
    pub fn div(self, other: Self) -> Self {
        let q1 = self.value / other.value;
        if !q1.is_finite() {
            return Self { value: q1, error: 0.0 };
        }
        // remainder r = self - other * q1, kept in double-double
        let prod = other.mul(Self { value: q1, error: 0.0 });
        let r = self.sub(prod);
        let q2 = r.to_f64() / other.value;
        let (value, error) = quick_two_sum(q1, q2);
        Self { value, error }
    }

    /// Fused multiply-add `self + a * b`, the inner loop of matrix products.
    pub fn mul_add_product(self, a: Self, b: Self) -> Self {
        self.add(a.mul(b))
    }
}

impl From<f64> for DoubleDouble {
    fn from(value: f64) -> Self {
        Self { value, error: 0.0 }
    }
}

impl std::ops::Neg for DoubleDouble {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            value: -self.value,
            error: -self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_keeps_small_term() {
        let tiny = 2f64.powi(-60);
        let dd = DoubleDouble::from(1.0).add(tiny.into());
        assert_eq!(dd.value(), 1.0);
        assert_eq!(dd.error(), tiny);
        // the term comes back out exactly
        let back = dd.sub(1.0.into());
        assert_eq!(back.to_f64(), tiny);
    }

    #[test]
    fn test_product_error_term() {
        // (1 + 2^-30)^2 = 1 + 2^-29 + 2^-60; the last term does not fit in f64
        let x = DoubleDouble::from_sum(1.0, 2f64.powi(-30));
        let sq = x.mul(x);
        assert_eq!(sq.value(), 1.0 + 2f64.powi(-29));
        assert_eq!(sq.error(), 2f64.powi(-60));
    }

    #[test]
    fn test_division_refines() {
        let x = DoubleDouble::from(1.0).div(3.0.into());
        let back = x.mul(3.0.into());
        assert_eq!(back.to_f64(), 1.0);
        assert!(back.sub(DoubleDouble::ONE).to_f64().abs() < 1e-31);
    }

    #[test]
    fn test_pi_constant() {
        // error term must actually extend the representation
        assert_ne!(DoubleDouble::PI.error(), 0.0);
        let circ = DoubleDouble::PI.div(648_000.0.into());
        // arc-second in radians, compared against the known decimal expansion
        approx::assert_relative_eq!(
            circ.value(),
            4.84813681109536e-6,
            max_relative = 1e-15
        );
    }
}
