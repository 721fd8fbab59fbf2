//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Evaluate a polynomial with ascending coefficients, i.e. `c[0] + c[1]*x +
/// c[2]*x^2 + ...`, using Horner's method.
pub fn poly_val<T>(value: T, coeffs: &[T]) -> T
where 
    T: Float
{
    coeffs.iter().rev().fold(T::zero(), |acc, c| acc * value + *c)
}

/// Evaluate the `order`-th derivative of a polynomial with ascending
/// coefficients.
pub fn poly_deriv_val<T>(value: T, coeffs: &[T], order: usize) -> T
where
    T: Float
{
    if order >= coeffs.len() {
        return T::zero();
    }

    let mut res = T::zero();

    for k in (order..coeffs.len()).rev() {
        let scale = T::from(falling_factorial(k, order)).unwrap_or_else(T::nan);
        res = res * value + coeffs[k] * scale;
    }

    res
}

/// Falling factorial `k * (k-1) * ... * (k-n+1)`, the factor applied to the
/// `x^k` coefficient when taking the `n`-th derivative.
pub fn falling_factorial(k: usize, n: usize) -> f64 {
    if n > k {
        return 0.0;
    }

    ((k - n + 1)..=k).fold(1.0, |acc, i| acc * i as f64)
}

/// Clamp a value between min and max. NaN values are passed through.
pub fn clamp<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    if value > max {
        max
    }
    else if value < min {
        min
    }
    else {
        value
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_poly_val() {
        // 1 + 2x + 3x^2
        let c = [1.0, 2.0, 3.0];

        assert_eq!(poly_val(0.0, &c), 1.0);
        assert_eq!(poly_val(2.0, &c), 17.0);
        assert_eq!(poly_val(2.0, &[] as &[f64]), 0.0);
    }

    #[test]
    fn test_poly_deriv_val() {
        // 1 + 2x + 3x^2 + 4x^3
        let c = [1.0, 2.0, 3.0, 4.0];

        assert_eq!(poly_deriv_val(2.0, &c, 0), poly_val(2.0, &c));
        // 2 + 6x + 12x^2
        assert_eq!(poly_deriv_val(2.0, &c, 1), 62.0);
        // 6 + 24x
        assert_eq!(poly_deriv_val(2.0, &c, 2), 54.0);
        assert_eq!(poly_deriv_val(2.0, &c, 3), 24.0);
        assert_eq!(poly_deriv_val(2.0, &c, 4), 0.0);
    }

    #[test]
    fn test_falling_factorial() {
        assert_eq!(falling_factorial(5, 0), 1.0);
        assert_eq!(falling_factorial(5, 3), 60.0);
        assert_eq!(falling_factorial(2, 3), 0.0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-1.5, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
        assert!(clamp(f64::NAN, 0.0, 1.0).is_nan());
    }
}
