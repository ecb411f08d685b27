use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

/// Population mean and standard deviation (divides by `n`, not `n - 1`).
pub fn population_moments(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().mean();
    let std_dev = if values.len() == 1 {
        0.0
    } else {
        values.iter().population_std_dev()
    };
    if !mean.is_finite() || !std_dev.is_finite() {
        return None;
    }
    Some((mean, std_dev))
}

/// Pearson correlation of two equally long series.
///
/// Returns `None` when either side has zero variance or the lengths differ,
/// i.e. whenever the coefficient is undefined.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;
    let mut sum_xy = 0.0;
    for (xv, yv) in x.iter().zip(y.iter()) {
        if !xv.is_finite() || !yv.is_finite() {
            return None;
        }
        sum_x += *xv;
        sum_y += *yv;
        sum_xx += xv * xv;
        sum_yy += yv * yv;
        sum_xy += xv * yv;
    }
    let denom_x = n * sum_xx - sum_x * sum_x;
    let denom_y = n * sum_yy - sum_y * sum_y;
    if denom_x <= 0.0 || denom_y <= 0.0 {
        return None;
    }
    let r = (n * sum_xy - sum_x * sum_y) / (denom_x * denom_y).sqrt();
    if !r.is_finite() {
        return None;
    }
    Some(r.clamp(-1.0, 1.0))
}

/// Two-sided standard-normal quantile: `alpha = 0.05` gives ~1.96.
pub fn z_value_for_alpha(alpha: f64) -> Option<f64> {
    if !(0.0 < alpha && alpha < 1.0) {
        return None;
    }
    let normal = Normal::new(0.0, 1.0).ok()?;
    let target = (1.0 - alpha / 2.0).clamp(0.0, 1.0);
    Some(normal.inverse_cdf(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_moments_divide_by_n() {
        let (mean, std_dev) = population_moments(&[0.0, 0.0, 10.0, -10.0]).expect("moments");
        assert!(mean.abs() < 1e-12);
        // sqrt((0 + 0 + 100 + 100) / 4)
        assert!((std_dev - 50.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn single_value_has_zero_spread() {
        assert_eq!(population_moments(&[3.5]), Some((3.5, 0.0)));
        assert_eq!(population_moments(&[]), None);
    }

    #[test]
    fn pearson_detects_perfect_linear_relationships() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
        let neg: Vec<f64> = x.iter().map(|v| -0.5 * v).collect();
        assert!((pearson(&x, &y).expect("r") - 1.0).abs() < 1e-9);
        assert!((pearson(&x, &neg).expect("r") + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_is_undefined_for_flat_or_mismatched_series() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn z_value_for_five_percent_is_one_point_nine_six() {
        let z = z_value_for_alpha(0.05).expect("z");
        assert!((z - 1.959_964).abs() < 1e-5);
        assert_eq!(z_value_for_alpha(0.0), None);
        assert_eq!(z_value_for_alpha(1.5), None);
    }
}
