mod model;
use log::debug;

pub use crate::model::*;

use statrs::distribution::{ContinuousCDF, StudentsT};

// **** Internal helpers ****

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn check_same_length(cols: &[&[f64]]) -> Result<usize, StatsError> {
    let n = cols.first().map(|c| c.len()).unwrap_or(0);
    if n == 0 {
        return Err(StatsError::InsufficientData);
    }
    if cols.iter().any(|c| c.len() != n) {
        return Err(StatsError::DimensionMismatch);
    }
    Ok(n)
}

fn student_t(df: usize) -> Result<StudentsT, StatsError> {
    StudentsT::new(0.0, 1.0, df as f64).map_err(|_| StatsError::InsufficientData)
}

fn two_sided_p(t: f64, df: usize) -> Result<f64, StatsError> {
    if !t.is_finite() {
        return Ok(0.0);
    }
    let dist = student_t(df)?;
    Ok(2.0 * (1.0 - dist.cdf(t.abs())))
}

fn t_critical_95(df: usize) -> Result<f64, StatsError> {
    Ok(student_t(df)?.inverse_cdf(0.975))
}

/// Gauss-Jordan inversion with partial pivoting.
/// Pivots below a scale-relative threshold are treated as singular.
fn invert(mat: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, StatsError> {
    let k = mat.len();
    let mut a: Vec<Vec<f64>> = mat.to_vec();
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    let scale = mat
        .iter()
        .flat_map(|row| row.iter())
        .fold(1.0f64, |acc, v| acc.max(v.abs()));
    for col in 0..k {
        let mut pivot_row = col;
        for r in (col + 1)..k {
            if a[r][col].abs() > a[pivot_row][col].abs() {
                pivot_row = r;
            }
        }
        if a[pivot_row][col].abs() <= scale * 1e-12 {
            return Err(StatsError::SingularMatrix);
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);
        let p = a[col][col];
        for j in 0..k {
            a[col][j] /= p;
            inv[col][j] /= p;
        }
        for r in 0..k {
            if r == col {
                continue;
            }
            let f = a[r][col];
            if f == 0.0 {
                continue;
            }
            for j in 0..k {
                a[r][j] -= f * a[col][j];
                inv[r][j] -= f * inv[col][j];
            }
        }
    }
    Ok(inv)
}

// **** Public entry points ****

/// Least-squares line of `y` on `x`, with the usual descriptive statistics.
///
/// This is the closed-form moment solution; nothing iterative. The p-value of
/// the slope is two-sided against Student's t with `n - 2` degrees of freedom.
/// A perfect fit reports a p-value of 0 rather than dividing by a zero
/// residual variance.
pub fn simple_regression(x: &[f64], y: &[f64]) -> Result<SimpleRegression, StatsError> {
    let n = check_same_length(&[x, y])?;
    if n < 3 {
        return Err(StatsError::InsufficientData);
    }
    let x_bar = mean(x);
    let y_bar = mean(y);
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (xv, yv) in x.iter().zip(y.iter()) {
        let dx = xv - x_bar;
        let dy = yv - y_bar;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return Err(StatsError::ConstantInput);
    }
    let slope = sxy / sxx;
    let intercept = y_bar - slope * x_bar;
    let r = sxy / (sxx * syy).sqrt();
    let df = n - 2;
    let sse = (syy - slope * sxy).max(0.0);
    let std_err = (sse / df as f64 / sxx).sqrt();
    let (t, p_value) = if std_err > 0.0 {
        let t = slope / std_err;
        (t, two_sided_p(t, df)?)
    } else {
        (f64::INFINITY, 0.0)
    };
    debug!(
        "simple_regression: n: {:?} slope: {:?} t: {:?} p: {:?}",
        n, slope, t, p_value
    );
    Ok(SimpleRegression {
        slope,
        intercept,
        r,
        r_squared: r * r,
        p_value,
        std_err,
    })
}

/// Ordinary least squares of `y` on the given predictors, with an intercept.
///
/// Solves the normal equations directly, so the result is deterministic for a
/// fixed input. Coefficient inference (standard errors, t statistics, two-sided
/// p-values and 95% confidence bounds) uses Student's t with `n - k` degrees of
/// freedom. The intercept row is reported first under the name `const`.
///
/// Collinear predictors make the design matrix singular and fail the fit with
/// [StatsError::SingularMatrix].
pub fn fit_ols(y: &[f64], predictors: &[Predictor]) -> Result<OlsSummary, StatsError> {
    let mut cols: Vec<&[f64]> = vec![y];
    cols.extend(predictors.iter().map(|p| p.values.as_slice()));
    let n = check_same_length(&cols)?;
    let k = predictors.len() + 1;
    if n <= k {
        return Err(StatsError::InsufficientData);
    }

    // Rows of the design matrix: [1, x1, .., xp]
    let design: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut row = Vec::with_capacity(k);
            row.push(1.0);
            row.extend(predictors.iter().map(|p| p.values[i]));
            row
        })
        .collect();

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (ri, row) in design.iter().enumerate() {
        for i in 0..k {
            xty[i] += row[i] * y[ri];
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    let inv = invert(&xtx)?;
    let beta: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * xty[j]).sum())
        .collect();

    let mut sse = 0.0;
    for (ri, row) in design.iter().enumerate() {
        let fitted: f64 = row.iter().zip(beta.iter()).map(|(a, b)| a * b).sum();
        let e = y[ri] - fitted;
        sse += e * e;
    }
    let y_bar = mean(y);
    let sst: f64 = y.iter().map(|v| (v - y_bar) * (v - y_bar)).sum();
    if sst <= 0.0 {
        return Err(StatsError::ConstantInput);
    }
    let df = n - k;
    let s2 = sse / df as f64;
    let r_squared = 1.0 - sse / sst;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df as f64;
    let t_crit = t_critical_95(df)?;

    let mut coefficients: Vec<Coefficient> = Vec::with_capacity(k);
    for i in 0..k {
        let name = if i == 0 {
            "const".to_string()
        } else {
            predictors[i - 1].name.clone()
        };
        let std_err = (s2 * inv[i][i]).max(0.0).sqrt();
        let (t_value, p_value) = if std_err > 0.0 {
            let t = beta[i] / std_err;
            (t, two_sided_p(t, df)?)
        } else {
            (f64::INFINITY, 0.0)
        };
        let half = t_crit * std_err;
        coefficients.push(Coefficient {
            name,
            estimate: beta[i],
            std_err,
            t_value,
            p_value,
            conf_low: beta[i] - half,
            conf_high: beta[i] + half,
        });
    }
    debug!(
        "fit_ols: n: {:?} k: {:?} sse: {:?} r_squared: {:?}",
        n, k, sse, r_squared
    );
    Ok(OlsSummary {
        n,
        k,
        r_squared,
        adj_r_squared,
        coefficients,
    })
}

/// Variance inflation factor of every covariate, from one auxiliary
/// regression of that covariate on all the others (intercept included).
///
/// A covariate orthogonal to the rest gets a factor of 1; perfect
/// collinearity that survives the auxiliary fit reports infinity.
pub fn variance_inflation_factors(predictors: &[Predictor]) -> Result<Vec<Vif>, StatsError> {
    let mut res: Vec<Vif> = Vec::with_capacity(predictors.len());
    for (i, p) in predictors.iter().enumerate() {
        let others: Vec<Predictor> = predictors
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, q)| q.clone())
            .collect();
        let value = if others.is_empty() {
            1.0
        } else {
            let aux = fit_ols(&p.values, &others)?;
            let denom = 1.0 - aux.r_squared;
            if denom <= f64::EPSILON {
                f64::INFINITY
            } else {
                (1.0 / denom).max(1.0)
            }
        };
        res.push(Vif {
            name: p.name.clone(),
            value,
        });
    }
    Ok(res)
}

/// Pearson correlation matrix over the given series.
/// Symmetric, with an exact unit diagonal.
pub fn correlation_matrix(series: &[Predictor]) -> Result<CorrelationMatrix, StatsError> {
    if series.is_empty() {
        return Err(StatsError::InsufficientData);
    }
    let cols: Vec<&[f64]> = series.iter().map(|p| p.values.as_slice()).collect();
    let n = check_same_length(&cols)?;
    if n < 2 {
        return Err(StatsError::InsufficientData);
    }
    let m = series.len();
    let means: Vec<f64> = cols.iter().map(|c| mean(c)).collect();
    let variances: Vec<f64> = cols
        .iter()
        .zip(means.iter())
        .map(|(c, mu)| c.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>())
        .collect();
    if variances.iter().any(|v| *v <= 0.0) {
        return Err(StatsError::ConstantInput);
    }

    let mut values = vec![0.0; m * m];
    for i in 0..m {
        values[i * m + i] = 1.0;
        for j in (i + 1)..m {
            let mut cov = 0.0;
            for ri in 0..n {
                cov += (cols[i][ri] - means[i]) * (cols[j][ri] - means[j]);
            }
            let r = cov / (variances[i] * variances[j]).sqrt();
            values[i * m + j] = r;
            values[j * m + i] = r;
        }
    }
    let names: Vec<String> = series.iter().map(|p| p.name.clone()).collect();
    Ok(CorrelationMatrix::from_rows(names, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {} within {} of {}",
            actual,
            tol,
            expected
        );
    }

    #[test]
    fn simple_regression_known_values() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let fit = simple_regression(&x, &y).unwrap();
        assert_close(fit.slope, 0.6, 1e-12);
        assert_close(fit.intercept, 2.2, 1e-12);
        assert_close(fit.r, 0.7745966692, 1e-9);
        assert_close(fit.r_squared, 0.6, 1e-12);
        assert_close(fit.std_err, 0.2828427125, 1e-9);
        assert_close(fit.p_value, 0.1241, 1e-3);
    }

    #[test]
    fn simple_regression_perfect_fit() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let fit = simple_regression(&x, &y).unwrap();
        assert_close(fit.slope, 2.0, 1e-12);
        assert_close(fit.intercept, 1.0, 1e-12);
        assert_close(fit.r_squared, 1.0, 1e-12);
        assert_eq!(fit.p_value, 0.0);
        assert_eq!(fit.std_err, 0.0);
    }

    #[test]
    fn simple_regression_rejects_constant_input() {
        let x = [2.0, 2.0, 2.0, 2.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(
            simple_regression(&x, &y).unwrap_err(),
            StatsError::ConstantInput
        );
    }

    #[test]
    fn simple_regression_needs_three_points() {
        assert_eq!(
            simple_regression(&[1.0, 2.0], &[1.0, 2.0]).unwrap_err(),
            StatsError::InsufficientData
        );
    }

    #[test]
    fn ols_recovers_exact_coefficients() {
        // y = 1 + 2 x1 + 3 x2, no noise
        let x1 = Predictor::new("x1", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let x2 = Predictor::new("x2", &[1.0, 0.0, 2.0, 1.0, 3.0, 2.0]);
        let y = [6.0, 5.0, 13.0, 12.0, 20.0, 19.0];
        let fit = fit_ols(&y, &[x1, x2]).unwrap();
        assert_eq!(fit.n, 6);
        assert_eq!(fit.k, 3);
        assert_close(fit.coefficients[0].estimate, 1.0, 1e-9);
        assert_close(fit.coefficients[1].estimate, 2.0, 1e-9);
        assert_close(fit.coefficients[2].estimate, 3.0, 1e-9);
        assert_close(fit.r_squared, 1.0, 1e-9);
        assert_eq!(fit.coefficients[1].p_value, 0.0);
    }

    #[test]
    fn ols_single_predictor_matches_simple_regression() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let simple = simple_regression(&x, &y).unwrap();
        let fit = fit_ols(&y, &[Predictor::new("x", &x)]).unwrap();
        let slope = &fit.coefficients[1];
        assert_close(slope.estimate, simple.slope, 1e-9);
        assert_close(fit.coefficients[0].estimate, simple.intercept, 1e-9);
        assert_close(slope.std_err, simple.std_err, 1e-9);
        assert_close(slope.p_value, simple.p_value, 1e-9);
        assert_close(fit.r_squared, simple.r_squared, 1e-9);
        // t_0.975 at 3 degrees of freedom is 3.18245
        assert_close(slope.conf_low, 0.6 - 3.18245 * simple.std_err, 1e-3);
        assert_close(slope.conf_high, 0.6 + 3.18245 * simple.std_err, 1e-3);
    }

    #[test]
    fn ols_coefficient_table_is_consistent() {
        let x1 = Predictor::new("x1", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let x2 = Predictor::new("x2", &[2.0, 1.0, 4.0, 3.0, 6.0, 5.0, 8.0, 7.0]);
        let y = [3.1, 4.2, 8.9, 9.8, 14.7, 15.1, 21.2, 20.4];
        let fit = fit_ols(&y, &[x1, x2]).unwrap();
        for c in fit.coefficients.iter() {
            assert!(c.std_err > 0.0);
            assert_close(c.t_value, c.estimate / c.std_err, 1e-9);
            assert!(c.p_value > 0.0 && c.p_value < 1.0);
            assert!(c.conf_low < c.estimate && c.estimate < c.conf_high);
        }
        assert!(fit.r_squared > 0.9);
        assert!(fit.adj_r_squared <= fit.r_squared);
    }

    #[test]
    fn ols_detects_singular_design() {
        let x1 = Predictor::new("x1", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let x2 = Predictor::new("x2", &[2.0, 4.0, 6.0, 8.0, 10.0]);
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        assert_eq!(
            fit_ols(&y, &[x1, x2]).unwrap_err(),
            StatsError::SingularMatrix
        );
    }

    #[test]
    fn ols_is_deterministic() {
        let x1 = Predictor::new("x1", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let x2 = Predictor::new("x2", &[1.0, 0.0, 2.0, 1.0, 3.0, 2.0]);
        let y = [6.1, 4.9, 13.2, 11.8, 20.3, 18.7];
        let a = fit_ols(&y, &[x1.clone(), x2.clone()]).unwrap();
        let b = fit_ols(&y, &[x1, x2]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn vif_orthogonal_covariates_are_one() {
        let x1 = Predictor::new("x1", &[1.0, -1.0, 1.0, -1.0]);
        let x2 = Predictor::new("x2", &[1.0, 1.0, -1.0, -1.0]);
        let vifs = variance_inflation_factors(&[x1, x2]).unwrap();
        assert_close(vifs[0].value, 1.0, 1e-9);
        assert_close(vifs[1].value, 1.0, 1e-9);
    }

    #[test]
    fn vif_is_at_least_one() {
        let x1 = Predictor::new("x1", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let x2 = Predictor::new("x2", &[2.0, 4.0, 5.0, 8.0, 9.0]);
        let x3 = Predictor::new("x3", &[1.0, 0.0, 2.0, 1.0, 0.0]);
        let vifs = variance_inflation_factors(&[x1, x2, x3]).unwrap();
        for v in vifs.iter() {
            assert!(v.value >= 1.0, "VIF for {} was {}", v.name, v.value);
        }
        // x1 and x2 track each other closely
        assert!(vifs[0].value > 2.0);
    }

    #[test]
    fn vif_single_covariate_is_one() {
        let x1 = Predictor::new("x1", &[1.0, 2.0, 3.0]);
        let vifs = variance_inflation_factors(&[x1]).unwrap();
        assert_eq!(vifs[0].value, 1.0);
    }

    #[test]
    fn correlation_matrix_symmetric_unit_diagonal() {
        let a = Predictor::new("a", &[1.0, 2.0, 3.0, 4.0]);
        let b = Predictor::new("b", &[2.0, 1.0, 4.0, 3.0]);
        let c = Predictor::new("c", &[4.0, 3.0, 2.0, 1.0]);
        let m = correlation_matrix(&[a, b, c]).unwrap();
        assert_eq!(m.len(), 3);
        for i in 0..3 {
            assert_eq!(m.get(i, i), 1.0);
            for j in 0..3 {
                assert_close(m.get(i, j), m.get(j, i), 1e-15);
                assert!(m.get(i, j) >= -1.0 - 1e-12 && m.get(i, j) <= 1.0 + 1e-12);
            }
        }
    }

    #[test]
    fn correlation_matrix_exact_extremes() {
        let a = Predictor::new("a", &[1.0, 2.0, 3.0]);
        let b = Predictor::new("b", &[2.0, 4.0, 6.0]);
        let c = Predictor::new("c", &[3.0, 2.0, 1.0]);
        let m = correlation_matrix(&[a, b, c]).unwrap();
        assert_close(m.get(0, 1), 1.0, 1e-12);
        assert_close(m.get(0, 2), -1.0, 1e-12);
        assert_close(m.get(1, 2), -1.0, 1e-12);
    }

    #[test]
    fn correlation_matrix_rejects_constant_series() {
        let a = Predictor::new("a", &[1.0, 2.0, 3.0]);
        let b = Predictor::new("b", &[5.0, 5.0, 5.0]);
        assert_eq!(
            correlation_matrix(&[a, b]).unwrap_err(),
            StatsError::ConstantInput
        );
    }
}
