// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// A named column of observations, one value per district.
///
/// All the entry points of this crate take their data as slices of
/// predictors so that callers decide the column order once.
#[derive(PartialEq, Debug, Clone)]
pub struct Predictor {
    pub name: String,
    pub values: Vec<f64>,
}

impl Predictor {
    pub fn new(name: &str, values: &[f64]) -> Predictor {
        Predictor {
            name: name.to_string(),
            values: values.to_vec(),
        }
    }
}

// ******** Output data structures *********

/// Outcome of an ordinary least-squares fit of a single predictor.
#[derive(PartialEq, Debug, Clone)]
pub struct SimpleRegression {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation between the predictor and the response.
    pub r: f64,
    pub r_squared: f64,
    /// Two-sided p-value of the slope (Student's t, n - 2 degrees of freedom).
    pub p_value: f64,
    /// Standard error of the slope.
    pub std_err: f64,
}

/// One row of the coefficient table of a multiple regression.
#[derive(PartialEq, Debug, Clone)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_err: f64,
    pub t_value: f64,
    pub p_value: f64,
    /// Bounds of the 95% confidence interval.
    pub conf_low: f64,
    pub conf_high: f64,
}

/// Full summary of a multiple regression with intercept.
#[derive(PartialEq, Debug, Clone)]
pub struct OlsSummary {
    /// Number of observations.
    pub n: usize,
    /// Number of fitted coefficients, intercept included.
    pub k: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    /// The intercept row comes first, then the predictors in input order.
    pub coefficients: Vec<Coefficient>,
}

/// Variance inflation factor of one covariate against the others.
#[derive(PartialEq, Debug, Clone)]
pub struct Vif {
    pub name: String,
    pub value: f64,
}

/// Symmetric Pearson correlation matrix with unit diagonal.
#[derive(PartialEq, Debug, Clone)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    // Row-major, names.len() x names.len().
    values: Vec<f64>,
}

impl CorrelationMatrix {
    pub(crate) fn from_rows(names: Vec<String>, values: Vec<f64>) -> CorrelationMatrix {
        assert_eq!(values.len(), names.len() * names.len());
        CorrelationMatrix { names, values }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.names.len() + col]
    }
}

/// Errors that prevent a statistic from being computed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StatsError {
    /// Fewer observations than the model has degrees of freedom.
    InsufficientData,
    /// The input columns do not all have the same length.
    DimensionMismatch,
    /// A column with zero variance where variation is required.
    ConstantInput,
    /// The design matrix cannot be inverted (collinear covariates).
    SingularMatrix,
}

impl Error for StatsError {}

impl Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            StatsError::InsufficientData => "not enough observations for the model",
            StatsError::DimensionMismatch => "input columns have different lengths",
            StatsError::ConstantInput => "a column has zero variance",
            StatsError::SingularMatrix => "singular design matrix",
        };
        write!(f, "{}", msg)
    }
}
