//! Standardization statistics
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::consts::SOIL_VAR;

/// Mean and standard deviation of one variable in natural units
///
/// # Example
///
/// ```
/// use yieldreg::data::Scaler;
///
/// let soil = Scaler::new(48.0, 14.0).unwrap();
/// let z = soil.standardize(62.0);
///
/// assert!((z - 1.0).abs() < 1E-12);
/// assert!((soil.destandardize(z) - 62.0).abs() < 1E-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalerParameters", into = "ScalerParameters")]
pub struct Scaler {
    mean: f64,
    std: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScalerParameters {
    pub mean: f64,
    pub std: f64,
}

impl TryFrom<ScalerParameters> for Scaler {
    type Error = ScalingError;

    fn try_from(params: ScalerParameters) -> Result<Self, Self::Error> {
        Scaler::new(params.mean, params.std)
    }
}

impl From<Scaler> for ScalerParameters {
    fn from(scaler: Scaler) -> Self {
        ScalerParameters {
            mean: scaler.mean,
            std: scaler.std,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScalingError {
    /// The scaling record has no entry for the key
    MissingKey { key: String },
    /// The mean is infinite or NaN
    MeanNotFinite { mean: f64 },
    /// The standard deviation is less than or equal to zero
    StdTooLow { std: f64 },
    /// The standard deviation is infinite or NaN
    StdNotFinite { std: f64 },
}

impl std::error::Error for ScalingError {}

impl fmt::Display for ScalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey { key } => {
                write!(f, "no scaling statistic named '{key}'")
            }
            Self::MeanNotFinite { mean } => {
                write!(f, "non-finite mean: {mean}")
            }
            Self::StdTooLow { std } => {
                write!(f, "std ({std}) must be greater than zero")
            }
            Self::StdNotFinite { std } => {
                write!(f, "non-finite std: {std}")
            }
        }
    }
}

impl Scaler {
    pub fn new(mean: f64, std: f64) -> Result<Self, ScalingError> {
        if !mean.is_finite() {
            Err(ScalingError::MeanNotFinite { mean })
        } else if std <= 0.0 {
            Err(ScalingError::StdTooLow { std })
        } else if !std.is_finite() {
            Err(ScalingError::StdNotFinite { std })
        } else {
            Ok(Scaler { mean, std })
        }
    }

    /// Estimate the statistics of `xs` with the sample (n - 1) variance
    pub fn fit(xs: &[f64]) -> Result<Self, ScalingError> {
        let mean = crate::diagnostics::mean(xs);
        let std = crate::diagnostics::var_ddof(xs, 1).sqrt();
        Scaler::new(mean, std)
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    pub fn std(&self) -> f64 {
        self.std
    }

    /// Map a natural-unit value to standard units
    #[inline]
    pub fn standardize(&self, x: f64) -> f64 {
        (x - self.mean) / self.std
    }

    /// Map a standardized value back to natural units
    #[inline]
    pub fn destandardize(&self, z: f64) -> f64 {
        z.mul_add(self.std, self.mean)
    }
}

/// Per-variable statistics keyed `{var}_mean` and `{var}_std`, e.g.
/// `bodenzahl_mean` or `Winterweizen_yield_std`
///
/// # Example
///
/// ```
/// use yieldreg::data::ScalingRecord;
///
/// let json = r#"{
///     "bodenzahl_mean": 48.5, "bodenzahl_std": 13.9,
///     "Winterweizen_yield_mean": 76.2, "Winterweizen_yield_std": 11.4
/// }"#;
/// let record = ScalingRecord::from_json(json.as_bytes()).unwrap();
///
/// assert_eq!(record.soil().unwrap().mean(), 48.5);
/// assert_eq!(record.yield_for("Winterweizen").unwrap().std(), 11.4);
/// assert!(record.yield_for("Silomais").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScalingRecord(BTreeMap<String, f64>);

impl ScalingRecord {
    pub fn new() -> Self {
        ScalingRecord::default()
    }

    pub fn from_json<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    pub fn get(&self, key: &str) -> Result<f64, ScalingError> {
        self.0
            .get(key)
            .copied()
            .ok_or_else(|| ScalingError::MissingKey {
                key: key.to_owned(),
            })
    }

    /// The scaler of variable `var`
    pub fn scaler(&self, var: &str) -> Result<Scaler, ScalingError> {
        let mean = self.get(&format!("{var}_mean"))?;
        let std = self.get(&format!("{var}_std"))?;
        Scaler::new(mean, std)
    }

    /// Record the statistics of variable `var`
    pub fn insert(&mut self, var: &str, scaler: Scaler) {
        self.0.insert(format!("{var}_mean"), scaler.mean());
        self.0.insert(format!("{var}_std"), scaler.std());
    }

    /// Scaler of the soil rating
    pub fn soil(&self) -> Result<Scaler, ScalingError> {
        self.scaler(SOIL_VAR)
    }

    /// Scaler of the yield of `crop`, in decitonnes per hectare
    pub fn yield_for(&self, crop: &str) -> Result<Scaler, ScalingError> {
        self.scaler(&format!("{crop}_yield"))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }
}
