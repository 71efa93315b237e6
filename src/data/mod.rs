//! Observation tables and the statistics that standardize them
mod observation;
mod scaling;
mod synthetic;

pub use observation::{
    Observation, ObservationTable, INTERCEPT, SOIL_COLUMN, YIELD_COLUMN,
};
pub use scaling::{Scaler, ScalerParameters, ScalingError, ScalingRecord};
pub use synthetic::{CropProfile, SyntheticConfig};

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

/// Training table file name inside a data directory
pub const TRAIN_FILE: &str = "train.csv";
/// Test table file name inside a data directory
pub const TEST_FILE: &str = "test.csv";
/// Scaling statistics file name inside a data directory
pub const SCALING_FILE: &str = "scaling.json";

#[derive(Debug)]
pub enum DataError {
    /// A file could not be opened, read or written
    Io {
        path: Option<PathBuf>,
        source: std::io::Error,
    },
    /// A CSV table is malformed
    Csv(csv::Error),
    /// The scaling record is malformed
    Json(serde_json::Error),
    /// A required numeric column is absent
    MissingColumn { column: String },
    /// A numeric value is infinite or NaN
    NonFinite { row: usize, column: String },
    /// The training table has no rows of the crop
    EmptyCrop { crop: String },
    /// Too few rows to estimate the scaling statistics
    TooFewRows { n: usize },
    /// Statistics estimated from the data are invalid
    Scaling(ScalingError),
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Scaling(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path: Some(path),
                source,
            } => write!(f, "{}: {source}", path.display()),
            Self::Io { path: None, source } => write!(f, "{source}"),
            Self::Csv(err) => write!(f, "malformed table: {err}"),
            Self::Json(err) => write!(f, "malformed scaling record: {err}"),
            Self::MissingColumn { column } => {
                write!(f, "no numeric column '{column}'")
            }
            Self::NonFinite { row, column } => {
                write!(f, "non-finite '{column}' in row {row}")
            }
            Self::EmptyCrop { crop } => {
                write!(f, "no training rows for crop '{crop}'")
            }
            Self::TooFewRows { n } => {
                write!(f, "{n} rows are too few to standardize")
            }
            Self::Scaling(err) => write!(f, "{err}"),
        }
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::Csv(err)
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Json(err)
    }
}

impl From<ScalingError> for DataError {
    fn from(err: ScalingError) -> Self {
        DataError::Scaling(err)
    }
}

fn open(path: &Path) -> Result<BufReader<File>, DataError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| DataError::Io {
            path: Some(path.to_owned()),
            source,
        })
}

fn create(path: &Path) -> Result<File, DataError> {
    File::create(path).map_err(|source| DataError::Io {
        path: Some(path.to_owned()),
        source,
    })
}

/// Training and test observations with their categorical levels and the
/// statistics used to standardize them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub train: ObservationTable,
    pub test: ObservationTable,
    /// Sorted distinct crops over both tables
    pub crops: Vec<String>,
    /// Sorted distinct NUTS3 regions over both tables
    pub regions: Vec<String>,
    pub scaling: ScalingRecord,
}

impl Dataset {
    /// Assemble a dataset, deriving the crop and region levels
    pub fn new(
        train: ObservationTable,
        test: ObservationTable,
        scaling: ScalingRecord,
    ) -> Self {
        let crops = observation::levels(
            train.iter().chain(test.iter()).map(|obs| obs.crop.as_str()),
        );
        let regions = observation::levels(
            train
                .iter()
                .chain(test.iter())
                .map(|obs| obs.region.as_str()),
        );
        Dataset {
            train,
            test,
            crops,
            regions,
            scaling,
        }
    }

    /// Read `train.csv`, `test.csv` and `scaling.json` from `dir`
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, DataError> {
        let dir = dir.as_ref();
        let train = ObservationTable::from_csv(open(&dir.join(TRAIN_FILE))?)?;
        let test = ObservationTable::from_csv(open(&dir.join(TEST_FILE))?)?;
        let scaling = ScalingRecord::from_json(open(&dir.join(SCALING_FILE))?)?;
        info!(
            "loaded {} training and {} test rows from {}",
            train.len(),
            test.len(),
            dir.display()
        );
        Ok(Dataset::new(train, test, scaling))
    }

    /// Write the three files `load` reads, creating `dir` if needed
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<(), DataError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| DataError::Io {
            path: Some(dir.to_owned()),
            source,
        })?;
        self.train.to_csv(create(&dir.join(TRAIN_FILE))?)?;
        self.test.to_csv(create(&dir.join(TEST_FILE))?)?;
        serde_json::to_writer_pretty(
            create(&dir.join(SCALING_FILE))?,
            &self.scaling,
        )?;
        Ok(())
    }

    /// Training rows of one crop, erroring when there are none
    pub fn train_crop(&self, crop: &str) -> Result<ObservationTable, DataError> {
        let table = self.train.filter_crop(crop);
        if table.is_empty() {
            Err(DataError::EmptyCrop {
                crop: crop.to_owned(),
            })
        } else {
            Ok(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngKey;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("yieldreg-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn save_then_load() {
        let config = SyntheticConfig {
            n_train: 40,
            n_test: 10,
            ..SyntheticConfig::default()
        };
        let data = Dataset::synthetic(&config, RngKey::new(7)).unwrap();
        let dir = scratch_dir("save-load");
        data.save(&dir).unwrap();

        let back = Dataset::load(&dir).unwrap();
        assert_eq!(back.crops, data.crops);
        assert_eq!(back.regions, data.regions);
        assert_eq!(back.scaling, data.scaling);
        assert_eq!(back.train.len(), data.train.len());
        for (a, b) in back.train.soil().iter().zip(data.train.soil()) {
            assert::close(*a, b, 1E-12);
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_files_name_the_path() {
        let dir = scratch_dir("missing");
        let err = Dataset::load(&dir).unwrap_err();
        match err {
            DataError::Io {
                path: Some(path), ..
            } => assert!(path.ends_with(TRAIN_FILE)),
            other => panic!("unexpected error: {other}"),
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn absent_crop_is_an_error() {
        let data =
            Dataset::synthetic(&SyntheticConfig::default(), RngKey::new(0))
                .unwrap();
        assert!(data.train_crop("Winterweizen").is_ok());
        assert!(matches!(
            data.train_crop("Roggen"),
            Err(DataError::EmptyCrop { .. })
        ));
    }
}
