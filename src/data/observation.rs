//! Field observations and tables of them
use std::collections::BTreeMap;
use std::io::Read;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::DataError;

/// Column holding the standardized soil rating
pub const SOIL_COLUMN: &str = "bodenzahl_scaled";
/// Column holding the standardized yield
pub const YIELD_COLUMN: &str = "yield_scaled";
/// Pseudo column of ones for design matrices
pub const INTERCEPT: &str = "intercept";

/// One field-crop-year record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub crop: String,
    /// NUTS3 region identifier
    #[serde(default, alias = "nuts3", alias = "NUTS_ID")]
    pub region: String,
    #[serde(default)]
    pub year: Option<i32>,
    /// Standardized soil rating
    #[serde(rename = "bodenzahl_scaled")]
    pub soil_scaled: f64,
    /// Standardized yield
    pub yield_scaled: f64,
    /// Further numeric columns, available to design matrices
    #[serde(skip)]
    pub covariates: BTreeMap<String, f64>,
}

impl Observation {
    /// The value of a numeric column
    pub fn value(&self, column: &str) -> Option<f64> {
        match column {
            SOIL_COLUMN => Some(self.soil_scaled),
            YIELD_COLUMN => Some(self.yield_scaled),
            INTERCEPT => Some(1.0),
            _ => self.covariates.get(column).copied(),
        }
    }
}

/// Observations in file order
///
/// # Example
///
/// ```
/// use yieldreg::data::ObservationTable;
///
/// let csv = "\
/// crop,region,bodenzahl_scaled,yield_scaled
/// Winterweizen,DE111,0.5,0.7
/// Silomais,DE111,0.5,-0.2
/// Winterweizen,DE112,-1.0,-0.9
/// ";
/// let table = ObservationTable::from_csv(csv.as_bytes()).unwrap();
/// let wheat = table.filter_crop("Winterweizen");
///
/// assert_eq!(wheat.len(), 2);
/// assert_eq!(wheat.soil(), vec![0.5, -1.0]);
/// assert_eq!(wheat.yields(), vec![0.7, -0.9]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationTable {
    rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(rows: Vec<Observation>) -> Self {
        ObservationTable { rows }
    }

    /// Parse a headed CSV table. Columns beyond the known ones are kept as
    /// covariates when every value parses as a number.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        let extra: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !is_known_column(h))
            .map(|(ix, h)| (ix, h.to_owned()))
            .collect();

        let mut rows = Vec::new();
        let mut numeric = vec![true; extra.len()];
        for (ix, record) in reader.records().enumerate() {
            let record = record?;
            let mut obs: Observation = record.deserialize(Some(&headers))?;
            check_finite(ix, SOIL_COLUMN, obs.soil_scaled)?;
            check_finite(ix, YIELD_COLUMN, obs.yield_scaled)?;
            for ((col, name), is_numeric) in extra.iter().zip(numeric.iter_mut())
            {
                match record.get(*col).map(|s| s.trim().parse::<f64>()) {
                    Some(Ok(x)) if *is_numeric => {
                        obs.covariates.insert(name.clone(), x);
                    }
                    _ => *is_numeric = false,
                }
            }
            rows.push(obs);
        }

        // a column with any non-numeric entry is not a covariate
        for ((_, name), is_numeric) in extra.iter().zip(&numeric) {
            if !is_numeric {
                rows.iter_mut().for_each(|obs| {
                    obs.covariates.remove(name);
                });
            }
        }
        Ok(ObservationTable { rows })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> + '_ {
        self.rows.iter()
    }

    /// The rows of one crop
    pub fn filter_crop(&self, crop: &str) -> ObservationTable {
        let rows = self
            .rows
            .iter()
            .filter(|obs| obs.crop == crop)
            .cloned()
            .collect();
        ObservationTable { rows }
    }

    /// Standardized soil ratings
    pub fn soil(&self) -> Vec<f64> {
        self.rows.iter().map(|obs| obs.soil_scaled).collect()
    }

    /// Standardized yields
    pub fn yields(&self) -> Vec<f64> {
        self.rows.iter().map(|obs| obs.yield_scaled).collect()
    }

    /// Values of a numeric column
    pub fn column(&self, name: &str) -> Result<Vec<f64>, DataError> {
        self.rows
            .iter()
            .map(|obs| {
                obs.value(name).ok_or_else(|| DataError::MissingColumn {
                    column: name.to_owned(),
                })
            })
            .collect()
    }

    /// The `n x k` matrix of the named columns, one row per observation
    pub fn design_matrix(
        &self,
        columns: &[&str],
    ) -> Result<DMatrix<f64>, DataError> {
        let cols = columns
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let nrows = self.rows.len();
        Ok(DMatrix::from_fn(nrows, cols.len(), |i, j| cols[j][i]))
    }

    /// Sorted distinct crops
    pub fn crops(&self) -> Vec<String> {
        levels(self.rows.iter().map(|obs| obs.crop.as_str()))
    }

    /// Sorted distinct regions
    pub fn regions(&self) -> Vec<String> {
        levels(self.rows.iter().map(|obs| obs.region.as_str()))
    }

    /// Write as headed CSV
    pub fn to_csv<W: std::io::Write>(&self, writer: W) -> Result<(), DataError> {
        let mut writer = csv::Writer::from_writer(writer);
        for obs in &self.rows {
            writer.serialize(obs)?;
        }
        writer.flush().map_err(|source| DataError::Io {
            path: None,
            source,
        })?;
        Ok(())
    }
}

impl FromIterator<Observation> for ObservationTable {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        ObservationTable {
            rows: iter.into_iter().collect(),
        }
    }
}

fn is_known_column(name: &str) -> bool {
    matches!(
        name,
        "crop" | "region" | "nuts3" | "NUTS_ID" | "year" | SOIL_COLUMN
            | YIELD_COLUMN
    )
}

fn check_finite(row: usize, column: &str, x: f64) -> Result<(), DataError> {
    if x.is_finite() {
        Ok(())
    } else {
        Err(DataError::NonFinite {
            row,
            column: column.to_owned(),
        })
    }
}

pub(crate) fn levels<'a, I: Iterator<Item = &'a str>>(names: I) -> Vec<String> {
    let mut levels: Vec<String> = names
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    levels.sort_unstable();
    levels.dedup();
    levels
}
