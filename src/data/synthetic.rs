//! Simulated field trials
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use serde::{Deserialize, Serialize};

use super::{
    DataError, Dataset, Observation, ObservationTable, Scaler, ScalingRecord,
};
use crate::consts::{DEFAULT_CROP, SOIL_VAR};
use crate::rng::RngKey;

/// Yield statistics of one simulated crop, in decitonnes per hectare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub name: String,
    pub yield_mean: f64,
    pub yield_std: f64,
    /// Correlation of yield with the soil rating
    pub soil_effect: f64,
}

impl CropProfile {
    pub fn new<S: Into<String>>(
        name: S,
        yield_mean: f64,
        yield_std: f64,
        soil_effect: f64,
    ) -> Self {
        CropProfile {
            name: name.into(),
            yield_mean,
            yield_std,
            soil_effect,
        }
    }
}

/// Shape of a simulated dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub n_train: usize,
    pub n_test: usize,
    pub n_regions: usize,
    /// Mean soil rating on the 0-100 scale
    pub soil_mean: f64,
    pub soil_std: f64,
    pub crops: Vec<CropProfile>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SyntheticConfig {
            n_train: 600,
            n_test: 150,
            n_regions: 30,
            soil_mean: 50.0,
            soil_std: 15.0,
            crops: vec![
                CropProfile::new(DEFAULT_CROP, 76.0, 12.0, 0.45),
                CropProfile::new("Wintergerste", 68.0, 11.0, 0.4),
            ],
        }
    }
}

/// A row in natural units before standardization
struct RawRow {
    crop: usize,
    region: usize,
    year: i32,
    soil: f64,
    yield_dt: f64,
}

impl SyntheticConfig {
    fn draw_rows<R: Rng>(
        &self,
        n: usize,
        region_offsets: &[f64],
        rng: &mut R,
    ) -> Vec<RawRow> {
        (0..n)
            .map(|i| {
                let crop = i % self.crops.len();
                let profile = &self.crops[crop];
                let region = rng.random_range(0..region_offsets.len());
                let z: f64 = StandardNormal.sample(rng);
                let soil = 0.8_f64
                    .mul_add(self.soil_std * z, self.soil_mean + region_offsets[region])
                    .clamp(7.0, 100.0);
                let soil_z = (soil - self.soil_mean) / self.soil_std;
                let eps: f64 = StandardNormal.sample(rng);
                let r = profile.soil_effect;
                let yield_dt = profile.yield_std.mul_add(
                    r.mul_add(soil_z, (1.0 - r * r).sqrt() * eps),
                    profile.yield_mean,
                );
                RawRow {
                    crop,
                    region,
                    year: 2010 + (i % 10) as i32,
                    soil,
                    yield_dt: yield_dt.max(1.0),
                }
            })
            .collect()
    }
}

fn standardize_rows(
    rows: &[RawRow],
    crops: &[CropProfile],
    soil: &Scaler,
    yields: &[Scaler],
) -> ObservationTable {
    rows.iter()
        .map(|row| Observation {
            crop: crops[row.crop].name.clone(),
            region: format!("DE{:03}", 111 + row.region),
            year: Some(row.year),
            soil_scaled: soil.standardize(row.soil),
            yield_scaled: yields[row.crop].standardize(row.yield_dt),
            covariates: Default::default(),
        })
        .collect()
}

impl Dataset {
    /// Simulate a dataset with the layout `load` produces. Scaling
    /// statistics are estimated on the training rows and applied to both
    /// tables.
    ///
    /// # Example
    ///
    /// ```
    /// use yieldreg::data::{Dataset, SyntheticConfig};
    /// use yieldreg::rng::RngKey;
    ///
    /// let data = Dataset::synthetic(&SyntheticConfig::default(), RngKey::new(1))
    ///     .unwrap();
    /// let wheat = data.train.filter_crop("Winterweizen");
    ///
    /// assert_eq!(wheat.len(), 300);
    /// assert!(data.scaling.yield_for("Winterweizen").is_ok());
    /// ```
    pub fn synthetic(
        config: &SyntheticConfig,
        key: RngKey,
    ) -> Result<Self, DataError> {
        let n_crops = config.crops.len();
        if n_crops == 0 || config.n_train < 2 * n_crops {
            return Err(DataError::TooFewRows { n: config.n_train });
        }
        let mut rng = key.rng();
        let region_sd = Normal::new(0.0, 0.5 * config.soil_std)
            .map_err(|_| DataError::Scaling(super::ScalingError::StdTooLow {
                std: config.soil_std,
            }))?;
        let region_offsets: Vec<f64> = (0..config.n_regions.max(1))
            .map(|_| region_sd.sample(&mut rng))
            .collect();

        let train = config.draw_rows(config.n_train, &region_offsets, &mut rng);
        let test = config.draw_rows(config.n_test, &region_offsets, &mut rng);

        let soil_values: Vec<f64> = train.iter().map(|row| row.soil).collect();
        let soil = Scaler::fit(&soil_values)?;
        let yields = (0..n_crops)
            .map(|crop| {
                let ys: Vec<f64> = train
                    .iter()
                    .filter(|row| row.crop == crop)
                    .map(|row| row.yield_dt)
                    .collect();
                Scaler::fit(&ys)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut scaling = ScalingRecord::new();
        scaling.insert(SOIL_VAR, soil);
        for (profile, scaler) in config.crops.iter().zip(&yields) {
            scaling.insert(&format!("{}_yield", profile.name), *scaler);
        }

        Ok(Dataset::new(
            standardize_rows(&train, &config.crops, &soil, &yields),
            standardize_rows(&test, &config.crops, &soil, &yields),
            scaling,
        ))
    }
}
