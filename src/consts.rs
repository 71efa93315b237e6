//! Mathematical constants and the fixed settings of the soil/yield analysis

/// 0.5 ln(2π)
pub const HALF_LN_2PI: f64 = 0.918_938_533_204_672_7;
/// ln(π)
pub const LN_PI: f64 = 1.144_729_885_849_400_2;

/// Degrees of freedom of the Student's t likelihood in the truncated model
pub const STUDENT_T_DF: f64 = 5.0;

/// Prior widths of `beta` compared in the prior-sensitivity analysis
pub const PRIOR_WIDTHS: [f64; 2] = [1.0, 5.0];

/// Number of prior predictive draws per prior width
pub const N_PRIOR_SAMPLES: usize = 1000;

/// Number of MCMC warmup iterations per chain
pub const NUM_WARMUP: usize = 1000;

/// Number of retained MCMC draws per chain
pub const NUM_SAMPLES: usize = 800;

/// Number of MCMC chains
pub const NUM_CHAINS: usize = 2;

/// Crop analyzed by default (winter wheat)
pub const DEFAULT_CROP: &str = "Winterweizen";

/// Prefix of the soil rating keys in the scaling record
pub const SOIL_VAR: &str = "bodenzahl";

/// Yields are recorded in decitonnes per hectare; figures use tonnes
pub const DT_PER_TONNE: f64 = 10.0;
