use std::fmt;
use std::result;

use crate::data::{DataError, ScalingError};
use crate::mcmc::SamplerError;
use crate::model::ModelError;
use crate::plot::RenderError;

pub type Result<T> = result::Result<T, Error>;

/// Any failure of the fitting pipeline
#[derive(Debug)]
pub enum Error {
    /// Loading or validating the observation tables failed
    Data(DataError),
    /// A scaling statistic is missing or invalid
    Scaling(ScalingError),
    /// A model could not be built from its inputs
    Model(ModelError),
    /// The sampler could not initialize or integrate
    Sampler(SamplerError),
    /// Writing a figure failed
    Render(RenderError),
    /// The experiment configuration is invalid
    Config(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Data(err) => Some(err),
            Self::Scaling(err) => Some(err),
            Self::Model(err) => Some(err),
            Self::Sampler(err) => Some(err),
            Self::Render(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(err) => write!(f, "data: {err}"),
            Self::Scaling(err) => write!(f, "scaling: {err}"),
            Self::Model(err) => write!(f, "model: {err}"),
            Self::Sampler(err) => write!(f, "sampler: {err}"),
            Self::Render(err) => write!(f, "render: {err}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

macro_rules! impl_from_error {
    ($variant:ident, $err:ty) => {
        impl From<$err> for Error {
            fn from(err: $err) -> Self {
                Error::$variant(err)
            }
        }
    };
}

impl_from_error!(Data, DataError);
impl_from_error!(Scaling, ScalingError);
impl_from_error!(Model, ModelError);
impl_from_error!(Sampler, SamplerError);
impl_from_error!(Render, RenderError);
