//! Re-imports for convenience
#[doc(no_inline)]
pub use crate::dist::*;
#[doc(no_inline)]
pub use crate::model::{LinearModel, MatrixModel, Model, TruncatedModel};
#[doc(no_inline)]
pub use crate::rng::RngKey;
#[doc(no_inline)]
pub use crate::samples::{Draws, Samples};
#[doc(no_inline)]
pub use crate::traits::*;
