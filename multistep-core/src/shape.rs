//! Layout of batched sequences and shape contracts.
use crate::error::MultistepError;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Order of the time and batch axes of a batched sequence.
///
/// Estimators resolve the layout once at the call boundary: inputs are viewed
/// as `(time, batch)`, the recursion runs on that orientation, and outputs are
/// handed back in the layout of the inputs. Reorienting a view only swaps its
/// strides, no element is copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Layout {
    /// The first axis is time.
    TimeMajor,

    /// The first axis is batch.
    BatchMajor,
}

impl Default for Layout {
    fn default() -> Self {
        Self::BatchMajor
    }
}

impl Layout {
    /// Returns the layout corresponding to a `time_major` flag.
    pub fn new(time_major: bool) -> Self {
        match time_major {
            true => Self::TimeMajor,
            false => Self::BatchMajor,
        }
    }

    /// Returns `true` if time is the leading axis.
    pub fn is_time_major(&self) -> bool {
        *self == Self::TimeMajor
    }

    /// Views an array given in this layout as `(time, batch)`.
    pub fn orient<'a, F>(&self, x: ArrayView2<'a, F>) -> ArrayView2<'a, F> {
        match self {
            Self::TimeMajor => x,
            Self::BatchMajor => x.reversed_axes(),
        }
    }

    /// Turns a `(time, batch)` array back into this layout.
    pub fn restore<F>(&self, x: Array2<F>) -> Array2<F> {
        match self {
            Self::TimeMajor => x,
            Self::BatchMajor => x.reversed_axes(),
        }
    }
}

/// Checks that a `(time, batch)` shape equals the expected one.
pub fn expect_shape(
    name: &str,
    got: (usize, usize),
    expected: (usize, usize),
) -> Result<(), MultistepError> {
    if got.1 != expected.1 {
        return Err(MultistepError::ShapeMismatch(format!(
            "`{}` has batch size {}, expected {}",
            name, got.1, expected.1
        )));
    }
    if got.0 != expected.0 {
        return Err(MultistepError::ShapeMismatch(format!(
            "`{}` has {} time steps, expected {}",
            name, got.0, expected.0
        )));
    }
    Ok(())
}
