//! Mixing parameter of the multi-step estimators.
use crate::{error::MultistepError, Layout};
use ndarray::{Array2, ArrayView2};
use num_traits::Float;

/// Mixing parameter λ, either shared by all steps or given per step.
///
/// A per-step λ is given in the same layout as the other sequences of the
/// call and may be any array that broadcasts to the target shape, e.g.,
/// a `[batch, 1]` array in batch-major layout sets one λ per trajectory.
#[derive(Clone, Copy, Debug)]
pub enum Lambda<'a, F> {
    /// The same λ for every step.
    Scalar(F),

    /// λ for each step.
    PerStep(ArrayView2<'a, F>),
}

impl<'a, F: Float> Lambda<'a, F> {
    /// Returns λ as a `(time, batch)` array of the given shape.
    pub(crate) fn broadcast(
        &self,
        shape: (usize, usize),
        layout: Layout,
    ) -> Result<Array2<F>, MultistepError> {
        match self {
            Self::Scalar(lambda) => Ok(Array2::from_elem(shape, *lambda)),
            Self::PerStep(lambda) => {
                let lambda = layout.orient(lambda.view());
                lambda
                    .broadcast(shape)
                    .map(|l| l.to_owned())
                    .ok_or_else(|| {
                        MultistepError::InvalidParameter(format!(
                            "lambda of shape {:?} cannot be broadcast to (time, batch) = {:?}",
                            lambda.dim(),
                            shape
                        ))
                    })
            }
        }
    }
}
