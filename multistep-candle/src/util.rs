//! Utilities.
use anyhow::Result;
use candle_core::{DType, Device, Tensor, WithDType};
use multistep_core::{error::MultistepError, Layout};
use ndarray::{Array2, ArrayView2};

/// Mixing parameter λ, either shared by all steps or given per step.
///
/// A per-step λ is a 2-dimensional tensor in the layout of the other inputs
/// that broadcasts to the target shape. It is cast to the dtype of the target.
#[derive(Clone, Copy, Debug)]
pub enum Lambda<'a> {
    /// The same λ for every step.
    Scalar(f64),

    /// λ for each step.
    PerStep(&'a Tensor),
}

impl Lambda<'_> {
    /// Returns λ as a `(time, batch)` tensor with the shape and dtype of `target`.
    pub(crate) fn broadcast(&self, target: &Tensor, layout: Layout) -> Result<Tensor> {
        match self {
            Self::Scalar(lambda) => Ok(target.ones_like()?.affine(*lambda, 0.0)?),
            Self::PerStep(lambda) => {
                if lambda.rank() != 2 {
                    return Err(MultistepError::InvalidParameter(format!(
                        "lambda must be 2-dimensional, got shape {:?}",
                        lambda.dims()
                    ))
                    .into());
                }
                let lambda = orient("lambda", lambda, layout)?;
                let lambda = lambda.broadcast_as(target.dims()).map_err(|_| {
                    MultistepError::InvalidParameter(format!(
                        "lambda of shape {:?} cannot be broadcast to (time, batch) = {:?}",
                        lambda.dims(),
                        target.dims()
                    ))
                })?;
                Ok(lambda.to_dtype(target.dtype())?.contiguous()?)
            }
        }
    }
}

/// Checks that a tensor has a floating-point dtype.
pub(crate) fn check_float(name: &str, x: &Tensor) -> Result<()> {
    match x.dtype() {
        DType::BF16 | DType::F16 | DType::F32 | DType::F64 => Ok(()),
        dtype => Err(MultistepError::TypeContract(format!(
            "`{}` has dtype {:?}, expected a floating-point dtype",
            name, dtype
        ))
        .into()),
    }
}

/// Checks that `x` has the same dtype as `like`.
pub(crate) fn expect_dtype(name: &str, x: &Tensor, like: &Tensor) -> Result<()> {
    match x.dtype() == like.dtype() {
        true => Ok(()),
        false => Err(MultistepError::TypeContract(format!(
            "`{}` has dtype {:?}, expected {:?}",
            name,
            x.dtype(),
            like.dtype()
        ))
        .into()),
    }
}

/// Returns a 2-dimensional floating-point tensor given in `layout` as `(time, batch)`.
pub(crate) fn orient(name: &str, x: &Tensor, layout: Layout) -> Result<Tensor> {
    check_float(name, x)?;
    if x.rank() != 2 {
        return Err(MultistepError::ShapeMismatch(format!(
            "`{}` must be 2-dimensional, got shape {:?}",
            name,
            x.dims()
        ))
        .into());
    }
    match layout {
        Layout::TimeMajor => Ok(x.clone()),
        Layout::BatchMajor => Ok(x.t()?.contiguous()?),
    }
}

/// Turns a `(time, batch)` tensor back into `layout`.
pub(crate) fn restore(x: Tensor, layout: Layout) -> Result<Tensor> {
    match layout {
        Layout::TimeMajor => Ok(x),
        Layout::BatchMajor => Ok(x.t()?.contiguous()?),
    }
}

/// Shape of an oriented tensor.
pub(crate) fn dims2(x: &Tensor) -> (usize, usize) {
    let dims = x.dims();
    (dims[0], dims[1])
}

/// Stacks per-step rows of length `batch_size` along a new time axis.
pub(crate) fn stack_time(rows: &[Tensor], batch_size: usize, like: &Tensor) -> Result<Tensor> {
    match rows.is_empty() {
        true => Ok(Tensor::zeros((0, batch_size), like.dtype(), like.device())?),
        false => Ok(Tensor::stack(rows, 0)?),
    }
}

/// Detaches `x` from the gradient graph if `stop` is `true`.
pub(crate) fn stop_gradient(x: Tensor, stop: bool) -> Tensor {
    match stop {
        true => x.detach(),
        false => x,
    }
}

/// Converts a 2-dimensional array into a tensor of the same shape.
pub fn array2_to_tensor<T: WithDType>(a: ArrayView2<T>, device: &Device) -> Result<Tensor> {
    let v = a.iter().copied().collect::<Vec<_>>();
    Ok(Tensor::from_vec(v, a.dim(), device)?)
}

/// Converts a 2-dimensional tensor into an array, casting to `T`.
pub fn tensor_to_array2<T: WithDType>(t: &Tensor) -> Result<Array2<T>> {
    let shape = t.dims2()?;
    let v = t.to_dtype(T::DTYPE)?.flatten_all()?.to_vec1::<T>()?;
    Ok(Array2::from_shape_vec(shape, v)?)
}
