//! Strided n-step bootstrapped returns.
use crate::util::{dims2, expect_dtype, orient, restore, stop_gradient, Lambda};
use anyhow::Result;
use candle_core::Tensor;
use log::trace;
use multistep_core::{error::MultistepError, shape::expect_shape, Layout};

/// Computes strided n-step bootstrapped return targets over a batch of sequences.
///
/// Tensor counterpart of [`multistep_core::n_step_bootstrapped_returns`],
/// including its padding policy: lookaheads past the end of the sequence see
/// zero rewards, unit discounts, unit λ and the last value repeated.
pub fn n_step_bootstrapped_returns(
    r_t: &Tensor,
    discount_t: &Tensor,
    v_t: &Tensor,
    n: usize,
    lambda_t: Lambda,
    stop_target_gradients: bool,
    layout: Layout,
) -> Result<Tensor> {
    if n == 0 {
        return Err(MultistepError::InvalidParameter(
            "the number of steps `n` must be positive".to_string(),
        )
        .into());
    }

    let r_t = orient("r_t", r_t, layout)?;
    let discount_t = orient("discount_t", discount_t, layout)?;
    let v_t = orient("v_t", v_t, layout)?;

    let (seq_len, batch_size) = dims2(&r_t);
    expect_shape("discount_t", dims2(&discount_t), (seq_len, batch_size))?;
    expect_shape("v_t", dims2(&v_t), (seq_len, batch_size))?;
    expect_dtype("discount_t", &discount_t, &r_t)?;
    expect_dtype("v_t", &v_t, &r_t)?;
    let lambda_t = lambda_t.broadcast(&discount_t, layout)?;
    trace!(
        "n_step_bootstrapped_returns: n = {}, seq_len = {}, batch_size = {}, stop_target_gradients = {}",
        n,
        seq_len,
        batch_size,
        stop_target_gradients
    );

    if seq_len == 0 {
        return Ok(restore(r_t, layout)?);
    }

    // The last value repeated along time.
    let v_last = v_t.narrow(0, seq_len - 1, 1)?;
    let repeat_last = |len: usize| -> Result<Tensor> {
        Ok(v_last.broadcast_as((len, batch_size))?.contiguous()?)
    };

    // Shift bootstrap values by n and pad the end with the last value.
    let shift = n - 1;
    let mut targets = if shift == 0 {
        v_t.clone()
    } else if shift < seq_len {
        Tensor::cat(
            &[v_t.narrow(0, shift, seq_len - shift)?, repeat_last(shift)?],
            0,
        )?
    } else {
        repeat_last(seq_len)?
    };

    // Pad sequences to length T + min(n - 1, T). Lookaheads past that only
    // see padding and leave the returns unchanged.
    let pad = shift.min(seq_len);
    let (r_t, discount_t, lambda_t, v_t) = if pad == 0 {
        (r_t, discount_t, lambda_t, v_t)
    } else {
        let zeros = Tensor::zeros((pad, batch_size), r_t.dtype(), r_t.device())?;
        let ones = zeros.ones_like()?;
        (
            Tensor::cat(&[&r_t, &zeros], 0)?,
            Tensor::cat(&[&discount_t, &ones], 0)?,
            Tensor::cat(&[&lambda_t, &ones], 0)?,
            Tensor::cat(&[v_t.clone(), repeat_last(pad)?], 0)?,
        )
    };

    // Work backwards to compute n-step returns.
    for i in (0..n.min(seq_len)).rev() {
        let r_ = r_t.narrow(0, i, seq_len)?;
        let discount_ = discount_t.narrow(0, i, seq_len)?;
        let lambda_ = lambda_t.narrow(0, i, seq_len)?;
        let v_ = v_t.narrow(0, i, seq_len)?;
        let mixed = lambda_
            .affine(-1.0, 1.0)?
            .mul(&v_)?
            .add(&lambda_.mul(&targets)?)?;
        targets = r_.add(&discount_.mul(&mixed)?)?;
    }

    Ok(stop_gradient(restore(targets, layout)?, stop_target_gradients))
}
