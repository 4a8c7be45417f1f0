//! Truncated generalized advantage estimation.
use crate::util::{dims2, expect_dtype, orient, restore, stack_time, stop_gradient, Lambda};
use anyhow::Result;
use candle_core::Tensor;
use log::trace;
use multistep_core::{shape::expect_shape, Layout};

/// Computes truncated generalized advantage estimates for a batch of sequences of length `K`.
///
/// Tensor counterpart of [`multistep_core::truncated_gae`]. `r_t` and
/// `discount_t` cover times `[1, K]`, `values` covers `[0, K]`. Returns the
/// advantages and the target values at times `[0, K-1]`, both detached if
/// `stop_target_gradients` is `true`.
pub fn truncated_gae(
    r_t: &Tensor,
    discount_t: &Tensor,
    lambda: Lambda,
    values: &Tensor,
    stop_target_gradients: bool,
    layout: Layout,
) -> Result<(Tensor, Tensor)> {
    let r_t = orient("r_t", r_t, layout)?;
    let discount_t = orient("discount_t", discount_t, layout)?;
    let values = orient("values", values, layout)?;

    let (k, batch_size) = dims2(&r_t);
    expect_shape("discount_t", dims2(&discount_t), (k, batch_size))?;
    expect_shape("values", dims2(&values), (k + 1, batch_size))?;
    expect_dtype("discount_t", &discount_t, &r_t)?;
    expect_dtype("values", &values, &r_t)?;
    let lambda = lambda.broadcast(&discount_t, layout)?;
    trace!(
        "truncated_gae: k = {}, batch_size = {}, stop_target_gradients = {}",
        k,
        batch_size,
        stop_target_gradients
    );

    let v_tm1 = values.narrow(0, 0, k)?;
    let delta_t = r_t
        .add(&discount_t.mul(&values.narrow(0, 1, k)?)?)?
        .sub(&v_tm1)?;
    let decay_t = discount_t.mul(&lambda)?;

    // Iterate backwards to calculate advantages.
    let mut acc = Tensor::zeros(batch_size, r_t.dtype(), r_t.device())?;
    let mut advantages = Vec::with_capacity(k);
    for t in (0..k).rev() {
        acc = delta_t.get(t)?.add(&decay_t.get(t)?.mul(&acc)?)?;
        advantages.push(acc.clone());
    }
    advantages.reverse();
    let advantages = stack_time(&advantages, batch_size, &r_t)?;
    let target_values = v_tm1.add(&advantages)?;

    Ok((
        stop_gradient(restore(advantages, layout)?, stop_target_gradients),
        stop_gradient(restore(target_values, layout)?, stop_target_gradients),
    ))
}
