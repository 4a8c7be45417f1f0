//! Truncated generalized advantage estimation.
use crate::{error::MultistepError, shape::expect_shape, Lambda, Layout};
use log::trace;
use ndarray::{s, Array1, Array2, ArrayView2, Zip};
use num_traits::Float;

/// Computes truncated generalized advantage estimates for a batch of sequences of length `K`.
///
/// The advantages are computed backwards according to
///
/// ```text
/// Âₜ = δₜ + (γλ)δₜ₊₁ + ... + (γλ)ᵏ⁻ᵗ⁺¹δₖ₋₁,   δₜ = rₜ₊₁ + γₜ₊₁v(sₜ₊₁) − v(sₜ).
/// ```
///
/// See Schulman et al., *Proximal Policy Optimization Algorithms*,
/// <https://arxiv.org/abs/1707.06347>. Unlike the paper, `rₜ₊₁` denotes the
/// reward received after acting in `sₜ`.
///
/// * `r_t` - rewards at times `[1, K]`.
/// * `discount_t` - discounts at times `[1, K]`.
/// * `lambda` - mixing parameter, a scalar or λ at times `[1, K]`.
/// * `values` - values at times `[0, K]`.
/// * `stop_target_gradients` - arrays carry no gradient graph, so this flag
///   has no numeric effect. It mirrors the tensor implementation.
/// * `layout` - layout of all inputs and outputs.
///
/// Returns the advantages and the target values `vₜ + Âₜ`, both at times `[0, K-1]`.
pub fn truncated_gae<F: Float>(
    r_t: ArrayView2<F>,
    discount_t: ArrayView2<F>,
    lambda: Lambda<F>,
    values: ArrayView2<F>,
    stop_target_gradients: bool,
    layout: Layout,
) -> Result<(Array2<F>, Array2<F>), MultistepError> {
    let r_t = layout.orient(r_t);
    let discount_t = layout.orient(discount_t);
    let values = layout.orient(values);

    let (k, batch_size) = r_t.dim();
    expect_shape("discount_t", discount_t.dim(), (k, batch_size))?;
    expect_shape("values", values.dim(), (k + 1, batch_size))?;
    let lambda = lambda.broadcast((k, batch_size), layout)?;
    trace!(
        "truncated_gae: k = {}, batch_size = {}, stop_target_gradients = {}",
        k,
        batch_size,
        stop_target_gradients
    );

    let mut advantages = Array2::zeros((k, batch_size));
    let mut acc = Array1::zeros(batch_size);
    for t in (0..k).rev() {
        Zip::from(&mut acc)
            .and(r_t.row(t))
            .and(discount_t.row(t))
            .and(lambda.row(t))
            .and(values.row(t))
            .and(values.row(t + 1))
            .for_each(|acc, &r, &d, &l, &v, &v_next| {
                let delta = r + d * v_next - v;
                *acc = delta + d * l * *acc;
            });
        advantages.row_mut(t).assign(&acc);
    }

    let target_values = Zip::from(values.slice(s![..k, ..]))
        .and(&advantages)
        .map_collect(|&v, &a| v + a);

    Ok((layout.restore(advantages), layout.restore(target_values)))
}
