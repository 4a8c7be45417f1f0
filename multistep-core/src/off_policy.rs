//! Generalized off-policy returns and continuous retrace.
use crate::{error::MultistepError, shape::expect_shape, Lambda, Layout};
use log::trace;
use ndarray::{Array2, ArrayView2, Zip};
use num_traits::Float;

/// Backward recursion of the generalized return on `(time, batch)` views.
fn general_returns<F: Float>(
    q_t: ArrayView2<F>,
    v_t: ArrayView2<F>,
    r_t: ArrayView2<F>,
    discount_t: ArrayView2<F>,
    c_t: ArrayView2<F>,
) -> Result<Array2<F>, MultistepError> {
    let (k, batch_size) = r_t.dim();
    if k == 0 {
        return Err(MultistepError::ShapeMismatch(
            "`r_t` must contain at least one step".to_string(),
        ));
    }
    expect_shape("discount_t", discount_t.dim(), (k, batch_size))?;
    expect_shape("v_t", v_t.dim(), (k, batch_size))?;
    expect_shape("q_t", q_t.dim(), (k - 1, batch_size))?;
    expect_shape("c_t", c_t.dim(), (k - 1, batch_size))?;

    let mut returns = Array2::<F>::zeros((k, batch_size));

    // G_{K-1} does not depend on Q-values and weights.
    let mut acc = Zip::from(r_t.row(k - 1))
        .and(discount_t.row(k - 1))
        .and(v_t.row(k - 1))
        .map_collect(|&r, &d, &v| r + d * v);
    returns.row_mut(k - 1).assign(&acc);

    for t in (0..k - 1).rev() {
        Zip::from(&mut acc)
            .and(r_t.row(t))
            .and(discount_t.row(t))
            .and(c_t.row(t))
            .and(v_t.row(t))
            .and(q_t.row(t))
            .for_each(|g, &r, &d, &c, &v, &q| {
                *g = r + d * (v - c * q + c * *g);
            });
        returns.row_mut(t).assign(&acc);
    }

    Ok(returns)
}

/// Calculates targets for various off-policy evaluation algorithms.
///
/// Given a window of experience of length `K + 1` generated by a behaviour
/// policy μ, the return `Gₜ` under a target policy π is estimated with
///
/// ```text
/// Gₜ = rₜ₊₁ + γₜ₊₁(vₜ₊₁ − cₜ₊₁q(aₜ₊₁) + cₜ₊₁Gₜ₊₁),
/// ```
///
/// where the choice of `c_t` selects the algorithm:
///
/// | algorithm | `c_t` |
/// |---|---|
/// | importance sampling | `π(xₜ, aₜ) / μ(xₜ, aₜ)` |
/// | Q(λ) (Harutyunyan et al.) | `λ` |
/// | tree-backup (Precup et al.) | `π(xₜ, aₜ)` |
/// | retrace (Munos et al.) | `λ min(1, π(xₜ, aₜ) / μ(xₜ, aₜ))` |
///
/// See Munos et al., *Safe and Efficient Off-Policy Reinforcement Learning*,
/// <https://arxiv.org/abs/1606.02647>.
///
/// * `q_t` - Q-values under π of actions executed by μ at times `[1, K-1]`.
/// * `v_t` - values under π at times `[1, K]`.
/// * `r_t` - rewards at times `[1, K]`.
/// * `discount_t` - discounts at times `[1, K]`.
/// * `c_t` - weights at times `[1, K-1]`.
///
/// Returns the generalized returns from states visited at times `[0, K-1]`.
pub fn general_off_policy_returns_from_q_and_v<F: Float>(
    q_t: ArrayView2<F>,
    v_t: ArrayView2<F>,
    r_t: ArrayView2<F>,
    discount_t: ArrayView2<F>,
    c_t: ArrayView2<F>,
    stop_target_gradients: bool,
    layout: Layout,
) -> Result<Array2<F>, MultistepError> {
    trace!(
        "general_off_policy_returns_from_q_and_v: r_t = {:?}, stop_target_gradients = {}",
        r_t.dim(),
        stop_target_gradients
    );
    let returns = general_returns(
        layout.orient(q_t),
        layout.orient(v_t),
        layout.orient(r_t),
        layout.orient(discount_t),
        layout.orient(c_t),
    )?;
    Ok(layout.restore(returns))
}

/// Retrace error for continuous actions.
///
/// The trace weights are `cₜ = λ min(1, exp(log ρₜ))`; clipping the
/// importance ratio at one bounds the variance of the correction. The
/// generalized returns are computed with
/// [`general_off_policy_returns_from_q_and_v`] and the stale Q-values are
/// subtracted from them.
///
/// * `q_tm1` - Q-values at times `[0, K-1]`.
/// * `q_t` - Q-values of the behaviour actions at times `[1, K-1]`.
/// * `v_t` - values of the target policy at times `[1, K]`.
/// * `r_t` - rewards at times `[1, K]`.
/// * `discount_t` - discounts at times `[1, K]`.
/// * `log_rhos` - log importance weights `log π/μ` of the behaviour actions at times `[1, K-1]`.
/// * `lambda` - a scalar or λ broadcastable to `log_rhos`.
///
/// Returns the retrace error at times `[0, K-1]`.
#[allow(clippy::too_many_arguments)]
pub fn retrace_continuous<F: Float>(
    q_tm1: ArrayView2<F>,
    q_t: ArrayView2<F>,
    v_t: ArrayView2<F>,
    r_t: ArrayView2<F>,
    discount_t: ArrayView2<F>,
    log_rhos: ArrayView2<F>,
    lambda: Lambda<F>,
    stop_target_gradients: bool,
    layout: Layout,
) -> Result<Array2<F>, MultistepError> {
    let q_tm1 = layout.orient(q_tm1);
    let log_rhos = layout.orient(log_rhos);
    let lambda = lambda.broadcast(log_rhos.dim(), layout)?;
    trace!(
        "retrace_continuous: q_tm1 = {:?}, stop_target_gradients = {}",
        q_tm1.dim(),
        stop_target_gradients
    );

    let c_t = Zip::from(log_rhos)
        .and(&lambda)
        .map_collect(|&log_rho, &l| {
            // NaN ratios propagate into the weights.
            let rho = log_rho.exp();
            if rho > F::one() {
                l
            } else {
                rho * l
            }
        });

    let target_tm1 = general_returns(
        layout.orient(q_t),
        layout.orient(v_t),
        layout.orient(r_t),
        layout.orient(discount_t),
        c_t.view(),
    )?;
    expect_shape("q_tm1", q_tm1.dim(), target_tm1.dim())?;

    let td_error = Zip::from(&target_tm1)
        .and(q_tm1)
        .map_collect(|&g, &q| g - q);
    Ok(layout.restore(td_error))
}
