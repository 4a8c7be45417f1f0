//! Strided n-step bootstrapped returns.
use crate::{error::MultistepError, shape::expect_shape, Lambda, Layout};
use log::trace;
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use num_traits::Float;

/// Appends `extra` copies of `fill` to a `(time, batch)` array along time.
fn extend_time<F: Float>(
    x: ArrayView2<F>,
    extra: usize,
    fill: ArrayView1<F>,
) -> Result<Array2<F>, MultistepError> {
    let batch_size = x.ncols();
    let padding = fill
        .broadcast((extra, batch_size))
        .ok_or_else(|| {
            MultistepError::ShapeMismatch(format!(
                "padding row of length {} does not match batch size {}",
                fill.len(),
                batch_size
            ))
        })?;
    concatenate(Axis(0), &[x.view(), padding.view()])
        .map_err(|e| MultistepError::ShapeMismatch(e.to_string()))
}

/// Computes strided n-step bootstrapped return targets over a batch of sequences.
///
/// The returns are computed by iterating the following equation `n` times:
///
/// ```text
/// Gₜ = rₜ₊₁ + γₜ₊₁[(1 − λₜ₊₁)vₜ₊₁ + λₜ₊₁Gₜ₊₁].
/// ```
///
/// With `λ = 1` this reduces to the classic n-step bootstrap
///
/// ```text
/// Gₜ = rₜ₊₁ + γₜ₊₁(rₜ₊₂ + γₜ₊₂(... (rₜ₊ₙ + γₜ₊ₙvₜ₊ₙ))).
/// ```
///
/// Lookaheads running past the end of the sequence use padded steps with
/// zero reward, unit discount, unit λ and the last value repeated. This is a
/// policy, not the only sensible choice, but downstream targets depend on it.
/// Such steps leave the returns unchanged, so any `n ≥ T` gives the same
/// returns as `n = T`.
///
/// * `r_t` - rewards at times `[1, T]`.
/// * `discount_t` - discounts at times `[1, T]`.
/// * `v_t` - state or state-action values to bootstrap from at times `[1, T]`.
/// * `n` - number of steps over which rewards are accumulated before bootstrapping.
/// * `lambda_t` - a scalar or λ at times `[1, T]`.
/// * `stop_target_gradients` - no numeric effect on arrays.
/// * `layout` - layout of all inputs and the output.
///
/// Returns the bootstrapped returns at times `[0, T-1]`.
pub fn n_step_bootstrapped_returns<F: Float>(
    r_t: ArrayView2<F>,
    discount_t: ArrayView2<F>,
    v_t: ArrayView2<F>,
    n: usize,
    lambda_t: Lambda<F>,
    stop_target_gradients: bool,
    layout: Layout,
) -> Result<Array2<F>, MultistepError> {
    if n == 0 {
        return Err(MultistepError::InvalidParameter(
            "the number of steps `n` must be positive".to_string(),
        ));
    }

    let r_t = layout.orient(r_t);
    let discount_t = layout.orient(discount_t);
    let v_t = layout.orient(v_t);

    let (seq_len, batch_size) = r_t.dim();
    expect_shape("discount_t", discount_t.dim(), (seq_len, batch_size))?;
    expect_shape("v_t", v_t.dim(), (seq_len, batch_size))?;
    let lambda_t = lambda_t.broadcast((seq_len, batch_size), layout)?;
    trace!(
        "n_step_bootstrapped_returns: n = {}, seq_len = {}, batch_size = {}, stop_target_gradients = {}",
        n,
        seq_len,
        batch_size,
        stop_target_gradients
    );

    if seq_len == 0 {
        return Ok(layout.restore(Array2::zeros((0, batch_size))));
    }

    // Bootstrap values shifted by n, the tail filled with the last value.
    let v_last = v_t.row(seq_len - 1);
    let mut targets = Array2::<F>::zeros((seq_len, batch_size));
    for (t, mut row) in targets.outer_iter_mut().enumerate() {
        let src = t.saturating_add(n - 1);
        row.assign(&if src < seq_len { v_t.row(src) } else { v_last });
    }

    // Pad to length T + min(n - 1, T).
    let pad = (n - 1).min(seq_len);
    let zeros = Array1::<F>::zeros(batch_size);
    let ones = Array1::<F>::ones(batch_size);
    let r_t = extend_time(r_t, pad, zeros.view())?;
    let discount_t = extend_time(discount_t, pad, ones.view())?;
    let lambda_t = extend_time(lambda_t.view(), pad, ones.view())?;
    let v_t = extend_time(v_t, pad, v_last)?;

    // Work backwards to compute n-step returns.
    for i in (0..n.min(seq_len)).rev() {
        Zip::from(&mut targets)
            .and(r_t.slice(s![i..i + seq_len, ..]))
            .and(discount_t.slice(s![i..i + seq_len, ..]))
            .and(lambda_t.slice(s![i..i + seq_len, ..]))
            .and(v_t.slice(s![i..i + seq_len, ..]))
            .for_each(|g, &r, &d, &l, &v| {
                *g = r + d * ((F::one() - l) * v + l * *g);
            });
    }

    Ok(layout.restore(targets))
}
