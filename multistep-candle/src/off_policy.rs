//! Generalized off-policy returns and continuous retrace.
use crate::util::{dims2, expect_dtype, orient, restore, stack_time, stop_gradient, Lambda};
use anyhow::Result;
use candle_core::Tensor;
use log::trace;
use multistep_core::{error::MultistepError, shape::expect_shape, Layout};

/// Backward recursion of the generalized return on `(time, batch)` tensors.
fn general_returns(
    q_t: &Tensor,
    v_t: &Tensor,
    r_t: &Tensor,
    discount_t: &Tensor,
    c_t: &Tensor,
) -> Result<Tensor> {
    let (k, batch_size) = dims2(r_t);
    if k == 0 {
        return Err(MultistepError::ShapeMismatch(
            "`r_t` must contain at least one step".to_string(),
        )
        .into());
    }
    expect_shape("discount_t", dims2(discount_t), (k, batch_size))?;
    expect_shape("v_t", dims2(v_t), (k, batch_size))?;
    expect_shape("q_t", dims2(q_t), (k - 1, batch_size))?;
    expect_shape("c_t", dims2(c_t), (k - 1, batch_size))?;
    for (name, x) in [
        ("discount_t", discount_t),
        ("v_t", v_t),
        ("q_t", q_t),
        ("c_t", c_t),
    ] {
        expect_dtype(name, x, r_t)?;
    }

    // G_{K-1}, independent of Q-values and weights.
    let mut g = r_t.get(k - 1)?.add(&discount_t.get(k - 1)?.mul(&v_t.get(k - 1)?)?)?;
    let mut returns = Vec::with_capacity(k);
    returns.push(g.clone());

    for t in (0..k - 1).rev() {
        let c = c_t.get(t)?;
        let inner = v_t
            .get(t)?
            .sub(&c.mul(&q_t.get(t)?)?)?
            .add(&c.mul(&g)?)?;
        g = r_t.get(t)?.add(&discount_t.get(t)?.mul(&inner)?)?;
        returns.push(g.clone());
    }
    returns.reverse();

    stack_time(&returns, batch_size, r_t)
}

/// Calculates targets for various off-policy evaluation algorithms.
///
/// Tensor counterpart of
/// [`multistep_core::general_off_policy_returns_from_q_and_v`]. The weights
/// `c_t` select importance sampling, Q(λ), tree-backup or retrace.
pub fn general_off_policy_returns_from_q_and_v(
    q_t: &Tensor,
    v_t: &Tensor,
    r_t: &Tensor,
    discount_t: &Tensor,
    c_t: &Tensor,
    stop_target_gradients: bool,
    layout: Layout,
) -> Result<Tensor> {
    trace!(
        "general_off_policy_returns_from_q_and_v: r_t = {:?}, stop_target_gradients = {}",
        r_t.dims(),
        stop_target_gradients
    );
    let returns = general_returns(
        &orient("q_t", q_t, layout)?,
        &orient("v_t", v_t, layout)?,
        &orient("r_t", r_t, layout)?,
        &orient("discount_t", discount_t, layout)?,
        &orient("c_t", c_t, layout)?,
    )?;
    Ok(stop_gradient(restore(returns, layout)?, stop_target_gradients))
}

/// Retrace error for continuous actions.
///
/// Tensor counterpart of [`multistep_core::retrace_continuous`]. Only the
/// generalized returns are detached when `stop_target_gradients` is `true`;
/// gradients still flow into `q_tm1`.
#[allow(clippy::too_many_arguments)]
pub fn retrace_continuous(
    q_tm1: &Tensor,
    q_t: &Tensor,
    v_t: &Tensor,
    r_t: &Tensor,
    discount_t: &Tensor,
    log_rhos: &Tensor,
    lambda: Lambda,
    stop_target_gradients: bool,
    layout: Layout,
) -> Result<Tensor> {
    let q_tm1 = orient("q_tm1", q_tm1, layout)?;
    let log_rhos = orient("log_rhos", log_rhos, layout)?;
    expect_dtype("log_rhos", &log_rhos, &q_tm1)?;
    let lambda = lambda.broadcast(&log_rhos, layout)?;
    trace!(
        "retrace_continuous: q_tm1 = {:?}, stop_target_gradients = {}",
        q_tm1.dims(),
        stop_target_gradients
    );

    let c_t = log_rhos.exp()?.clamp(0f64, 1f64)?.mul(&lambda)?;
    let r_t = orient("r_t", r_t, layout)?;
    expect_dtype("r_t", &r_t, &q_tm1)?;
    let target_tm1 = general_returns(
        &orient("q_t", q_t, layout)?,
        &orient("v_t", v_t, layout)?,
        &r_t,
        &orient("discount_t", discount_t, layout)?,
        &c_t,
    )?;
    expect_shape("q_tm1", dims2(&q_tm1), dims2(&target_tm1))?;

    let target_tm1 = stop_gradient(target_tm1, stop_target_gradients);
    restore(target_tm1.sub(&q_tm1)?, layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_general_returns_hand_computed() -> Result<()> {
        let device = Device::Cpu;
        let q = Tensor::new(&[[1f32, 2.]], &device)?;
        let v = Tensor::new(&[[2f32, 1., 3.]], &device)?;
        let r = Tensor::new(&[[1f32, 0., 2.]], &device)?;
        let d = Tensor::new(&[[0.5f32, 0.5, 0.5]], &device)?;
        let c = Tensor::new(&[[0.5f32, 0.]], &device)?;
        let g = general_off_policy_returns_from_q_and_v(
            &q,
            &v,
            &r,
            &d,
            &c,
            false,
            Layout::BatchMajor,
        )?;
        assert_eq!(g.to_vec2::<f32>()?, vec![vec![1.875, 0.5, 3.5]]);
        Ok(())
    }

    #[test]
    fn test_retrace_clips_ratio() -> Result<()> {
        let device = Device::Cpu;
        let q_tm1 = Tensor::new(&[[0f32, 0.]], &device)?;
        let q_t = Tensor::new(&[[1f32]], &device)?;
        let v_t = Tensor::new(&[[2f32, 1.]], &device)?;
        let r_t = Tensor::new(&[[1f32, 1.]], &device)?;
        let d = r_t.ones_like()?;
        let log_rhos = Tensor::new(&[[4f32.ln()]], &device)?;
        let err = retrace_continuous(
            &q_tm1,
            &q_t,
            &v_t,
            &r_t,
            &d,
            &log_rhos,
            Lambda::Scalar(1.0),
            true,
            Layout::BatchMajor,
        )?;
        assert_eq!(err.to_vec2::<f32>()?, vec![vec![4.0, 2.0]]);
        Ok(())
    }

    #[test]
    fn test_weights_length_mismatch() -> Result<()> {
        let device = Device::Cpu;
        let q = Tensor::new(&[[1f32, 2.]], &device)?;
        let v = Tensor::new(&[[2f32, 1., 3.]], &device)?;
        let err = general_off_policy_returns_from_q_and_v(
            &q,
            &v,
            &v,
            &v,
            &v,
            false,
            Layout::BatchMajor,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MultistepError>(),
            Some(MultistepError::ShapeMismatch(_))
        ));
        Ok(())
    }
}
