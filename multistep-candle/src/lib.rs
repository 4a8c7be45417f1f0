//! Multi-step return and advantage estimators implemented with
//! [candle](https://crates.io/crates/candle-core).
//!
//! The estimators mirror those of [`multistep_core`] but take and return
//! [`candle_core::Tensor`]s, so targets can be built from network outputs.
//! When `stop_target_gradients` is set, the produced targets are detached
//! from the gradient graph before they are returned.
//!
//! Contract violations are reported as [`MultistepError`] values wrapped in
//! [`anyhow::Error`]; use `downcast_ref::<MultistepError>()` to inspect them.
//!
//! [`MultistepError`]: multistep_core::error::MultistepError
mod gae;
mod nstep;
mod off_policy;
pub mod util;
pub use gae::truncated_gae;
pub use nstep::n_step_bootstrapped_returns;
pub use off_policy::{general_off_policy_returns_from_q_and_v, retrace_continuous};
pub use util::{array2_to_tensor, tensor_to_array2, Lambda};
