#![warn(missing_docs)]
//! Batched multi-step return and advantage estimators.
//!
//! All estimators take a batch of trajectory segments as 2-dimensional arrays
//! and run a backward recursion along the time axis, one batch row at a time.
//! Whether time or batch is the leading axis is given by [`Layout`].
//!
//! Sequences follow the indexing convention of Sutton & Barto: `r_t` is the
//! reward received after acting in state `s_{t-1}`, so reward, discount and
//! mixing-weight sequences cover steps `[1, K]` while value sequences cover
//! `[0, K]` or `[1, K]` depending on the estimator.
pub mod error;
pub mod config;

pub mod shape;
pub use shape::Layout;

mod lambda;
pub use lambda::Lambda;

mod gae;
pub use gae::truncated_gae;

mod nstep;
pub use nstep::n_step_bootstrapped_returns;

mod off_policy;
pub use off_policy::{general_off_policy_returns_from_q_and_v, retrace_continuous};

mod segment;
pub use segment::Segment;

mod timesteps;
pub use timesteps::TimestepBudget;
