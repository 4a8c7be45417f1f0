//! Trajectory segment.
use crate::{
    config::{lambda_as, GaeConfig, NStepConfig},
    error::MultistepError,
    n_step_bootstrapped_returns,
    shape::expect_shape,
    truncated_gae, Lambda, Layout,
};
use ndarray::{s, Array2, ArrayView2, Zip};
use num_traits::Float;

/// A batch of aligned trajectory segments of length `K`.
///
/// Rewards and discounts cover steps `[1, K]` and values cover `[0, K]`, all
/// in the same [`Layout`]. The estimators called through a segment return
/// their targets in the layout of the segment; the `time_major` flag of the
/// given configuration is not consulted.
#[derive(Clone, Debug)]
pub struct Segment<F> {
    rewards: Array2<F>,
    discounts: Array2<F>,
    values: Array2<F>,
    layout: Layout,
}

impl<F: Float> Segment<F> {
    /// Constructs a segment from rewards, discounts and values.
    pub fn new(
        rewards: Array2<F>,
        discounts: Array2<F>,
        values: Array2<F>,
        layout: Layout,
    ) -> Result<Self, MultistepError> {
        let (k, batch_size) = layout.orient(rewards.view()).dim();
        expect_shape(
            "discounts",
            layout.orient(discounts.view()).dim(),
            (k, batch_size),
        )?;
        expect_shape(
            "values",
            layout.orient(values.view()).dim(),
            (k + 1, batch_size),
        )?;

        Ok(Self {
            rewards,
            discounts,
            values,
            layout,
        })
    }

    /// Constructs a segment from termination flags.
    ///
    /// The discount of a step is `gamma` unless the episode terminated at
    /// that step, in which case it is zero.
    pub fn from_dones(
        rewards: Array2<F>,
        dones: ArrayView2<bool>,
        values: Array2<F>,
        gamma: F,
        layout: Layout,
    ) -> Result<Self, MultistepError> {
        expect_shape(
            "dones",
            layout.orient(dones).dim(),
            layout.orient(rewards.view()).dim(),
        )?;
        let discounts = Zip::from(dones).map_collect(|&done| match done {
            true => F::zero(),
            false => gamma,
        });
        Self::new(rewards, discounts, values, layout)
    }

    /// Returns the number of steps `K`.
    pub fn len(&self) -> usize {
        self.layout.orient(self.rewards.view()).nrows()
    }

    /// Returns `true` if the segment has no steps.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of trajectories.
    pub fn batch_size(&self) -> usize {
        self.layout.orient(self.rewards.view()).ncols()
    }

    /// Returns the layout of the sequences.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Rewards at times `[1, K]`.
    pub fn rewards(&self) -> ArrayView2<F> {
        self.rewards.view()
    }

    /// Discounts at times `[1, K]`.
    pub fn discounts(&self) -> ArrayView2<F> {
        self.discounts.view()
    }

    /// Values at times `[0, K]`.
    pub fn values(&self) -> ArrayView2<F> {
        self.values.view()
    }

    /// Computes advantages and target values with [`truncated_gae`].
    pub fn gae(&self, config: &GaeConfig) -> Result<(Array2<F>, Array2<F>), MultistepError> {
        truncated_gae(
            self.rewards.view(),
            self.discounts.view(),
            Lambda::Scalar(lambda_as(config.lambda)?),
            self.values.view(),
            config.stop_target_gradients,
            self.layout,
        )
    }

    /// Computes n-step returns with [`n_step_bootstrapped_returns`],
    /// bootstrapping from the values at times `[1, K]`.
    pub fn n_step_returns(&self, config: &NStepConfig) -> Result<Array2<F>, MultistepError> {
        let values = self.layout.orient(self.values.view());
        let returns = n_step_bootstrapped_returns(
            self.layout.orient(self.rewards.view()),
            self.layout.orient(self.discounts.view()),
            values.slice(s![1.., ..]),
            config.n,
            Lambda::Scalar(lambda_as(config.lambda)?),
            config.stop_target_gradients,
            Layout::TimeMajor,
        )?;
        Ok(self.layout.restore(returns))
    }
}
