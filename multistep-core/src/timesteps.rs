//! Total timestep budget of a training run.
use crate::error::MultistepError;
use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Relation between the total number of environment steps and the number of updates.
///
/// Either `total_timesteps` is left unset and derived from the number of
/// updates, or it is given and the number of updates is derived from it.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TimestepBudget {
    /// Total number of environment steps.
    pub total_timesteps: Option<usize>,

    /// Number of updates.
    pub num_updates: usize,

    /// Number of steps collected per environment between updates.
    pub rollout_length: usize,

    /// Number of minibatch updates per rollout.
    pub update_batch_size: usize,

    /// Number of environments per device.
    pub num_envs: usize,

    /// Number of devices.
    pub num_devices: usize,
}

impl Default for TimestepBudget {
    fn default() -> Self {
        Self {
            total_timesteps: None,
            num_updates: 1,
            rollout_length: 1,
            update_batch_size: 1,
            num_envs: 1,
            num_devices: 1,
        }
    }
}

impl TimestepBudget {
    /// Sets the total number of environment steps.
    pub fn total_timesteps(mut self, v: Option<usize>) -> Self {
        self.total_timesteps = v;
        self
    }

    /// Sets the number of updates.
    pub fn num_updates(mut self, v: usize) -> Self {
        self.num_updates = v;
        self
    }

    /// Sets the rollout length.
    pub fn rollout_length(mut self, v: usize) -> Self {
        self.rollout_length = v;
        self
    }

    /// Sets the number of minibatch updates per rollout.
    pub fn update_batch_size(mut self, v: usize) -> Self {
        self.update_batch_size = v;
        self
    }

    /// Sets the number of environments per device.
    pub fn num_envs(mut self, v: usize) -> Self {
        self.num_envs = v;
        self
    }

    /// Sets the number of devices.
    pub fn num_devices(mut self, v: usize) -> Self {
        self.num_devices = v;
        self
    }

    /// Fills in whichever of `total_timesteps` and `num_updates` is derived.
    ///
    /// If `total_timesteps` is set, `num_updates` is overwritten with
    /// `total_timesteps / rollout_length / update_batch_size / num_envs / num_devices`
    /// (integer division at each step).
    pub fn resolve(mut self) -> Result<Self, MultistepError> {
        match self.total_timesteps {
            None => {
                let total = [
                    self.num_updates,
                    self.rollout_length,
                    self.update_batch_size,
                    self.num_envs,
                ]
                .iter()
                .try_fold(self.num_devices, |acc, &x| acc.checked_mul(x))
                .ok_or_else(|| {
                    MultistepError::InvalidParameter(
                        "total number of timesteps overflows".to_string(),
                    )
                })?;
                self.total_timesteps = Some(total);
            }
            Some(total) => {
                let divisors = [
                    ("rollout_length", self.rollout_length),
                    ("update_batch_size", self.update_batch_size),
                    ("num_envs", self.num_envs),
                    ("num_devices", self.num_devices),
                ];
                let mut num_updates = total;
                for (name, x) in divisors.iter() {
                    if *x == 0 {
                        return Err(MultistepError::InvalidParameter(format!(
                            "`{}` must be positive",
                            name
                        )));
                    }
                    num_updates /= *x;
                }
                warn!(
                    "Changing the number of updates to {}: If you want to train for a specific \
                     number of updates, please set total_timesteps to None!",
                    num_updates
                );
                self.num_updates = num_updates;
            }
        }
        Ok(self)
    }

    /// Constructs [`TimestepBudget`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TimestepBudget`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
