//! Configurations of the estimators.
//!
//! Each configuration holds the scalar hyper-parameters of one estimator and
//! can be saved to and loaded from a YAML file.
use crate::{error::MultistepError, Layout};
use anyhow::Result;
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Converts λ into the element type of the sequences.
pub(crate) fn lambda_as<F: Float>(lambda: f64) -> Result<F, MultistepError> {
    F::from(lambda).ok_or_else(|| {
        MultistepError::InvalidParameter(format!("lambda {} is not representable", lambda))
    })
}

macro_rules! impl_yaml_io {
    ($config:ident) => {
        impl $config {
            #[doc = concat!("Constructs [`", stringify!($config), "`] from YAML file.")]
            pub fn load(path: impl AsRef<Path>) -> Result<Self> {
                let file = File::open(path)?;
                let rdr = BufReader::new(file);
                let b = serde_yaml::from_reader(rdr)?;
                Ok(b)
            }

            #[doc = concat!("Saves [`", stringify!($config), "`].")]
            pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
                let mut file = File::create(path)?;
                file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
                Ok(())
            }
        }
    };
}

/// Configuration of [`truncated_gae`](crate::truncated_gae).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct GaeConfig {
    /// Mixing parameter λ.
    pub lambda: f64,

    /// If `true`, the targets are detached from the gradient graph.
    pub stop_target_gradients: bool,

    /// If `true`, time is the leading axis of the sequences.
    pub time_major: bool,
}

impl Default for GaeConfig {
    fn default() -> Self {
        Self {
            lambda: 0.95,
            stop_target_gradients: true,
            time_major: false,
        }
    }
}

impl GaeConfig {
    /// Sets λ.
    pub fn lambda(mut self, v: f64) -> Self {
        self.lambda = v;
        self
    }

    /// Sets the gradient-stop flag.
    pub fn stop_target_gradients(mut self, v: bool) -> Self {
        self.stop_target_gradients = v;
        self
    }

    /// Sets the layout flag.
    pub fn time_major(mut self, v: bool) -> Self {
        self.time_major = v;
        self
    }

    /// Returns the layout of the sequences.
    pub fn layout(&self) -> Layout {
        Layout::new(self.time_major)
    }
}

impl_yaml_io!(GaeConfig);

/// Configuration of [`n_step_bootstrapped_returns`](crate::n_step_bootstrapped_returns).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct NStepConfig {
    /// Number of steps over which rewards are accumulated before bootstrapping.
    pub n: usize,

    /// Mixing parameter λ. `1.0` gives the plain n-step bootstrap.
    pub lambda: f64,

    /// If `true`, the targets are detached from the gradient graph.
    pub stop_target_gradients: bool,

    /// If `true`, time is the leading axis of the sequences.
    pub time_major: bool,
}

impl Default for NStepConfig {
    fn default() -> Self {
        Self {
            n: 1,
            lambda: 1.0,
            stop_target_gradients: true,
            time_major: false,
        }
    }
}

impl NStepConfig {
    /// Sets the number of steps.
    pub fn n(mut self, v: usize) -> Self {
        self.n = v;
        self
    }

    /// Sets λ.
    pub fn lambda(mut self, v: f64) -> Self {
        self.lambda = v;
        self
    }

    /// Sets the gradient-stop flag.
    pub fn stop_target_gradients(mut self, v: bool) -> Self {
        self.stop_target_gradients = v;
        self
    }

    /// Sets the layout flag.
    pub fn time_major(mut self, v: bool) -> Self {
        self.time_major = v;
        self
    }

    /// Returns the layout of the sequences.
    pub fn layout(&self) -> Layout {
        Layout::new(self.time_major)
    }
}

impl_yaml_io!(NStepConfig);

/// Configuration of
/// [`general_off_policy_returns_from_q_and_v`](crate::general_off_policy_returns_from_q_and_v).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct OffPolicyConfig {
    /// If `true`, the returns are detached from the gradient graph.
    pub stop_target_gradients: bool,

    /// If `true`, time is the leading axis of the sequences.
    pub time_major: bool,
}

impl Default for OffPolicyConfig {
    fn default() -> Self {
        Self {
            stop_target_gradients: false,
            time_major: false,
        }
    }
}

impl OffPolicyConfig {
    /// Sets the gradient-stop flag.
    pub fn stop_target_gradients(mut self, v: bool) -> Self {
        self.stop_target_gradients = v;
        self
    }

    /// Sets the layout flag.
    pub fn time_major(mut self, v: bool) -> Self {
        self.time_major = v;
        self
    }

    /// Returns the layout of the sequences.
    pub fn layout(&self) -> Layout {
        Layout::new(self.time_major)
    }
}

impl_yaml_io!(OffPolicyConfig);

/// Configuration of [`retrace_continuous`](crate::retrace_continuous).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RetraceConfig {
    /// Mixing parameter λ applied to the clipped importance ratios.
    pub lambda: f64,

    /// If `true`, the returns are detached before the stale Q-values are subtracted.
    pub stop_target_gradients: bool,

    /// If `true`, time is the leading axis of the sequences.
    pub time_major: bool,
}

impl Default for RetraceConfig {
    fn default() -> Self {
        Self {
            lambda: 1.0,
            stop_target_gradients: true,
            time_major: false,
        }
    }
}

impl RetraceConfig {
    /// Sets λ.
    pub fn lambda(mut self, v: f64) -> Self {
        self.lambda = v;
        self
    }

    /// Sets the gradient-stop flag.
    pub fn stop_target_gradients(mut self, v: bool) -> Self {
        self.stop_target_gradients = v;
        self
    }

    /// Sets the layout flag.
    pub fn time_major(mut self, v: bool) -> Self {
        self.time_major = v;
        self
    }

    /// Returns the layout of the sequences.
    pub fn layout(&self) -> Layout {
        Layout::new(self.time_major)
    }
}

impl_yaml_io!(RetraceConfig);
