use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;
use crate::grabcut::energy::{Connectivity, DEFAULT_GAMMA, LAMBDA_FACTOR};
use crate::grabcut::gmm::{
    MixtureParams, DEFAULT_COMPONENTS, DEFAULT_EM_ITERATIONS, DEFAULT_REGULARIZATION,
};

/// Round cap used when nothing else is configured
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Tunable parameters of one segmentation run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrabCutConfig {
    /// Maximum number of estimate/build/cut rounds.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Gaussian components per color model.
    #[serde(default = "default_components")]
    pub components: usize,
    /// Cap on hard-assignment EM passes per model fit.
    #[serde(default = "default_em_iterations")]
    pub em_iterations: usize,
    /// Smoothness weight scale.
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Hard-constraint capacity; `None` means `9 * gamma`.
    #[serde(default)]
    pub lambda: Option<f64>,
    /// Neighborhood of the smoothness term.
    #[serde(default)]
    pub connectivity: Connectivity,
    /// Diagonal term added to singular covariances.
    #[serde(default = "default_regularization")]
    pub regularization: f64,
}

fn default_max_rounds() -> usize {
    DEFAULT_MAX_ROUNDS
}
fn default_components() -> usize {
    DEFAULT_COMPONENTS
}
fn default_em_iterations() -> usize {
    DEFAULT_EM_ITERATIONS
}
fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}
fn default_regularization() -> f64 {
    DEFAULT_REGULARIZATION
}

impl Default for GrabCutConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            components: DEFAULT_COMPONENTS,
            em_iterations: DEFAULT_EM_ITERATIONS,
            gamma: DEFAULT_GAMMA,
            lambda: None,
            connectivity: Connectivity::default(),
            regularization: DEFAULT_REGULARIZATION,
        }
    }
}

impl GrabCutConfig {
    /// Same configuration with a different round cap.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Same configuration with a different neighborhood.
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Effective hard-constraint capacity.
    pub fn lambda(&self) -> f64 {
        self.lambda.unwrap_or(LAMBDA_FACTOR * self.gamma)
    }

    /// Parameters handed to the color model estimator.
    pub fn mixture_params(&self) -> MixtureParams {
        MixtureParams {
            components: self.components,
            em_iterations: self.em_iterations,
            regularization: self.regularization,
        }
    }

    /// Checks every field against its valid range.
    ///
    /// # Errors
    ///
    /// * `InvalidInput::InvalidParameter` - Naming the first offending field
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if self.max_rounds == 0 {
            return Err(InvalidInput::InvalidParameter(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        if self.components == 0 {
            return Err(InvalidInput::InvalidParameter(
                "components must be at least 1".to_string(),
            ));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(InvalidInput::InvalidParameter(format!(
                "gamma must be positive and finite, got {}",
                self.gamma
            )));
        }
        if !(self.regularization.is_finite() && self.regularization > 0.0) {
            return Err(InvalidInput::InvalidParameter(format!(
                "regularization must be positive and finite, got {}",
                self.regularization
            )));
        }

        let lambda = self.lambda();
        let bound = self.connectivity.max_weight_sum(self.gamma);
        if !(lambda.is_finite() && lambda > bound) {
            return Err(InvalidInput::InvalidParameter(format!(
                "lambda must exceed the largest neighbor weight sum {bound}, got {lambda}"
            )));
        }
        Ok(())
    }
}
