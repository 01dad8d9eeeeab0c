use crate::error::FfmError;
use linfa::{Float, ParamGuard};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// Unverified hyper-parameters of a field-aware factorization machine
///
/// See [`FfmValidParams`](crate::FfmValidParams) for the meaning of each value. The
/// set is checked when training starts, or explicitly through [`ParamGuard`].
#[derive(Clone, Debug, PartialEq)]
pub struct FfmParams<F: Float, R: Rng + Clone = Xoshiro256Plus>(pub(crate) FfmValidParams<F, R>);

/// A verified hyper-parameter set ready for training a field-aware factorization machine
///
/// See [`FfmParams`](crate::FfmParams) for more information.
#[derive(Clone, Debug, PartialEq)]
pub struct FfmValidParams<F: Float, R: Rng + Clone = Xoshiro256Plus> {
    pub(crate) eta: F,
    pub(crate) lambda: F,
    pub(crate) latent_dim: usize,
    pub(crate) iterations: usize,
    pub(crate) normalization: bool,
    pub(crate) quiet: bool,
    pub(crate) n_threads: usize,
    pub(crate) rng: R,
}

impl<F: Float, R: Rng + Clone> ParamGuard for FfmParams<F, R> {
    type Checked = FfmValidParams<F, R>;
    type Error = FfmError;

    /// Validate the hyper parameters
    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if !self.0.eta.is_finite() || self.0.eta <= F::zero() {
            Err(FfmError::InvalidLearningRate(
                self.0.eta.to_f32().unwrap_or(f32::NAN),
            ))
        } else if !self.0.lambda.is_finite() || self.0.lambda.is_negative() {
            Err(FfmError::InvalidLambda(
                self.0.lambda.to_f32().unwrap_or(f32::NAN),
            ))
        } else if self.0.latent_dim == 0 {
            Err(FfmError::InvalidLatentDim)
        } else if self.0.n_threads == 0 {
            Err(FfmError::InvalidThreadCount)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng + Clone> FfmValidParams<F, R> {
    pub fn eta(&self) -> F {
        self.eta
    }

    pub fn lambda(&self) -> F {
        self.lambda
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn normalization(&self) -> bool {
        self.normalization
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}

impl<F: Float> Default for FfmParams<F, Xoshiro256Plus> {
    fn default() -> Self {
        Self::default_with_rng(Xoshiro256Plus::seed_from_u64(42))
    }
}

impl<F: Float, R: Rng + Clone> FfmParams<F, R> {
    /// Create new hyperparameters with pre-defined values
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        eta: F,
        lambda: F,
        latent_dim: usize,
        iterations: usize,
        normalization: bool,
        quiet: bool,
        n_threads: usize,
        rng: R,
    ) -> Self {
        Self(FfmValidParams {
            eta,
            lambda,
            latent_dim,
            iterations,
            normalization,
            quiet,
            n_threads,
            rng,
        })
    }

    /// Create new hyperparameters with pre-defined random number generator
    pub fn default_with_rng(rng: R) -> Self {
        Self(FfmValidParams {
            eta: F::cast(0.1),
            lambda: F::zero(),
            latent_dim: 4,
            iterations: 15,
            normalization: false,
            quiet: false,
            n_threads: 1,
            rng,
        })
    }

    /// Set the learning rate.
    ///
    /// Defaults to `0.1` if not set
    ///
    /// `eta` must be positive and finite
    pub fn eta(mut self, eta: F) -> Self {
        self.0.eta = eta;
        self
    }

    /// Set the L2 regularization strength.
    ///
    /// Defaults to `0.0` if not set
    ///
    /// `lambda` must be non-negative and finite
    pub fn lambda(mut self, lambda: F) -> Self {
        self.0.lambda = lambda;
        self
    }

    /// Set the dimension of the latent vectors.
    ///
    /// Defaults to `4` if not set. Internally the dimension is padded to a multiple of
    /// four, the fitted model only keeps the requested dimensions.
    pub fn latent_dim(mut self, latent_dim: usize) -> Self {
        self.0.latent_dim = latent_dim;
        self
    }

    /// Set the number of passes over the training rows.
    ///
    /// Defaults to `15` if not set
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.0.iterations = iterations;
        self
    }

    /// Scale every row by the inverse euclidean norm of its values.
    ///
    /// Defaults to `false` if not set
    pub fn normalization(mut self, normalization: bool) -> Self {
        self.0.normalization = normalization;
        self
    }

    /// Silence the per-epoch progress log.
    ///
    /// Defaults to `false` if not set
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.0.quiet = quiet;
        self
    }

    /// Set the number of threads used to score validation rows.
    ///
    /// Defaults to `1` if not set. Weight updates always run on the calling thread.
    pub fn n_threads(mut self, n_threads: usize) -> Self {
        self.0.n_threads = n_threads;
        self
    }

    /// Set random number generator. Used to initialize the latent vectors
    ///
    /// Defaults to Xoshiro256Plus seeded with `42`
    pub fn with_rng<R2: Rng + Clone>(self, rng: R2) -> FfmParams<F, R2> {
        let p = self.0;
        FfmParams(FfmValidParams {
            eta: p.eta,
            lambda: p.lambda,
            latent_dim: p.latent_dim,
            iterations: p.iterations,
            normalization: p.normalization,
            quiet: p.quiet,
            n_threads: p.n_threads,
            rng,
        })
    }
}
