use crate::buffer::AlignedBuffer;
use crate::engine::interactions;
use crate::hyperparams::FfmParams;
use crate::node::{row_scale, Node, SparseRows};
use linfa::dataset::{Pr, Records};
use linfa::traits::PredictInplace;
use linfa::Float;
use ndarray::Array1;
use rand::Rng;
use rand_xoshiro::Xoshiro256Plus;

/// A fitted field-aware factorization machine
///
/// Holds `latent_dim` values for every `(feature, field)` pair, feature-major and
/// field-minor. The model is immutable and can be shared between threads.
#[derive(Clone, Debug)]
pub struct FieldAwareFactorizationMachine<F> {
    nfeatures: usize,
    nfields: usize,
    latent_dim: usize,
    normalization: bool,
    weights: AlignedBuffer<F>,
}

impl<F: Float> FieldAwareFactorizationMachine<F> {
    /// Create default hyperparameters
    pub fn params() -> FfmParams<F, Xoshiro256Plus> {
        FfmParams::default()
    }

    /// Create default hyperparameters with the given random number generator
    pub fn params_with_rng<R: Rng + Clone>(rng: R) -> FfmParams<F, R> {
        FfmParams::default_with_rng(rng)
    }

    pub(crate) fn from_parts(
        nfeatures: usize,
        nfields: usize,
        latent_dim: usize,
        normalization: bool,
        weights: AlignedBuffer<F>,
    ) -> Self {
        debug_assert_eq!(weights.len(), nfeatures * nfields * latent_dim);
        FieldAwareFactorizationMachine {
            nfeatures,
            nfields,
            latent_dim,
            normalization,
            weights,
        }
    }

    pub fn nfeatures(&self) -> usize {
        self.nfeatures
    }

    pub fn nfields(&self) -> usize {
        self.nfields
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    /// Whether rows are scaled by their inverse norm before scoring
    pub fn normalization(&self) -> bool {
        self.normalization
    }

    /// Latent vector kept by `feature` for interactions with `field`
    ///
    /// # Panics
    ///
    /// Panics if the pair lies outside of the model, see [`get_latent`](Self::get_latent)
    /// for a checked lookup.
    pub fn latent(&self, feature: usize, field: usize) -> &[F] {
        match self.get_latent(feature, field) {
            Some(w) => w,
            None => panic!("pair ({}, {}) is outside of the model", feature, field),
        }
    }

    /// Latent vector of a pair, `None` outside of the model
    pub fn get_latent(&self, feature: usize, field: usize) -> Option<&[F]> {
        if feature < self.nfeatures && field < self.nfields {
            Some(self.block(feature, field))
        } else {
            None
        }
    }

    /// Latent vector of a pair the caller has already bounds checked
    #[inline]
    fn block(&self, feature: usize, field: usize) -> &[F] {
        let start = (feature * self.nfields + field) * self.latent_dim;
        &self.weights.as_slice()[start..start + self.latent_dim]
    }

    /// All latent vectors as `((feature, field), values)`, feature-major
    pub fn latent_vectors(&self) -> impl Iterator<Item = ((usize, usize), &[F])> + '_ {
        let nfields = self.nfields;
        self.weights
            .as_slice()
            .chunks_exact(self.latent_dim)
            .enumerate()
            .map(move |(pair, w)| ((pair / nfields, pair % nfields), w))
    }

    /// Raw interaction score of a row scaled by `r`
    pub fn score(&self, row: &[Node<F>], r: F) -> F {
        let mut t = F::zero();
        for (n1, n2, v) in interactions(row, r, self.nfeatures, self.nfields) {
            let w1 = self.block(n1.feature, n2.field);
            let w2 = self.block(n2.feature, n1.field);
            for (a, b) in w1.iter().zip(w2) {
                t += *a * *b * v;
            }
        }
        t
    }

    /// Probability of the positive class for a row
    pub fn predict_probability(&self, row: &[Node<F>]) -> F {
        let r = if self.normalization {
            row_scale(row)
        } else {
            F::one()
        };
        sigmoid(self.score(row, r))
    }

    /// Probability of the positive class for every row
    pub fn predict_rows(&self, x: &SparseRows<F>) -> Array1<Pr> {
        x.rows()
            .iter()
            .map(|row| {
                let p = self.predict_probability(row).to_f32().unwrap_or_default();
                Pr::new_unchecked(p)
            })
            .collect()
    }
}

impl<F: Float> PredictInplace<SparseRows<F>, Array1<Pr>> for FieldAwareFactorizationMachine<F> {
    /// Given a dataset of sparse rows, `predict` returns the probability of the
    /// positive class for every row.
    fn predict_inplace(&self, x: &SparseRows<F>, y: &mut Array1<Pr>) {
        assert_eq!(
            x.nsamples(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        y.assign(&self.predict_rows(x));
    }

    fn default_target(&self, x: &SparseRows<F>) -> Array1<Pr> {
        Array1::from_elem(x.nsamples(), Pr::new_unchecked(0.0))
    }
}

/// Logistic function, with the argument clamped so that the result stays
/// strictly between zero and one in the precision of `F`
pub(crate) fn sigmoid<F: Float>(t: F) -> F {
    let bound = -F::epsilon().ln();
    F::one() / (F::one() + (-t.max(-bound).min(bound)).exp())
}
