//! Dense training weights of a field-aware factorization machine
use crate::buffer::AlignedBuffer;
use crate::error::{FfmError, Result};
use crate::kernel::aligned_dim;
use crate::FieldAwareFactorizationMachine;
use linfa::Float;
use log::debug;
use rand::distributions::Uniform;
use rand::Rng;

/// Training state of the model
///
/// For every `(feature, field)` pair the store holds a block of `2 * aligned_dim`
/// floats: the latent vector, zero padded to a whole number of lanes, followed by
/// the per-dimension AdaGrad accumulator. Blocks are laid out feature-major,
/// field-minor in one aligned buffer.
#[derive(Clone, Debug)]
pub struct WeightStore<F> {
    nfeatures: usize,
    nfields: usize,
    latent_dim: usize,
    aligned_dim: usize,
    normalization: bool,
    weights: AlignedBuffer<F>,
}

impl<F: Float> WeightStore<F> {
    /// Allocate and initialize the weights of `nfeatures * nfields` pairs
    ///
    /// Latent values are drawn from `uniform(0, 1) * 0.5 / sqrt(latent_dim)`,
    /// padding is zero and the accumulators start at one.
    pub fn allocate<R: Rng>(
        nfeatures: usize,
        nfields: usize,
        latent_dim: usize,
        normalization: bool,
        rng: &mut R,
    ) -> Result<Self> {
        if latent_dim == 0 {
            return Err(FfmError::InvalidLatentDim);
        }
        let aligned = aligned_dim(latent_dim);
        let len = nfeatures
            .checked_mul(nfields)
            .and_then(|pairs| pairs.checked_mul(2 * aligned))
            .ok_or(FfmError::Allocation(usize::MAX))?;
        debug!(
            "allocating {} x {} x {} weights ({} floats)",
            nfeatures, nfields, aligned, len
        );
        let mut weights = AlignedBuffer::try_filled(len, F::one())?;

        let coef = F::cast(0.5) / F::cast(latent_dim).sqrt();
        let uniform = Uniform::new(F::zero(), F::one());
        for block in weights.as_mut_slice().chunks_exact_mut(2 * aligned) {
            let (latent, _) = block.split_at_mut(aligned);
            let (values, padding) = latent.split_at_mut(latent_dim);
            for v in values {
                *v = coef * rng.sample(&uniform);
            }
            for v in padding {
                *v = F::zero();
            }
        }

        Ok(WeightStore {
            nfeatures,
            nfields,
            latent_dim,
            aligned_dim: aligned,
            normalization,
            weights,
        })
    }

    pub fn nfeatures(&self) -> usize {
        self.nfeatures
    }

    pub fn nfields(&self) -> usize {
        self.nfields
    }

    /// Requested latent dimension
    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    /// Latent dimension padded to whole lanes
    pub fn aligned_dim(&self) -> usize {
        self.aligned_dim
    }

    pub fn normalization(&self) -> bool {
        self.normalization
    }

    /// Whether the pair has weights in this store
    #[inline]
    pub fn contains(&self, feature: usize, field: usize) -> bool {
        feature < self.nfeatures && field < self.nfields
    }

    #[inline]
    fn block_offset(&self, feature: usize, field: usize) -> usize {
        debug_assert!(self.contains(feature, field));
        (feature * self.nfields + field) * 2 * self.aligned_dim
    }

    /// Padded latent vector of a pair
    pub fn latent(&self, feature: usize, field: usize) -> &[F] {
        let start = self.block_offset(feature, field);
        &self.weights.as_slice()[start..start + self.aligned_dim]
    }

    /// AdaGrad accumulator of a pair
    pub fn accumulator(&self, feature: usize, field: usize) -> &[F] {
        let start = self.block_offset(feature, field) + self.aligned_dim;
        &self.weights.as_slice()[start..start + self.aligned_dim]
    }

    /// Mutable padded latent vector of a pair
    pub fn latent_mut(&mut self, feature: usize, field: usize) -> &mut [F] {
        let start = self.block_offset(feature, field);
        let end = start + self.aligned_dim;
        &mut self.weights.as_mut_slice()[start..end]
    }

    /// Mutable `(latent, accumulator)` halves of two distinct pairs
    pub(crate) fn block_pair_mut(
        &mut self,
        a: (usize, usize),
        b: (usize, usize),
    ) -> ((&mut [F], &mut [F]), (&mut [F], &mut [F])) {
        let (oa, ob) = (self.block_offset(a.0, a.1), self.block_offset(b.0, b.1));
        debug_assert_ne!(oa, ob, "a pair cannot interact with itself");
        let (k, block) = (self.aligned_dim, 2 * self.aligned_dim);
        let weights = self.weights.as_mut_slice();

        let (first, second) = if oa < ob {
            let (head, tail) = weights.split_at_mut(ob);
            (&mut head[oa..oa + block], &mut tail[..block])
        } else {
            let (head, tail) = weights.split_at_mut(oa);
            (&mut tail[..block], &mut head[ob..ob + block])
        };
        (first.split_at_mut(k), second.split_at_mut(k))
    }

    /// Drop the accumulators and the padding, keeping `latent_dim` values per pair
    ///
    /// The latent values are moved to the front of the existing buffer in a single
    /// forward pass, pair by pair. The destination of a pair never lies after its
    /// source since `latent_dim <= 2 * aligned_dim`.
    pub fn compact(self, latent_dim: usize) -> Result<FieldAwareFactorizationMachine<F>> {
        if latent_dim == 0 || latent_dim > self.aligned_dim {
            return Err(FfmError::InvalidCompaction {
                requested: latent_dim,
                aligned: self.aligned_dim,
            });
        }
        let WeightStore {
            nfeatures,
            nfields,
            aligned_dim,
            normalization,
            mut weights,
            ..
        } = self;

        let pairs = nfeatures * nfields;
        for pair in 0..pairs {
            let src = pair * 2 * aligned_dim;
            weights.shift_left(src..src + latent_dim, pair * latent_dim);
        }
        weights.truncate(pairs * latent_dim);
        debug!(
            "compacted weights from {} to {} floats per pair",
            2 * aligned_dim,
            latent_dim
        );

        Ok(FieldAwareFactorizationMachine::from_parts(
            nfeatures,
            nfields,
            latent_dim,
            normalization,
            weights,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn initial_values() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let store = WeightStore::<f32>::allocate(3, 2, 5, false, &mut rng).unwrap();
        assert_eq!(store.aligned_dim(), 8);
        let bound = 0.5 / 5f32.sqrt();
        for j in 0..3 {
            for f in 0..2 {
                let latent = store.latent(j, f);
                assert!(latent[..5].iter().all(|&v| (0.0..=bound).contains(&v)));
                assert_eq!(&latent[5..], &[0.0; 3]);
                assert_eq!(store.accumulator(j, f), &[1.0; 8]);
            }
        }
    }

    #[test]
    fn initialization_follows_the_rng() {
        let a = WeightStore::<f64>::allocate(4, 3, 4, false, &mut Xoshiro256Plus::seed_from_u64(1))
            .unwrap();
        let b = WeightStore::<f64>::allocate(4, 3, 4, false, &mut Xoshiro256Plus::seed_from_u64(1))
            .unwrap();
        let c = WeightStore::<f64>::allocate(4, 3, 4, false, &mut Xoshiro256Plus::seed_from_u64(2))
            .unwrap();
        assert_eq!(a.latent(2, 1), b.latent(2, 1));
        assert_ne!(a.latent(2, 1), c.latent(2, 1));
    }

    #[test]
    fn zero_latent_dim_is_rejected() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let res = WeightStore::<f32>::allocate(3, 2, 0, false, &mut rng);
        assert!(matches!(res, Err(FfmError::InvalidLatentDim)));
    }

    #[test]
    fn oversized_store_is_an_allocation_error() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let res = WeightStore::<f32>::allocate(usize::MAX / 2, 4, 4, false, &mut rng);
        assert!(matches!(res, Err(FfmError::Allocation(_))));
    }

    #[test]
    fn block_pairs_are_disjoint() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let mut store = WeightStore::<f32>::allocate(2, 2, 4, false, &mut rng).unwrap();
        {
            let ((w1, g1), (w2, g2)) = store.block_pair_mut((1, 0), (0, 1));
            w1.iter_mut().for_each(|v| *v = 7.0);
            g1.iter_mut().for_each(|v| *v = 8.0);
            w2.iter_mut().for_each(|v| *v = -7.0);
            g2.iter_mut().for_each(|v| *v = -8.0);
        }
        assert_eq!(store.latent(1, 0), &[7.0; 4]);
        assert_eq!(store.accumulator(1, 0), &[8.0; 4]);
        assert_eq!(store.latent(0, 1), &[-7.0; 4]);
        assert_eq!(store.accumulator(0, 1), &[-8.0; 4]);
        assert_eq!(store.accumulator(0, 0), &[1.0; 4]);
    }

    #[test]
    fn compaction_is_a_projection() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let store = WeightStore::<f32>::allocate(3, 4, 3, true, &mut rng).unwrap();
        let expected: Vec<Vec<f32>> = (0..3)
            .flat_map(|j| (0..4).map(move |f| (j, f)))
            .map(|(j, f)| store.latent(j, f)[..3].to_vec())
            .collect();

        let model = store.compact(3).unwrap();
        assert_eq!(model.latent_dim(), 3);
        assert!(model.normalization());
        let got: Vec<Vec<f32>> = model.latent_vectors().map(|(_, w)| w.to_vec()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn compaction_bounds() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let store = WeightStore::<f32>::allocate(2, 2, 3, false, &mut rng).unwrap();
        assert!(matches!(
            store.clone().compact(5),
            Err(FfmError::InvalidCompaction {
                requested: 5,
                aligned: 4
            })
        ));
        assert!(store.clone().compact(0).is_err());
        assert_eq!(store.compact(4).unwrap().latent_dim(), 4);
    }
}
