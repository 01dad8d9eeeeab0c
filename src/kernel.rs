//! Four-lane kernels of the interaction engine
//!
//! The engine states the math once, on blocks of [`LANES`] consecutive floats, and
//! delegates the block arithmetic to [`Lanes`]. The portable backend is plain
//! scalar code written so that the compiler can vectorize it. With the `simd`
//! feature `f32` switches to `wide::f32x4`, which uses the approximate reciprocal
//! square root of the target instead of a precise one.
use linfa::Float;

/// Number of floats processed per block
pub const LANES: usize = 4;

/// Round a latent dimension up to a whole number of lanes
pub fn aligned_dim(k: usize) -> usize {
    (k + LANES - 1) / LANES * LANES
}

/// Block arithmetic of the engine, implemented per float type
///
/// All slices have a length that is a multiple of [`LANES`].
pub trait Lanes: Float {
    /// `acc[l] += a[l] * b[l] * scale` for every lane of every block
    fn accumulate(acc: &mut [Self; LANES], a: &[Self], b: &[Self], scale: Self);

    /// Apply one AdaGrad step to a pair of coupled latent vectors
    ///
    /// `w1`/`w2` are the latent vectors, `g1`/`g2` their squared gradient
    /// accumulators. Both gradients are computed from the weights before the step.
    #[allow(clippy::too_many_arguments)]
    fn adagrad(
        w1: &mut [Self],
        g1: &mut [Self],
        w2: &mut [Self],
        g2: &mut [Self],
        kappa: Self,
        eta: Self,
        lambda: Self,
    );

    /// Horizontal sum of the lane accumulator
    fn reduce(acc: &[Self; LANES]) -> Self {
        (acc[0] + acc[1]) + (acc[2] + acc[3])
    }
}

pub(crate) mod portable {
    use super::LANES;
    use linfa::Float;

    pub fn accumulate<F: Float>(acc: &mut [F; LANES], a: &[F], b: &[F], scale: F) {
        debug_assert_eq!(a.len(), b.len());
        for (a, b) in a.chunks_exact(LANES).zip(b.chunks_exact(LANES)) {
            for l in 0..LANES {
                acc[l] += a[l] * b[l] * scale;
            }
        }
    }

    pub fn adagrad<F: Float>(
        w1: &mut [F],
        g1: &mut [F],
        w2: &mut [F],
        g2: &mut [F],
        kappa: F,
        eta: F,
        lambda: F,
    ) {
        debug_assert!(w1.len() == w2.len() && g1.len() == w1.len() && g2.len() == w2.len());
        let blocks = w1
            .chunks_exact_mut(LANES)
            .zip(g1.chunks_exact_mut(LANES))
            .zip(w2.chunks_exact_mut(LANES).zip(g2.chunks_exact_mut(LANES)));
        for ((w1, g1), (w2, g2)) in blocks {
            for l in 0..LANES {
                let (x1, x2) = (w1[l], w2[l]);
                let grad1 = lambda * x1 + kappa * x2;
                let grad2 = lambda * x2 + kappa * x1;
                g1[l] += grad1 * grad1;
                g2[l] += grad2 * grad2;
                w1[l] = x1 - eta * grad1 / g1[l].sqrt();
                w2[l] = x2 - eta * grad2 / g2[l].sqrt();
            }
        }
    }
}

#[cfg(feature = "simd")]
pub(crate) mod simd {
    use super::LANES;
    use wide::f32x4;

    #[inline]
    fn load(s: &[f32]) -> f32x4 {
        f32x4::from([s[0], s[1], s[2], s[3]])
    }

    #[inline]
    fn store(s: &mut [f32], v: f32x4) {
        s.copy_from_slice(&v.to_array());
    }

    pub fn accumulate(acc: &mut [f32; LANES], a: &[f32], b: &[f32], scale: f32) {
        let scale = f32x4::splat(scale);
        let mut t = f32x4::from(*acc);
        for (a, b) in a.chunks_exact(LANES).zip(b.chunks_exact(LANES)) {
            t = t + load(a) * load(b) * scale;
        }
        *acc = t.to_array();
    }

    pub fn adagrad(
        w1: &mut [f32],
        g1: &mut [f32],
        w2: &mut [f32],
        g2: &mut [f32],
        kappa: f32,
        eta: f32,
        lambda: f32,
    ) {
        let (kappa, eta, lambda) = (f32x4::splat(kappa), f32x4::splat(eta), f32x4::splat(lambda));
        let blocks = w1
            .chunks_exact_mut(LANES)
            .zip(g1.chunks_exact_mut(LANES))
            .zip(w2.chunks_exact_mut(LANES).zip(g2.chunks_exact_mut(LANES)));
        for ((w1, g1), (w2, g2)) in blocks {
            let (x1, x2) = (load(w1), load(w2));
            let grad1 = lambda * x1 + kappa * x2;
            let grad2 = lambda * x2 + kappa * x1;
            let acc1 = load(g1) + grad1 * grad1;
            let acc2 = load(g2) + grad2 * grad2;
            store(w1, x1 - eta * acc1.recip_sqrt() * grad1);
            store(w2, x2 - eta * acc2.recip_sqrt() * grad2);
            store(g1, acc1);
            store(g2, acc2);
        }
    }
}

impl Lanes for f32 {
    #[inline]
    fn accumulate(acc: &mut [f32; LANES], a: &[f32], b: &[f32], scale: f32) {
        #[cfg(feature = "simd")]
        {
            simd::accumulate(acc, a, b, scale)
        }
        #[cfg(not(feature = "simd"))]
        {
            portable::accumulate(acc, a, b, scale)
        }
    }

    #[inline]
    fn adagrad(
        w1: &mut [f32],
        g1: &mut [f32],
        w2: &mut [f32],
        g2: &mut [f32],
        kappa: f32,
        eta: f32,
        lambda: f32,
    ) {
        #[cfg(feature = "simd")]
        {
            simd::adagrad(w1, g1, w2, g2, kappa, eta, lambda)
        }
        #[cfg(not(feature = "simd"))]
        {
            portable::adagrad(w1, g1, w2, g2, kappa, eta, lambda)
        }
    }
}

impl Lanes for f64 {
    #[inline]
    fn accumulate(acc: &mut [f64; LANES], a: &[f64], b: &[f64], scale: f64) {
        portable::accumulate(acc, a, b, scale)
    }

    #[inline]
    fn adagrad(
        w1: &mut [f64],
        g1: &mut [f64],
        w2: &mut [f64],
        g2: &mut [f64],
        kappa: f64,
        eta: f64,
        lambda: f64,
    ) {
        portable::adagrad(w1, g1, w2, g2, kappa, eta, lambda)
    }
}
