//! Pairwise interaction engine
//!
//! A row contributes, for every unordered pair of nodes from different fields,
//! `2 * v1 * v2 * r * <w(j1, f2), w(j2, f1)>`: the latent vector of each feature is
//! the one it keeps for the field of its partner. Nodes outside of the model are
//! skipped.
use crate::kernel::{Lanes, LANES};
use crate::node::Node;
use crate::store::WeightStore;
use linfa::Float;

/// Interacting node pairs of a row, with their `2 * v1 * v2 * r` coefficient
///
/// Each unordered pair is visited once, the earlier node of the row first.
pub(crate) fn interactions<'a, F: Float>(
    row: &'a [Node<F>],
    r: F,
    nfeatures: usize,
    nfields: usize,
) -> impl Iterator<Item = (&'a Node<F>, &'a Node<F>, F)> + 'a {
    let inside = move |n: &Node<F>| n.feature < nfeatures && n.field < nfields;
    let two = F::cast(2.0);
    row.iter()
        .enumerate()
        .filter(move |(_, n1)| inside(*n1))
        .flat_map(move |(i, n1)| {
            row[i + 1..]
                .iter()
                .filter(move |n2| inside(*n2) && n2.field != n1.field)
                .map(move |n2| (n1, n2, two * n1.value * n2.value * r))
        })
}

/// Score of a row against the training weights
pub fn score<F: Lanes>(row: &[Node<F>], r: F, store: &WeightStore<F>) -> F {
    let mut acc = [F::zero(); LANES];
    for (n1, n2, v) in interactions(row, r, store.nfeatures(), store.nfields()) {
        let w1 = store.latent(n1.feature, n2.field);
        let w2 = store.latent(n2.feature, n1.field);
        F::accumulate(&mut acc, w1, w2, v);
    }
    F::reduce(&acc)
}

/// Apply one AdaGrad step to every latent vector touched by the row
///
/// `kappa` is the derivative of the loss with respect to the score of the row.
pub fn update<F: Lanes>(
    row: &[Node<F>],
    r: F,
    store: &mut WeightStore<F>,
    kappa: F,
    eta: F,
    lambda: F,
) {
    let (nfeatures, nfields) = (store.nfeatures(), store.nfields());
    for (n1, n2, v) in interactions(row, r, nfeatures, nfields) {
        let ((w1, g1), (w2, g2)) =
            store.block_pair_mut((n1.feature, n2.field), (n2.feature, n1.field));
        F::adagrad(w1, g1, w2, g2, kappa * v, eta, lambda);
    }
}
