use crate::engine::{score, update};
use crate::error::{FfmError, Result};
use crate::hyperparams::FfmValidParams;
use crate::kernel::Lanes;
use crate::model::sigmoid;
use crate::node::{row_scale, LabeledRows, Node, RowSource, SparseRows};
use crate::store::WeightStore;
use crate::FieldAwareFactorizationMachine;
use linfa::dataset::AsSingleTargets;
use linfa::traits::Fit;
use linfa::DatasetBase;
use log::info;
use rand::Rng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Mean logistic loss after one pass over the training rows
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochLoss<F> {
    /// Epoch number, starting at one
    pub epoch: usize,
    /// Mean loss of the training rows, each measured before its update
    pub train: F,
    /// Mean loss of the validation rows at the end of the epoch
    pub valid: Option<F>,
}

impl<F, T, R> Fit<SparseRows<F>, T, FfmError> for FfmValidParams<F, R>
where
    F: Lanes,
    T: AsSingleTargets<Elem = bool>,
    R: Rng + Clone,
{
    type Object = FieldAwareFactorizationMachine<F>;

    /// Fit a field-aware factorization machine to sparse rows with boolean targets
    ///
    /// The number of features and fields of the model are taken from the records.
    fn fit(&self, dataset: &DatasetBase<SparseRows<F>, T>) -> Result<Self::Object> {
        let labels = dataset.as_single_targets();
        let rows = LabeledRows::new(dataset.records(), labels)?;
        self.fit_source(&rows)
    }
}

impl<F: Lanes, R: Rng + Clone> FfmValidParams<F, R> {
    /// Fit on a training dataset while tracking the loss of a validation dataset
    pub fn fit_with_validation<T, V>(
        &self,
        train: &DatasetBase<SparseRows<F>, T>,
        valid: &DatasetBase<SparseRows<F>, V>,
    ) -> Result<(FieldAwareFactorizationMachine<F>, Vec<EpochLoss<F>>)>
    where
        T: AsSingleTargets<Elem = bool>,
        V: AsSingleTargets<Elem = bool>,
    {
        let train = LabeledRows::new(train.records(), train.as_single_targets())?;
        let valid = LabeledRows::new(valid.records(), valid.as_single_targets())?;
        self.fit_source_with_validation(&train, &valid)
    }

    /// Fit on any row source
    pub fn fit_source<S: RowSource<F>>(&self, source: &S) -> Result<FieldAwareFactorizationMachine<F>> {
        self.train(source, None).map(|(model, _)| model)
    }

    /// Fit on a row source while tracking the loss of a validation source
    pub fn fit_source_with_validation<S, V>(
        &self,
        train: &S,
        valid: &V,
    ) -> Result<(FieldAwareFactorizationMachine<F>, Vec<EpochLoss<F>>)>
    where
        S: RowSource<F>,
        V: RowSource<F>,
    {
        self.train(train, Some(valid as &dyn RowSource<F>))
    }

    fn train(
        &self,
        train: &dyn RowSource<F>,
        valid: Option<&dyn RowSource<F>>,
    ) -> Result<(FieldAwareFactorizationMachine<F>, Vec<EpochLoss<F>>)> {
        let normalization = self.normalization();
        let mut store = WeightStore::allocate(
            train.nfeatures(),
            train.nfields(),
            self.latent_dim(),
            normalization,
            &mut self.rng().clone(),
        )?;
        let pool = match valid {
            Some(_) => Some(ThreadPoolBuilder::new().num_threads(self.n_threads()).build()?),
            None => None,
        };

        let mut history = Vec::with_capacity(self.iterations());
        let mut nodes = Vec::new();
        for epoch in 1..=self.iterations() {
            let mut total = F::zero();
            for index in 0..train.nrows() {
                let y = train.read_row(index, &mut nodes)?;
                let r = scale(&nodes, normalization);
                let t = score(&nodes, r, &store);
                total += logistic_loss(t, y);
                let kappa = loss_gradient(t, y);
                update(&nodes, r, &mut store, kappa, self.eta(), self.lambda());
            }
            let train_loss = mean(total, train.nrows());

            let valid_loss = match (valid, &pool) {
                (Some(valid), Some(pool)) => {
                    let store = &store;
                    let losses = pool.install(|| {
                        (0..valid.nrows())
                            .into_par_iter()
                            .map_init(Vec::new, |nodes, index| -> Result<F> {
                                let y = valid.read_row(index, nodes)?;
                                let r = scale(nodes, normalization);
                                Ok(logistic_loss(score(nodes, r, store), y))
                            })
                            .collect::<Result<Vec<F>>>()
                    })?;
                    let total = losses.into_iter().fold(F::zero(), |acc, l| acc + l);
                    Some(mean(total, valid.nrows()))
                }
                _ => None,
            };

            if !self.quiet() {
                match valid_loss {
                    Some(v) => info!("epoch {:>4}  train {:.5}  valid {:.5}", epoch, train_loss, v),
                    None => info!("epoch {:>4}  train {:.5}", epoch, train_loss),
                }
            }
            history.push(EpochLoss {
                epoch,
                train: train_loss,
                valid: valid_loss,
            });
        }

        let model = store.compact(self.latent_dim())?;
        Ok((model, history))
    }
}

fn scale<F: Lanes>(row: &[Node<F>], normalization: bool) -> F {
    if normalization {
        row_scale(row)
    } else {
        F::one()
    }
}

fn mean<F: Lanes>(total: F, count: usize) -> F {
    if count == 0 {
        F::zero()
    } else {
        total / F::cast(count)
    }
}

fn sign<F: Lanes>(y: bool) -> F {
    if y {
        F::one()
    } else {
        -F::one()
    }
}

/// `ln(1 + exp(-y * t))` without overflow for large margins
fn logistic_loss<F: Lanes>(t: F, y: bool) -> F {
    let z = -sign::<F>(y) * t;
    if z > F::zero() {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Derivative of the logistic loss with respect to the score
fn loss_gradient<F: Lanes>(t: F, y: bool) -> F {
    let y = sign::<F>(y);
    -y * sigmoid(-y * t)
}
