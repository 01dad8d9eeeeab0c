//! # Field-aware Factorization Machines
//!
//! ## The Big Picture
//!
//! `linfa-ffm` is a crate in the [`linfa`](https://crates.io/crates/linfa) ecosystem, an effort to create a toolkit for classical Machine Learning implemented in pure Rust, akin to Python's `scikit-learn`.
//!
//! ## Current state
//!
//! `linfa-ffm` provides a binary classifier for sparse, field-tagged rows as they occur in
//! click-through-rate prediction. Every feature keeps one latent vector per field; a pair of
//! features from different fields interacts through the vector each one keeps for the field of
//! the other. The model is trained with stochastic gradient descent on the logistic loss and
//! per-coordinate AdaGrad step sizes.
//!
//! Training and validation rows are read through the [`RowSource`] trait. It is implemented by
//! linfa datasets of [`SparseRows`] and by the tabular [`Frame`] input.
//!
//! ## Examples
//!
//! ```
//! use linfa::prelude::*;
//! use linfa_ffm::{Ffm, Node, SparseRows};
//! use ndarray::array;
//!
//! let rows = SparseRows::new(vec![
//!     vec![Node::new(0, 0, 1.0), Node::new(1, 2, 1.0)],
//!     vec![Node::new(0, 1, 1.0), Node::new(1, 3, 1.0)],
//! ]);
//! let dataset = DatasetBase::new(rows, array![true, false]);
//!
//! let model = Ffm::<f32>::params()
//!     .iterations(20)
//!     .quiet(true)
//!     .fit(&dataset)
//!     .unwrap();
//! let probabilities = model.predict(&dataset);
//! assert!(*probabilities[0] > *probabilities[1]);
//! ```
//!
//! There is a usage example in the `demos/` directory. To run, use:
//!
//! ```bash
//! $ cargo run --example ctr_toy
//! ```
//!
mod algorithm;
mod buffer;
pub mod engine;
mod error;
mod frame;
mod hyperparams;
pub mod kernel;
mod model;
mod node;
mod persistence;
mod store;

pub use algorithm::EpochLoss;
pub use buffer::{AlignedBuffer, ALIGN_BYTES};
pub use error::{FfmError, Result};
pub use frame::{Cell, Frame, FrameRows};
pub use hyperparams::{FfmParams, FfmValidParams};
pub use kernel::Lanes;
pub use model::FieldAwareFactorizationMachine;
pub use node::{row_scale, LabeledRows, Node, RowSource, SparseRows};
pub use store::WeightStore;

/// Short name of [`FieldAwareFactorizationMachine`]
pub type Ffm<F> = FieldAwareFactorizationMachine<F>;
