//! Sparse, field-tagged rows and the sources that produce them
use crate::error::{FfmError, Result};
use linfa::dataset::Records;
use linfa::Float;
use ndarray::ArrayView1;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A single active feature of a row
///
/// `field` selects the group the feature belongs to, `feature` the global feature id.
/// Nodes referencing a field or feature outside of the model are ignored while
/// scoring and updating.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node<F> {
    pub field: usize,
    pub feature: usize,
    pub value: F,
}

impl<F> Node<F> {
    pub fn new(field: usize, feature: usize, value: F) -> Self {
        Node {
            field,
            feature,
            value,
        }
    }
}

/// Scale factor of a row when normalization is enabled
///
/// Returns the inverse euclidean norm of the row values. Rows without any non-zero
/// value have no defined norm and are scaled by zero, which makes all their
/// interactions vanish.
pub fn row_scale<F: Float>(row: &[Node<F>]) -> F {
    let sum = row
        .iter()
        .fold(F::zero(), |acc, node| acc + node.value * node.value);
    if sum > F::zero() {
        F::one() / sum.sqrt()
    } else {
        F::zero()
    }
}

/// A collection of sparse rows with their declared shape
///
/// `nfeatures` and `nfields` bound the model allocated when training on these rows.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct SparseRows<F> {
    rows: Vec<Vec<Node<F>>>,
    nfeatures: usize,
    nfields: usize,
}

impl<F: Float> SparseRows<F> {
    /// Collect rows and derive the number of features and fields from the largest ids
    pub fn new(rows: Vec<Vec<Node<F>>>) -> Self {
        let (nfeatures, nfields) = rows.iter().flatten().fold((0, 0), |(n, m), node| {
            (n.max(node.feature + 1), m.max(node.field + 1))
        });
        SparseRows {
            rows,
            nfeatures,
            nfields,
        }
    }

    /// Collect rows with an explicit shape. Nodes outside of it are kept but ignored by the model.
    pub fn with_shape(rows: Vec<Vec<Node<F>>>, nfeatures: usize, nfields: usize) -> Self {
        SparseRows {
            rows,
            nfeatures,
            nfields,
        }
    }

    pub fn rows(&self) -> &[Vec<Node<F>>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &[Node<F>] {
        &self.rows[index]
    }

    pub fn nfields(&self) -> usize {
        self.nfields
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<F: Float> Records for SparseRows<F> {
    type Elem = F;

    fn nsamples(&self) -> usize {
        self.rows.len()
    }

    fn nfeatures(&self) -> usize {
        self.nfeatures
    }
}

/// Supplier of labeled rows for training and validation
///
/// Rows are requested by index in increasing order once per epoch. A source may
/// fail on malformed input, which aborts training with the returned error.
pub trait RowSource<F>: Sync {
    /// Number of rows
    fn nrows(&self) -> usize;

    /// Upper bound (exclusive) of the feature ids
    fn nfeatures(&self) -> usize;

    /// Upper bound (exclusive) of the field ids
    fn nfields(&self) -> usize;

    /// Replace the content of `nodes` with the row at `index` and return its label,
    /// `true` for the positive class
    fn read_row(&self, index: usize, nodes: &mut Vec<Node<F>>) -> Result<bool>;
}

/// Borrowed sparse rows paired with their binary labels
#[derive(Clone, Debug)]
pub struct LabeledRows<'a, F> {
    rows: &'a SparseRows<F>,
    labels: ArrayView1<'a, bool>,
}

impl<'a, F: Float> LabeledRows<'a, F> {
    pub fn new(rows: &'a SparseRows<F>, labels: ArrayView1<'a, bool>) -> Result<Self> {
        if rows.nsamples() != labels.len() {
            return Err(FfmError::MismatchedShapes(rows.nsamples(), labels.len()));
        }
        Ok(LabeledRows { rows, labels })
    }
}

impl<'a, F: Float> RowSource<F> for LabeledRows<'a, F> {
    fn nrows(&self) -> usize {
        self.rows.nsamples()
    }

    fn nfeatures(&self) -> usize {
        self.rows.nfeatures()
    }

    fn nfields(&self) -> usize {
        self.rows.nfields()
    }

    fn read_row(&self, index: usize, nodes: &mut Vec<Node<F>>) -> Result<bool> {
        nodes.clear();
        nodes.extend_from_slice(self.rows.row(index));
        Ok(self.labels[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn shape_is_derived_from_largest_ids() {
        let rows = SparseRows::new(vec![
            vec![Node::new(0, 3, 1.0), Node::new(2, 1, 1.0)],
            vec![Node::new(1, 7, 0.5)],
        ]);
        assert_eq!(rows.nsamples(), 2);
        assert_eq!(rows.nfeatures(), 8);
        assert_eq!(rows.nfields(), 3);
    }

    #[test]
    fn empty_rows_have_no_shape() {
        let rows = SparseRows::<f32>::new(vec![]);
        assert!(rows.is_empty());
        assert_eq!(rows.nfeatures(), 0);
        assert_eq!(rows.nfields(), 0);
    }

    #[test]
    fn row_scale_is_inverse_norm() {
        let row = [Node::new(0, 0, 3.0), Node::new(1, 1, 4.0)];
        assert_abs_diff_eq!(row_scale(&row), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn row_scale_of_degenerate_rows_is_zero() {
        let zeros = [Node::new(0, 0, 0.0f32), Node::new(1, 1, 0.0)];
        assert_eq!(row_scale(&zeros), 0.0);
        assert_eq!(row_scale::<f64>(&[]), 0.0);
    }

    #[test]
    fn labeled_rows_replace_the_buffer() {
        let rows = SparseRows::new(vec![
            vec![Node::new(0, 0, 1.0)],
            vec![Node::new(0, 1, 2.0), Node::new(1, 2, 1.0)],
        ]);
        let labels = array![true, false];
        let source = LabeledRows::new(&rows, labels.view()).unwrap();

        let mut nodes = vec![Node::new(5, 5, 5.0); 4];
        assert!(source.read_row(0, &mut nodes).unwrap());
        assert_eq!(nodes, vec![Node::new(0, 0, 1.0)]);
        assert!(!source.read_row(1, &mut nodes).unwrap());
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn labeled_rows_check_lengths() {
        let rows = SparseRows::new(vec![vec![Node::new(0, 0, 1.0f64)]]);
        let labels = array![true, false];
        assert!(matches!(
            LabeledRows::new(&rows, labels.view()),
            Err(FfmError::MismatchedShapes(1, 2))
        ));
    }
}
