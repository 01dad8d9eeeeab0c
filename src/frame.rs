//! Tabular input with dynamically typed cells
//!
//! A [`Frame`] stores rows of [`Cell`]s under named columns. [`Frame::field_rows`]
//! selects an integer response column and a list of feature columns; every
//! feature column becomes one field, and every entry of its dictionary cells
//! becomes a [`Node`] of that field. Type errors are reported when a row is read,
//! so training stops at the first malformed row.
use crate::error::{FfmError, Result};
use crate::node::{Node, RowSource, SparseRows};
use linfa::{DatasetBase, Float};
use ndarray::Array1;

/// A single value of a frame
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Undefined,
    Integer(i64),
    Float(f64),
    Text(String),
    Dict(Vec<(Cell, Cell)>),
}

impl Cell {
    /// Name of the cell type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Undefined => "undefined",
            Cell::Integer(_) => "integer",
            Cell::Float(_) => "float",
            Cell::Text(_) => "string",
            Cell::Dict(_) => "dict",
        }
    }

    fn as_number(&self) -> Option<f64> {
        match *self {
            Cell::Integer(v) => Some(v as f64),
            Cell::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Integer(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl<K: Into<Cell>, V: Into<Cell>> From<Vec<(K, V)>> for Cell {
    fn from(entries: Vec<(K, V)>) -> Self {
        Cell::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Rows of cells under named columns
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Frame {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, which must hold one cell per column
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(FfmError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// View the frame as labeled sparse rows
    ///
    /// The field of a node is the position of its column in `features`. The number
    /// of features defaults to the largest integer id found in the feature columns
    /// plus one.
    pub fn field_rows<S: AsRef<str>>(&self, target: &str, features: &[S]) -> Result<FrameRows<'_>> {
        let index = |name: &str| {
            self.column_index(name)
                .ok_or_else(|| FfmError::UnknownColumn(name.to_string()))
        };
        let target = index(target)?;
        let features = features
            .iter()
            .map(|name| index(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let nfeatures = self
            .rows
            .iter()
            .flat_map(|row| features.iter().map(move |&col| &row[col]))
            .filter_map(|cell| match cell {
                Cell::Dict(entries) => Some(entries),
                _ => None,
            })
            .flatten()
            .filter_map(|(key, _)| match *key {
                Cell::Integer(id) if id >= 0 => Some(id as usize + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        Ok(FrameRows {
            frame: self,
            target,
            features,
            nfeatures,
        })
    }
}

/// Labeled sparse rows read from a [`Frame`]
#[derive(Clone, Debug)]
pub struct FrameRows<'a> {
    frame: &'a Frame,
    target: usize,
    features: Vec<usize>,
    nfeatures: usize,
}

impl<'a> FrameRows<'a> {
    /// Override the number of features, ids at or above it are ignored by the model
    pub fn with_nfeatures(mut self, nfeatures: usize) -> Self {
        self.nfeatures = nfeatures;
        self
    }

    /// Read every row into a dataset of sparse rows and boolean targets
    pub fn to_dataset<F: Float>(&self) -> Result<DatasetBase<SparseRows<F>, Array1<bool>>> {
        let mut rows = Vec::with_capacity(self.frame.nrows());
        let mut labels = Vec::with_capacity(self.frame.nrows());
        let mut nodes = Vec::new();
        for index in 0..self.frame.nrows() {
            labels.push(self.read_row(index, &mut nodes)?);
            rows.push(nodes.clone());
        }
        let rows = SparseRows::with_shape(rows, self.nfeatures, self.features.len());
        Ok(DatasetBase::new(rows, Array1::from(labels)))
    }

    fn feature_error(&self, row: usize, field: usize, reason: String) -> FfmError {
        FfmError::FeatureType {
            row,
            column: self.frame.columns[self.features[field]].clone(),
            reason,
        }
    }
}

impl<'a, F: Float> RowSource<F> for FrameRows<'a> {
    fn nrows(&self) -> usize {
        self.frame.nrows()
    }

    fn nfeatures(&self) -> usize {
        self.nfeatures
    }

    fn nfields(&self) -> usize {
        self.features.len()
    }

    fn read_row(&self, index: usize, nodes: &mut Vec<Node<F>>) -> Result<bool> {
        let row = &self.frame.rows[index];
        let label = match row[self.target] {
            Cell::Integer(y) => y > 0,
            ref other => {
                return Err(FfmError::LabelType {
                    row: index,
                    found: other.type_name(),
                })
            }
        };

        nodes.clear();
        for (field, &col) in self.features.iter().enumerate() {
            let entries = match &row[col] {
                Cell::Undefined => continue,
                Cell::Dict(entries) => entries,
                other => {
                    return Err(self.feature_error(
                        index,
                        field,
                        format!("must be a dict, found {}", other.type_name()),
                    ))
                }
            };
            for (key, value) in entries {
                let feature = match *key {
                    Cell::Integer(id) => id,
                    ref other => {
                        return Err(self.feature_error(
                            index,
                            field,
                            format!("has a {} key, ids must be integers", other.type_name()),
                        ))
                    }
                };
                let value = value.as_number().ok_or_else(|| {
                    self.feature_error(
                        index,
                        field,
                        format!("has a {} value, values must be numeric", value.type_name()),
                    )
                })?;
                // negative ids are outside of every model
                if feature >= 0 {
                    nodes.push(Node::new(field, feature as usize, F::cast(value)));
                }
            }
        }
        Ok(label)
    }
}
