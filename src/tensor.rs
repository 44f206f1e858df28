use crate::error::{Result, RnnError};
use burn::backend::{Autodiff, NdArray};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Backend networks are stored and evaluated on.
pub type Cpu = NdArray<f64>;

/// `Cpu` with gradient tracking. Objectives are differentiated on it.
pub type CpuAutodiff = Autodiff<Cpu>;

/// A `time x feature` sequence or an `n_in x n_out` weight matrix.
pub type Matrix<B = Cpu> = Tensor<B, 2>;

/// Builds a `rows x cols` tensor from row-major values.
pub fn matrix<B: Backend>(
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    device: &B::Device,
) -> Result<Tensor<B, 2>> {
    if values.len() != rows * cols {
        return Err(RnnError::ShapeMismatch {
            context: "matrix data",
            expected: rows * cols,
            actual: values.len(),
        });
    }
    let data = TensorData::new(values, [rows, cols]).convert::<B::FloatElem>();
    Ok(Tensor::from_data(data, device))
}

/// Stacks rows into a matrix. Every row must have the same length.
pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Matrix> {
    let nrows = rows.len();
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut values = Vec::with_capacity(nrows * ncols);
    for (idx, row) in rows.into_iter().enumerate() {
        if row.len() != ncols {
            return Err(RnnError::RaggedRows {
                row: idx,
                expected: ncols,
                actual: row.len(),
            });
        }
        values.extend(row);
    }
    matrix(nrows, ncols, values, &Default::default())
}

/// A single-feature sequence.
pub fn column(values: Vec<f64>) -> Matrix {
    let rows = values.len();
    let data = TensorData::new(values, [rows, 1]);
    Tensor::from_data(data, &Default::default())
}

/// A `1 x n` row.
pub fn row(values: Vec<f64>) -> Matrix {
    let cols = values.len();
    let data = TensorData::new(values, [1, cols]);
    Tensor::from_data(data, &Default::default())
}

/// Standard normal initialisation.
pub fn randn<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
    let values: Vec<f64> = (0..rows * cols)
        .map(|_| Distribution::<f64>::sample(&StandardNormal, rng))
        .collect();
    Tensor::from_data(TensorData::new(values, [rows, cols]), &Default::default())
}

/// Row-major copy of the entries.
pub fn values<B: Backend>(tensor: &Tensor<B, 2>) -> Vec<f64> {
    tensor.to_data().iter::<f64>().collect()
}

pub fn to_rows<B: Backend>(tensor: &Tensor<B, 2>) -> Vec<Vec<f64>> {
    let [_, cols] = tensor.dims();
    let values = values(tensor);
    if cols == 0 {
        return vec![];
    }
    values.chunks(cols).map(|row| row.to_vec()).collect()
}

/// Moves a tensor onto the autodiff backend as a constant.
pub fn lift(tensor: &Matrix) -> Matrix<CpuAutodiff> {
    Tensor::from_inner(tensor.clone())
}
