use crate::error::{Result, RnnError};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Outputs of a `scan`: the stacked per-step outputs and the state after every step.
#[derive(Clone, Debug)]
pub struct ScanOutput<B: Backend> {
    pub outputs: Tensor<B, 2>,
    pub states: Vec<Tensor<B, 2>>,
}

impl<B: Backend> ScanOutput<B> {
    pub fn final_state(&self) -> Option<&Tensor<B, 2>> {
        self.states.last()
    }
}

/// Applies `step(row, state) -> (output, next_state)` over the rows of `sequence`, carrying the
/// state from one row to the next.
///
/// Every step must return a single row, of the same width each time.
pub fn scan<B, F>(
    sequence: Tensor<B, 2>,
    initial_state: Tensor<B, 2>,
    mut step: F,
) -> Result<ScanOutput<B>>
where
    B: Backend,
    F: FnMut(Tensor<B, 2>, Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>),
{
    let [steps, _] = sequence.dims();
    if steps == 0 {
        return Err(RnnError::EmptySequence);
    }

    let mut outputs = Vec::with_capacity(steps);
    let mut states = Vec::with_capacity(steps);
    let mut state = initial_state;
    let mut width = None;

    for t in 0..steps {
        let row = sequence.clone().narrow(0, t, 1);
        let (output, next_state) = step(row, state);

        let [rows, cols] = output.dims();
        if rows != 1 {
            return Err(RnnError::ShapeMismatch {
                context: "scan step output rows",
                expected: 1,
                actual: rows,
            });
        }
        match width {
            None => width = Some(cols),
            Some(expected) if expected != cols => {
                return Err(RnnError::RaggedRows {
                    row: t,
                    expected,
                    actual: cols,
                });
            }
            _ => {}
        }

        outputs.push(output);
        states.push(next_state.clone());
        state = next_state;
    }

    Ok(ScanOutput {
        outputs: Tensor::cat(outputs, 0),
        states,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{column, row, values, Cpu};

    #[test]
    fn running_sum() {
        let seq = column(vec![1.0, 2.0, 3.0, 4.0]);
        let out = scan(seq, row(vec![0.0]), |x, s| {
            let total = x + s;
            (total.clone(), total)
        })
        .unwrap();
        assert_eq!(values(&out.outputs), vec![1.0, 3.0, 6.0, 10.0]);
        assert_eq!(out.final_state().map(values), Some(vec![10.0]));
        assert_eq!(out.states.len(), 4);
    }

    #[test]
    fn output_and_state_can_differ() {
        // Output is the previous state; the sequence is shifted by one step.
        let seq = column(vec![5.0, 6.0, 7.0]);
        let out = scan(seq, row(vec![-1.0]), |x, s| (s, x)).unwrap();
        assert_eq!(values(&out.outputs), vec![-1.0, 5.0, 6.0]);
    }

    #[test]
    fn ragged_outputs_are_an_error() {
        let seq = column(vec![1.0, 2.0]);
        let mut first = true;
        let result = scan(seq, row(vec![]), |_x, s| {
            let width = if first { 1 } else { 2 };
            first = false;
            (row(vec![0.0; width]), s)
        });
        assert!(result.is_err());
    }

    #[test]
    fn empty_sequence_is_an_error() {
        let seq: Tensor<Cpu, 2> = column(vec![]);
        match scan(seq, row(vec![]), |x, s| (x, s)) {
            Err(RnnError::EmptySequence) => {}
            other => panic!("unexpected {:?}", other.map(|o| o.states.len())),
        }
    }
}
