use burn::tensor::{backend::Backend, Tensor, TensorData};

use crate::sequence::Sequence;

#[derive(Clone, Debug)]
pub struct SequenceBatch<B: Backend> {
    pub inputs: Tensor<B, 3>,
    pub targets: Tensor<B, 2>,
}

/// Flattens already-normalized sequences and targets into batched tensors.
pub struct SequenceBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// `sequences`: [n][lookback][input_features], `targets`: [n][target_features].
    /// All rows must be rectangular; the sequence builder guarantees that.
    pub fn batch(&self, sequences: &[Sequence], targets: &[Vec<f64>]) -> SequenceBatch<B> {
        let n = sequences.len();
        let lookback = sequences.first().map(|s| s.len()).unwrap_or(0);
        let input_width = sequences
            .first()
            .and_then(|s| s.first())
            .map(|row| row.len())
            .unwrap_or(0);
        let target_width = targets.first().map(|t| t.len()).unwrap_or(0);

        let mut inputs_data = Vec::with_capacity(n * lookback * input_width);
        for sequence in sequences {
            for row in sequence {
                inputs_data.extend(row.iter().map(|&v| v as f32));
            }
        }
        let mut targets_data = Vec::with_capacity(n * target_width);
        for target in targets {
            targets_data.extend(target.iter().map(|&v| v as f32));
        }

        SequenceBatch {
            inputs: Tensor::<B, 3>::from_floats(
                TensorData::new(inputs_data, [n, lookback, input_width]),
                &self.device,
            ),
            targets: Tensor::<B, 2>::from_floats(
                TensorData::new(targets_data, [n, target_width]),
                &self.device,
            ),
        }
    }

    /// Single forecasting window as a batch of one: [1, lookback, input_features].
    pub fn window(&self, rows: &[Vec<f64>]) -> Tensor<B, 3> {
        let lookback = rows.len();
        let input_width = rows.first().map(|row| row.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(lookback * input_width);
        for row in rows {
            data.extend(row.iter().map(|&v| v as f32));
        }
        Tensor::<B, 3>::from_floats(TensorData::new(data, [1, lookback, input_width]), &self.device)
    }
}
