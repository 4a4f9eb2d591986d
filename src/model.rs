use burn::{
    config::Config,
    module::Module,
    nn::{
        loss::{MseLoss, Reduction},
        Linear, LinearConfig, Lstm, LstmConfig,
    },
    tensor::{backend::Backend, Tensor},
};

#[derive(Config, Debug)]
pub struct ModelConfig {
    pub input_size: usize,
    pub target_size: usize,
    #[config(default = 64)]
    pub hidden_size: usize,
}

/// Recurrent sequence model: LSTM over the lookback window, linear head over
/// the final hidden state predicting all target features jointly.
#[derive(Module, Debug)]
pub struct SequenceModel<B: Backend> {
    lstm: Lstm<B>,
    head: Linear<B>,
}

impl ModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SequenceModel<B> {
        SequenceModel {
            lstm: LstmConfig::new(self.input_size, self.hidden_size, true).init(device),
            head: LinearConfig::new(self.hidden_size, self.target_size).init(device),
        }
    }
}

impl<B: Backend> SequenceModel<B> {
    /// [batch, lookback, input_features] -> [batch, target_features]
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        let (hidden, _state) = self.lstm.forward(input, None);
        let [batch, seq_len, hidden_size] = hidden.dims();
        let last = hidden
            .slice([0..batch, seq_len - 1..seq_len, 0..hidden_size])
            .reshape([batch, hidden_size]);
        self.head.forward(last)
    }

    /// Forward pass plus mean-squared-error loss against the targets.
    pub fn forward_loss(
        &self,
        input: Tensor<B, 3>,
        targets: Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let output = self.forward(input);
        let loss = MseLoss::new().forward(output.clone(), targets, Reduction::Mean);
        (loss, output)
    }
}
