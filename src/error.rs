use thiserror::Error;

/// Typed failures of the forecasting core. Cleaning never fails; everything
/// downstream fails fast on the first structural problem instead of training
/// on partially-zeroed data.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("dataset is empty")]
    EmptyDataset,

    #[error("record is missing required feature `{0}`")]
    MissingFeature(String),

    #[error("actual/predicted series are empty or of mismatched length")]
    EmptyOrMismatchedInput,

    #[error("training failed: {0}")]
    Training(String),

    #[error("a training run is already in progress")]
    TrainingInProgress,

    #[error("no trained model is available")]
    NoTrainedModel,

    #[error("model persistence failed: {0}")]
    ModelPersistence(String),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
