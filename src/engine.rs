use std::collections::BTreeMap;

use burn::{
    config::Config,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::batcher::SequenceBatcher;
use crate::error::{ForecastError, Result as ForecastResult};
use crate::metrics::{self, TrainingReport};
use crate::model::{ModelConfig, SequenceModel};
use crate::normalization::{self, NormalizationParams};
use crate::record::{self, DatasetCategory, RawRecord, YearlyRecord};
use crate::sequence::{self, feature_row};
use crate::source::RecordSource;
use crate::store::ModelStore;

/// Progress events are emitted at this cadence (plus the final epoch) to
/// bound callback overhead.
const PROGRESS_EVERY: usize = 20;

#[derive(Config, Debug)]
pub struct TrainConfig {
    pub lookback: usize,
    pub input_features: Vec<String>,
    pub target_features: Vec<String>,
    #[config(default = 100)]
    pub epochs: usize,
    #[config(default = 0.2)]
    pub validation_split: f64,
    #[config(default = 1e-3)]
    pub learning_rate: f64,
    #[config(default = 64)]
    pub hidden_size: usize,
}

/// Snapshot of one reported training epoch. Epoch indices are monotonically
/// increasing; no other ordering is guaranteed to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingProgress {
    pub epoch: usize,
    pub loss: f64,
    pub mae: f64,
    pub val_loss: Option<f64>,
    pub val_mae: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Preparing,
    Training,
    Trained,
    Forecasting,
}

/// The sole persisted state needed to resume forecasting without retraining.
/// Overwritten wholesale on retrain, erased on model deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastMetadata {
    pub model_type: String,
    pub lookback: usize,
    pub input_features: Vec<String>,
    pub target_features: Vec<String>,
    pub hidden_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub normalization_params: NormalizationParams,
    pub last_observed_year: i32,
    /// The final `lookback` cleaned (pre-normalization) records.
    pub last_window: Vec<YearlyRecord>,
    pub training_metrics: TrainingReport,
    pub trained_at: DateTime<Utc>,
}

/// One forecast year: rounded value per target feature plus a derived total.
/// Produced only by the rollout; never persisted beside historical rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRow {
    pub year: i32,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
    pub total: f64,
    pub is_forecast: bool,
}

/// End-to-end owner of the forecasting workflow for one dataset category:
/// clean, sort, normalize, window, train, evaluate, persist, roll forward.
/// One engine per category; the model handle is mutated in place by training,
/// so concurrent `train` calls on one engine are rejected rather than
/// interleaved.
pub struct ForecastEngine<B: AutodiffBackend> {
    device: B::Device,
    store: ModelStore,
    logical_name: String,
    state: EngineState,
    model: Option<SequenceModel<B>>,
    metadata: Option<ForecastMetadata>,
    rollout_window: Option<Vec<YearlyRecord>>,
}

impl<B: AutodiffBackend> ForecastEngine<B> {
    pub fn new(device: B::Device, store: ModelStore, logical_name: impl Into<String>) -> Self {
        Self {
            device,
            store,
            logical_name: logical_name.into(),
            state: EngineState::Idle,
            model: None,
            metadata: None,
            rollout_window: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn metadata(&self) -> Option<&ForecastMetadata> {
        self.metadata.as_ref()
    }

    /// Window as it stood after the most recent rollout: the oldest records
    /// of the observed window replaced by the newly predicted synthetic ones.
    pub fn last_rollout_window(&self) -> Option<&[YearlyRecord]> {
        self.rollout_window.as_deref()
    }

    /// Fetch the category's records from the record store, then train.
    /// Training itself is CPU-bound and runs on the calling task.
    pub async fn train_from_source<S: RecordSource>(
        &mut self,
        source: &S,
        category: DatasetCategory,
        config: TrainConfig,
        progress: Option<Sender<TrainingProgress>>,
    ) -> ForecastResult<TrainingReport> {
        let raw = source
            .list_records(category)
            .await
            .map_err(|e| ForecastError::Training(e.to_string()))?;
        self.train(&raw, config, progress)
    }

    /// Run the full training workflow and persist the resulting model and
    /// metadata. Any failure resets the engine to `Idle` with no partially
    /// trained model kept.
    pub fn train(
        &mut self,
        raw: &[RawRecord],
        config: TrainConfig,
        progress: Option<Sender<TrainingProgress>>,
    ) -> ForecastResult<TrainingReport> {
        if self.state == EngineState::Training || self.state == EngineState::Preparing {
            return Err(ForecastError::TrainingInProgress);
        }
        self.state = EngineState::Preparing;
        let result = self.run_training(raw, config, progress);
        match result {
            Ok(_) => self.state = EngineState::Trained,
            Err(_) => {
                self.state = EngineState::Idle;
                self.model = None;
                self.metadata = None;
                self.rollout_window = None;
            }
        }
        result
    }

    fn run_training(
        &mut self,
        raw: &[RawRecord],
        config: TrainConfig,
        progress: Option<Sender<TrainingProgress>>,
    ) -> ForecastResult<TrainingReport> {
        if config.lookback == 0 {
            return Err(ForecastError::Training("lookback must be at least 1".into()));
        }
        if config.input_features.is_empty() || config.target_features.is_empty() {
            return Err(ForecastError::Training(
                "input and target feature lists must not be empty".into(),
            ));
        }

        // Clean over the union of input and target features, then sort; the
        // sequence builder expects chronological order and does not sort.
        let mut features = config.input_features.clone();
        for feature in &config.target_features {
            if !features.contains(feature) {
                features.push(feature.clone());
            }
        }
        let mut cleaned = record::clean(raw, &features);
        cleaned.sort_by_key(|r| r.year);

        let params = normalization::compute_params(&cleaned, Some(&features))?;
        let normalized = normalization::normalize(&cleaned, &params);
        let (sequences, targets) = sequence::build_sequences(
            &normalized,
            config.lookback,
            &config.input_features,
            &config.target_features,
        )?;
        if sequences.is_empty() {
            return Err(ForecastError::Training(format!(
                "need at least {} records to build one training sequence, got {}",
                config.lookback + 1,
                cleaned.len()
            )));
        }
        let target_rows: Vec<Vec<f64>> = targets.iter().map(|t| t.to_vec()).collect();

        // Chronological split, newest slice held out for validation. Time
        // series sequences are never shuffled.
        let n = sequences.len();
        let mut n_valid = (n as f64 * config.validation_split) as usize;
        if n_valid >= n {
            warn!(
                "validation split {} leaves no training sequences, training on all {}",
                config.validation_split, n
            );
            n_valid = 0;
        }
        let n_train = n - n_valid;

        self.state = EngineState::Training;
        info!(
            "training `{}`: {} sequences ({} train / {} validation), lookback {}, {} epochs",
            self.logical_name, n, n_train, n_valid, config.lookback, config.epochs
        );

        let batcher = SequenceBatcher::<B>::new(self.device.clone());
        let inner_batcher = SequenceBatcher::<B::InnerBackend>::new(self.device.clone());
        let train_batch = batcher.batch(&sequences[..n_train], &target_rows[..n_train]);
        let valid_batch = if n_valid > 0 {
            Some(inner_batcher.batch(&sequences[n_train..], &target_rows[n_train..]))
        } else {
            None
        };

        let model_config = ModelConfig::new(
            config.input_features.len(),
            config.target_features.len(),
        )
        .with_hidden_size(config.hidden_size);
        let mut model = model_config.init::<B>(&self.device);
        let mut optim = AdamConfig::new().init();

        for epoch in 1..=config.epochs {
            let (loss, output) = model.forward_loss(
                train_batch.inputs.clone(),
                train_batch.targets.clone(),
            );
            let loss_value = loss.clone().into_scalar().elem::<f64>();
            let mae_value = output
                .sub(train_batch.targets.clone())
                .abs()
                .mean()
                .into_scalar()
                .elem::<f64>();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(config.learning_rate, model, grads);

            if epoch % PROGRESS_EVERY == 0 || epoch == config.epochs {
                let (val_loss, val_mae) = match &valid_batch {
                    Some(batch) => {
                        let (loss, output) = model
                            .valid()
                            .forward_loss(batch.inputs.clone(), batch.targets.clone());
                        let mae = output.sub(batch.targets.clone()).abs().mean();
                        (
                            Some(loss.into_scalar().elem::<f64>()),
                            Some(mae.into_scalar().elem::<f64>()),
                        )
                    }
                    None => (None, None),
                };
                info!(
                    "epoch {}/{}: loss {:.6}, mae {:.6}",
                    epoch, config.epochs, loss_value, mae_value
                );
                if let Some(sender) = &progress {
                    // A dropped receiver never interrupts training.
                    let _ = sender.send(TrainingProgress {
                        epoch,
                        loss: loss_value,
                        mae: mae_value,
                        val_loss,
                        val_mae,
                    });
                }
            }
        }

        // Evaluate the trained model over the full training set in real
        // units: denormalize predictions and actuals per target.
        let trained = model.valid();
        let full_batch = inner_batcher.batch(&sequences, &target_rows);
        let predictions = trained.forward(full_batch.inputs);
        let predicted_rows: Vec<f64> = predictions.into_data().iter::<f64>().collect();

        let n_targets = config.target_features.len();
        let (mins, maxs) = normalization::bounds_for(&params, &config.target_features)?;
        let mut actual_series: Vec<Vec<f64>> = vec![Vec::with_capacity(n); n_targets];
        let mut predicted_series: Vec<Vec<f64>> = vec![Vec::with_capacity(n); n_targets];
        for (i, actual_row) in target_rows.iter().enumerate() {
            let actual = normalization::denormalize_vec(actual_row, &mins, &maxs);
            let predicted = normalization::denormalize_vec(
                &predicted_rows[i * n_targets..(i + 1) * n_targets],
                &mins,
                &maxs,
            );
            for t in 0..n_targets {
                actual_series[t].push(actual[t]);
                predicted_series[t].push(predicted[t]);
            }
        }
        let report =
            metrics::evaluate_multi(&config.target_features, &actual_series, &predicted_series)?;

        let last_observed_year = cleaned.last().map(|r| r.year).unwrap_or_default();
        let metadata = ForecastMetadata {
            model_type: "lstm".into(),
            lookback: config.lookback,
            input_features: config.input_features.clone(),
            target_features: config.target_features.clone(),
            hidden_size: config.hidden_size,
            epochs: config.epochs,
            learning_rate: config.learning_rate,
            validation_split: config.validation_split,
            normalization_params: params,
            last_observed_year,
            last_window: cleaned[cleaned.len() - config.lookback..].to_vec(),
            training_metrics: report.clone(),
            trained_at: Utc::now(),
        };

        self.store.save(&self.logical_name, &model, &metadata)?;
        info!(
            "trained `{}` through {}, overall mae {:.2}",
            self.logical_name, last_observed_year, report.overall.mae
        );

        self.model = Some(model);
        self.metadata = Some(metadata);
        self.rollout_window = None;
        Ok(report)
    }

    /// Iterative multi-step forecast: each predicted year is denormalized and
    /// fed back as the newest window entry for the next step, so forecast
    /// error compounds across the horizon by construction. Steps must run in
    /// order; no parallelism is possible here.
    pub fn forecast(&mut self, horizon_years: usize) -> ForecastResult<Vec<ForecastRow>> {
        let trained = match &self.model {
            Some(model) => model.valid(),
            None => return Err(ForecastError::NoTrainedModel),
        };
        let metadata = match self.metadata.clone() {
            Some(metadata) => metadata,
            None => return Err(ForecastError::NoTrainedModel),
        };

        self.state = EngineState::Forecasting;
        let result = self.run_rollout(&trained, &metadata, horizon_years);
        self.state = EngineState::Trained;
        let (rows, window) = result?;
        self.rollout_window = Some(window);
        Ok(rows)
    }

    fn run_rollout(
        &self,
        trained: &SequenceModel<B::InnerBackend>,
        metadata: &ForecastMetadata,
        horizon_years: usize,
    ) -> ForecastResult<(Vec<ForecastRow>, Vec<YearlyRecord>)> {
        let batcher = SequenceBatcher::<B::InnerBackend>::new(self.device.clone());
        let params = &metadata.normalization_params;
        let (mins, maxs) = normalization::bounds_for(params, &metadata.target_features)?;

        let mut window = metadata.last_window.clone();
        let mut rows = Vec::with_capacity(horizon_years);
        for step in 0..horizon_years {
            let normalized = normalization::normalize(&window, params);
            let input_rows = normalized
                .iter()
                .map(|record| feature_row(record, &metadata.input_features))
                .collect::<ForecastResult<Vec<_>>>()?;
            let output = trained.forward(batcher.window(&input_rows));
            let predicted: Vec<f64> = output.into_data().iter::<f64>().collect();
            let denormalized = normalization::denormalize_vec(&predicted, &mins, &maxs);

            let year = metadata.last_observed_year + step as i32 + 1;
            let mut values = BTreeMap::new();
            for (feature, value) in metadata.target_features.iter().zip(&denormalized) {
                values.insert(feature.clone(), value.round());
            }
            let total = values.values().sum();
            rows.push(ForecastRow {
                year,
                values,
                total,
                is_forecast: true,
            });

            // Autoregressive feedback: drop the oldest record, append a
            // synthetic one carrying the raw predictions. Non-target input
            // features keep the previous record's value.
            let mut synthetic = window.last().map(|r| r.values.clone()).unwrap_or_default();
            for (feature, value) in metadata.target_features.iter().zip(&denormalized) {
                synthetic.insert(feature.clone(), *value);
            }
            window.remove(0);
            window.push(YearlyRecord {
                year,
                values: synthetic,
            });
        }

        Ok((rows, window))
    }

    /// Restore a previously persisted model and metadata under this engine's
    /// logical name. Returns false when none exists.
    pub fn load_model(&mut self) -> ForecastResult<bool> {
        match self.store.load::<B>(&self.logical_name, &self.device)? {
            Some((model, metadata)) => {
                self.model = Some(model);
                self.metadata = Some(metadata);
                self.rollout_window = None;
                self.state = EngineState::Trained;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Erase the persisted artifact and clear all in-memory state.
    pub fn delete_model(&mut self) -> ForecastResult<()> {
        self.store.delete(&self.logical_name)?;
        self.model = None;
        self.metadata = None;
        self.rollout_window = None;
        self.state = EngineState::Idle;
        Ok(())
    }
}
