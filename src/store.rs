use std::fs;
use std::path::PathBuf;

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use log::debug;

use crate::engine::ForecastMetadata;
use crate::error::{ForecastError, Result};
use crate::model::{ModelConfig, SequenceModel};

const MODEL_FILE: &str = "model";
const METADATA_FILE: &str = "metadata.json";

/// Downloadable artifact plus its JSON metadata, for the export operation.
#[derive(Debug, Clone)]
pub struct ModelExport {
    pub model_bytes: Vec<u8>,
    pub metadata_json: String,
}

/// Durable storage for trained models and their metadata, one directory per
/// logical name. Single-writer: only the engine that trained a model should
/// save over its name; concurrent save/load from several processes is
/// undefined behavior.
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn save<B: Backend>(
        &self,
        name: &str,
        model: &SequenceModel<B>,
        metadata: &ForecastMetadata,
    ) -> Result<()> {
        let dir = self.model_dir(name);
        fs::create_dir_all(&dir).map_err(persistence)?;
        let json = serde_json::to_string_pretty(metadata).map_err(persistence)?;
        fs::write(dir.join(METADATA_FILE), json).map_err(persistence)?;
        model
            .clone()
            .save_file(dir.join(MODEL_FILE), &CompactRecorder::new())
            .map_err(persistence)?;
        debug!("saved model `{name}` to {}", dir.display());
        Ok(())
    }

    /// Restore a model and its metadata, rebuilding the network from the
    /// architecture fields persisted alongside it. `None` when no model is
    /// stored under the name.
    pub fn load<B: Backend>(
        &self,
        name: &str,
        device: &B::Device,
    ) -> Result<Option<(SequenceModel<B>, ForecastMetadata)>> {
        let dir = self.model_dir(name);
        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&metadata_path).map_err(persistence)?;
        let metadata: ForecastMetadata = serde_json::from_str(&json).map_err(persistence)?;
        let model = ModelConfig::new(
            metadata.input_features.len(),
            metadata.target_features.len(),
        )
        .with_hidden_size(metadata.hidden_size)
        .init::<B>(device)
        .load_file(dir.join(MODEL_FILE), &CompactRecorder::new(), device)
        .map_err(persistence)?;
        Ok(Some((model, metadata)))
    }

    /// Remove the persisted artifact and metadata. Deleting a name that was
    /// never saved is not an error.
    pub fn delete(&self, name: &str) -> Result<()> {
        let dir = self.model_dir(name);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(persistence)?;
            debug!("deleted model `{name}`");
        }
        Ok(())
    }

    pub fn export(&self, name: &str) -> Result<ModelExport> {
        let dir = self.model_dir(name);
        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.exists() {
            return Err(ForecastError::NoTrainedModel);
        }
        Ok(ModelExport {
            model_bytes: fs::read(dir.join(format!("{MODEL_FILE}.mpk"))).map_err(persistence)?,
            metadata_json: fs::read_to_string(metadata_path).map_err(persistence)?,
        })
    }
}

fn persistence(err: impl std::fmt::Display) -> ForecastError {
    ForecastError::ModelPersistence(err.to_string())
}
