use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::network::model::BasicModel;
use crate::network::network::Network;
use crate::optim::adam::Adam;

/// Name of the index file that records which checkpoints exist.
pub const INDEX_FILE: &str = "checkpoint";

/// Everything needed to resume training: parameters, optimizer moments and
/// the global step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub global_step: u64,
    pub network: Network,
    pub optimizer: Adam,
}

impl Checkpoint {
    pub fn from_model(model: &BasicModel) -> Checkpoint {
        Checkpoint {
            global_step: model.global_step,
            network: model.network.clone(),
            optimizer: model.optimizer.clone(),
        }
    }

    /// Moves the saved state into `model`, replacing its parameters.
    pub fn restore_into(self, model: &mut BasicModel) -> Result<()> {
        if self.network.layers.len() != model.network.layers.len() {
            return Err(Error::shape(
                format!("{} layers", model.network.layers.len()),
                self.network.layers.len(),
            ));
        }
        for (saved, live) in self.network.layers.iter().zip(&model.network.layers) {
            if saved.weights.rows != live.weights.rows || saved.weights.cols != live.weights.cols {
                return Err(Error::shape(
                    format!("{}x{} kernel", live.weights.rows, live.weights.cols),
                    format!("{}x{}", saved.weights.rows, saved.weights.cols),
                ));
            }
            if saved.size != live.size || saved.biases.rows != 1 || saved.biases.cols != live.size {
                return Err(Error::shape(
                    format!("1x{} bias", live.size),
                    format!("{}x{} (size {})", saved.biases.rows, saved.biases.cols, saved.size),
                ));
            }
        }
        self.optimizer.check_moments(&self.network)?;
        model.network = self.network;
        model.optimizer = self.optimizer;
        model.global_step = self.global_step;
        Ok(())
    }

    /// Serializes the checkpoint to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Deserializes a checkpoint previously written by `save_json`.
    pub fn load_json(path: &Path) -> Result<Checkpoint> {
        let file = fs::File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Contents of the index file. Paths are relative to the model directory,
/// oldest first; the last one is the latest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CheckpointIndex {
    model_checkpoint_path: String,
    all_model_checkpoint_paths: Vec<String>,
}

/// Writes `model.ckpt-<step>.json` files into a model directory and keeps
/// at most `keep_max` of them.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
    keep_max: usize,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>, keep_max: usize) -> CheckpointManager {
        CheckpointManager {
            dir: dir.into(),
            keep_max: keep_max.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(global_step: u64) -> String {
        format!("model.ckpt-{}.json", global_step)
    }

    /// Saves `checkpoint`, updates the index and prunes old files.
    /// Returns the path written.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let name = Self::file_name(checkpoint.global_step);
        let path = self.dir.join(&name);
        info!(
            "Saving checkpoints for {} into {}.",
            checkpoint.global_step,
            path.display()
        );
        checkpoint.save_json(&path)?;

        let mut index = self.read_index()?.unwrap_or_default();
        index.all_model_checkpoint_paths.retain(|p| p != &name);
        index.all_model_checkpoint_paths.push(name.clone());
        index.model_checkpoint_path = name;

        while index.all_model_checkpoint_paths.len() > self.keep_max {
            let stale = index.all_model_checkpoint_paths.remove(0);
            if let Err(e) = fs::remove_file(self.dir.join(&stale)) {
                warn!("Could not remove old checkpoint {}: {}", stale, e);
            }
        }

        self.write_index(&index)?;
        Ok(path)
    }

    /// Path of the most recent checkpoint, or `None` if the directory holds
    /// no index.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .read_index()?
            .filter(|index| !index.model_checkpoint_path.is_empty())
            .map(|index| self.dir.join(index.model_checkpoint_path)))
    }

    /// Every checkpoint still tracked by the index, oldest first.
    pub fn all(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .read_index()?
            .map(|index| {
                index
                    .all_model_checkpoint_paths
                    .iter()
                    .map(|p| self.dir.join(p))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Loads the most recent checkpoint, if any.
    pub fn restore_latest(&self) -> Result<Option<Checkpoint>> {
        match self.latest()? {
            Some(path) => {
                info!("Restoring parameters from {}", path.display());
                Ok(Some(Checkpoint::load_json(&path)?))
            }
            None => Ok(None),
        }
    }

    fn read_index(&self) -> Result<Option<CheckpointIndex>> {
        let path = self.dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(path)?;
        Ok(Some(serde_json::from_reader(BufReader::new(file))?))
    }

    fn write_index(&self, index: &CheckpointIndex) -> Result<()> {
        let file = fs::File::create(self.dir.join(INDEX_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), index)?;
        Ok(())
    }
}
