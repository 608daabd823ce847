//! Experiment - the data object that flows through a workflow
//!
//! An experiment is a column store: an ordered set of named channels, each
//! holding one `f64` per event. The engine only ever looks at the channel
//! names; operations are free to look at the values.

use crate::core::operation::OperationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A single named measurement dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel name (e.g. "FSC-A")
    pub name: String,

    /// One value per event
    #[serde(default)]
    pub values: Vec<f64>,
}

/// Tabular experiment data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Free-form metadata (sample name, acquisition date, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Channels in acquisition order
    #[serde(default)]
    channels: Vec<Channel>,
}

impl Experiment {
    /// Create an empty experiment
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style channel insertion
    pub fn with_channel(mut self, name: &str, values: Vec<f64>) -> Result<Self, OperationError> {
        self.add_channel(name, values)?;
        Ok(self)
    }

    /// Add a channel, or replace an existing channel with the same name
    pub fn add_channel(&mut self, name: &str, values: Vec<f64>) -> Result<(), OperationError> {
        let existing = self.channels.iter().position(|c| c.name == name);

        // A lone channel may be replaced by one of any length
        let constrains_length = match existing {
            Some(_) => self.channels.len() > 1,
            None => !self.channels.is_empty(),
        };
        if constrains_length && values.len() != self.len() {
            return Err(OperationError::LengthMismatch {
                channel: name.to_string(),
                expected: self.len(),
                found: values.len(),
            });
        }

        match existing {
            Some(idx) => self.channels[idx].values = values,
            None => self.channels.push(Channel {
                name: name.to_string(),
                values,
            }),
        }
        Ok(())
    }

    /// Names of all channels, in order
    pub fn channels(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Check whether a channel exists
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c.name == name)
    }

    /// Values of a channel
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.channels.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the events whose mask entry is `true`
    pub fn filter(&self, keep: &[bool]) -> Result<Experiment, OperationError> {
        if keep.len() != self.len() {
            return Err(OperationError::LengthMismatch {
                channel: "<mask>".to_string(),
                expected: self.len(),
                found: keep.len(),
            });
        }

        let channels = self
            .channels
            .iter()
            .map(|c| Channel {
                name: c.name.clone(),
                values: c
                    .values
                    .iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| *v)
                    .collect(),
            })
            .collect();

        Ok(Experiment {
            metadata: self.metadata.clone(),
            channels,
        })
    }

    /// Keep only the named channels (in their original order)
    pub fn select<F>(&self, mut predicate: F) -> Experiment
    where
        F: FnMut(&str) -> bool,
    {
        Experiment {
            metadata: self.metadata.clone(),
            channels: self
                .channels
                .iter()
                .filter(|c| predicate(&c.name))
                .cloned()
                .collect(),
        }
    }

    /// Check that channel names are unique and every channel has the same
    /// number of events
    pub fn check(&self) -> Result<(), OperationError> {
        let expected = self.len();
        let mut seen = BTreeSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.name.as_str()) {
                return Err(OperationError::DuplicateChannel(channel.name.clone()));
            }
            if channel.values.len() != expected {
                return Err(OperationError::LengthMismatch {
                    channel: channel.name.clone(),
                    expected,
                    found: channel.values.len(),
                });
            }
        }
        Ok(())
    }

    /// Parse an experiment from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, OperationError> {
        let experiment: Experiment =
            serde_yaml::from_str(yaml).map_err(|e| OperationError::Parse(e.to_string()))?;
        experiment.check()?;
        Ok(experiment)
    }

    /// Parse an experiment from JSON
    pub fn from_json(json: &str) -> Result<Self, OperationError> {
        let experiment: Experiment =
            serde_json::from_str(json).map_err(|e| OperationError::Parse(e.to_string()))?;
        experiment.check()?;
        Ok(experiment)
    }

    /// Load an experiment from a `.json`, `.yaml` or `.yml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OperationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }
}
