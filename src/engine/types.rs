use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::{
    error::{CleaningError, configuration_error},
    event::types::EventId,
    overlap::types::OverlapTestConfig,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Label the cleaned collection is committed under.
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub source: String,
    #[serde(default)]
    pub preselection: String,
    #[serde(default)]
    pub final_cut: String,
    #[serde(default)]
    #[validate(nested)]
    pub overlap_tests: Vec<OverlapTestConfig>,
}

impl PipelineConfig {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            preselection: String::new(),
            final_cut: String::new(),
            overlap_tests: Vec::new(),
        }
    }

    pub fn with_preselection(mut self, expression: impl Into<String>) -> Self {
        self.preselection = expression.into();
        self
    }

    pub fn with_final_cut(mut self, expression: impl Into<String>) -> Self {
        self.final_cut = expression.into();
        self
    }

    pub fn with_overlap_test(mut self, test: OverlapTestConfig) -> Self {
        self.overlap_tests.push(test);
        self
    }

    /// Stable digest of the whole pipeline definition, params included.
    pub fn fingerprint(&self) -> Result<String, CleaningError> {
        // serde_json maps are key-sorted, so the encoding is canonical.
        let canonical = serde_json::to_value(self).map_err(|err| {
            configuration_error(format!(
                "pipeline '{}': failed to encode config for fingerprint: {err}",
                self.name
            ))
        })?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        let digest = hasher.finalize();
        let hex = format!("{:x}", digest);
        Ok(format!("pipe:{}", &hex[..24]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CleaningSummary {
    pub event_id: EventId,
    pub input: usize,
    pub preselected: usize,
    pub rejected_by_overlap: usize,
    pub rejected_by_final_cut: usize,
    pub accepted: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleaningOutcome<T> {
    pub objects: Vec<T>,
    pub summary: CleaningSummary,
}
