use serde::{Deserialize, Serialize, de::DeserializeOwned};
use validator::Validate;

use crate::{
    error::{CleaningError, configuration_error},
    event::types::ObjectRef,
};

fn default_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// One entry of a pipeline's ordered overlap-test list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OverlapTestConfig {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub algorithm: String,
    pub require_no_overlap: bool,
    #[serde(default = "default_params")]
    pub params: serde_json::Value,
}

impl OverlapTestConfig {
    pub fn new(
        name: impl Into<String>,
        algorithm: impl Into<String>,
        require_no_overlap: bool,
        params: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            algorithm: algorithm.into(),
            require_no_overlap,
            params,
        }
    }

    /// Decodes the algorithm-specific parameters into the factory's own type.
    pub fn parse_params<P: DeserializeOwned>(&self) -> Result<P, CleaningError> {
        serde_json::from_value(self.params.clone()).map_err(|err| {
            configuration_error(format!(
                "overlap test '{}' ({}): invalid params: {err}",
                self.name, self.algorithm
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverlapOutcome {
    pub has_overlap: bool,
    pub overlaps: Vec<ObjectRef>,
}

impl OverlapOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_overlaps(overlaps: Vec<ObjectRef>) -> Self {
        Self {
            has_overlap: !overlaps.is_empty(),
            overlaps,
        }
    }
}
