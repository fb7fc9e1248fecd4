//! Scripted overlap test that records every call; used to exercise the engine
//! without real geometry.

use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::{
    error::{CleaningError, input_missing},
    event::{
        ports::{EventContext, PhysicsView},
        types::{EventId, ObjectRef},
    },
    overlap::{
        ports::OverlapTest,
        registry::OverlapTestRegistry,
        types::{OverlapOutcome, OverlapTestConfig},
    },
};

pub const SCRIPTED_ALGORITHM: &str = "scripted";

#[derive(Debug, Clone, PartialEq)]
pub enum OverlapCall {
    Refresh { test: String, event_id: EventId },
    Evaluate { test: String, object_id: Option<f64> },
}

pub type CallLog = Arc<Mutex<Vec<OverlapCall>>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptedParams {
    #[serde(default)]
    overlapping_ids: Vec<f64>,
    #[serde(default)]
    require_collection: Option<String>,
}

/// Reports an overlap for every object whose `id` attribute is listed in
/// `overlapping_ids`, referencing `scripted:<id>`. Every call is appended to the
/// shared log.
pub struct ScriptedOverlapTest {
    name: String,
    require_no_overlap: bool,
    params: ScriptedParams,
    log: CallLog,
}

impl ScriptedOverlapTest {
    pub fn from_config(config: &OverlapTestConfig, log: CallLog) -> Result<Self, CleaningError> {
        Ok(Self {
            name: config.name.clone(),
            require_no_overlap: config.require_no_overlap,
            params: config.parse_params()?,
            log,
        })
    }

    fn record(&self, call: OverlapCall) {
        if let Ok(mut calls) = self.log.lock() {
            calls.push(call);
        }
    }
}

impl OverlapTest for ScriptedOverlapTest {
    fn name(&self) -> &str {
        &self.name
    }

    fn require_no_overlap(&self) -> bool {
        self.require_no_overlap
    }

    fn refresh(&mut self, event: &dyn EventContext) -> Result<(), CleaningError> {
        self.record(OverlapCall::Refresh {
            test: self.name.clone(),
            event_id: event.event_id(),
        });
        if let Some(label) = &self.params.require_collection
            && event.collection(label).is_none()
        {
            return Err(input_missing(format!(
                "overlap test '{}': collection '{}' not found in event {}",
                self.name,
                label,
                event.event_id()
            )));
        }
        Ok(())
    }

    fn evaluate(&self, object: &dyn PhysicsView) -> OverlapOutcome {
        let object_id = object.attribute("id");
        self.record(OverlapCall::Evaluate {
            test: self.name.clone(),
            object_id,
        });

        match object_id {
            Some(id) if self.params.overlapping_ids.contains(&id) => {
                OverlapOutcome::from_overlaps(vec![ObjectRef::new("scripted", id as usize)])
            }
            _ => OverlapOutcome::none(),
        }
    }
}

/// Builtin registry plus the `scripted` algorithm writing into `log`.
pub fn scripted_registry(log: CallLog) -> OverlapTestRegistry {
    let mut registry = OverlapTestRegistry::with_builtin();
    registry
        .register(SCRIPTED_ALGORITHM, move |config| {
            let test = ScriptedOverlapTest::from_config(config, Arc::clone(&log))?;
            Ok(Box::new(test) as Box<dyn OverlapTest>)
        })
        .expect("scripted algorithm id is free in the builtin registry");
    registry
}

pub fn scripted(name: &str, require_no_overlap: bool, overlapping_ids: &[f64]) -> OverlapTestConfig {
    OverlapTestConfig::new(
        name,
        SCRIPTED_ALGORITHM,
        require_no_overlap,
        serde_json::json!({ "overlapping_ids": overlapping_ids }),
    )
}

pub fn evaluated_ids(log: &CallLog, test: &str) -> Vec<f64> {
    log.lock()
        .expect("lock")
        .iter()
        .filter_map(|call| match call {
            OverlapCall::Evaluate {
                test: name,
                object_id: Some(id),
            } if name == test => Some(*id),
            _ => None,
        })
        .collect()
}
