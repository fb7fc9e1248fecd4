use std::f64::consts::{PI, TAU};

use serde::Deserialize;

use crate::{
    error::{CleaningError, configuration_error, input_missing},
    event::{
        ports::{EventContext, PhysicsView},
        types::ObjectRef,
    },
    overlap::{
        ports::OverlapTest,
        types::{OverlapOutcome, OverlapTestConfig},
    },
    predicate::Predicate,
};

pub const ALGORITHM: &str = "byDeltaR";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeltaRParams {
    src: String,
    delta_r: f64,
    #[serde(default)]
    preselection: String,
    #[serde(default)]
    check_reco_components: bool,
}

#[derive(Debug, Clone)]
struct IndexedObject {
    index: usize,
    eta: f64,
    phi: f64,
    components: Vec<ObjectRef>,
}

/// Flags every preselected object of `src` within a ΔR cone of the candidate,
/// closest first. With `check_reco_components` a match must also share a
/// component reference with the candidate.
#[derive(Debug)]
pub struct DeltaROverlapTest {
    name: String,
    require_no_overlap: bool,
    src: String,
    max_delta_r: f64,
    preselection: Predicate,
    check_reco_components: bool,
    indexed: Vec<IndexedObject>,
}

impl DeltaROverlapTest {
    pub fn from_config(config: &OverlapTestConfig) -> Result<Self, CleaningError> {
        let params: DeltaRParams = config.parse_params()?;
        if params.src.trim().is_empty() {
            return Err(configuration_error(format!(
                "overlap test '{}': src cannot be empty",
                config.name
            )));
        }
        if !params.delta_r.is_finite() || params.delta_r <= 0.0 {
            return Err(configuration_error(format!(
                "overlap test '{}': delta_r must be a positive number, got {}",
                config.name, params.delta_r
            )));
        }
        let preselection = Predicate::compile(&params.preselection).map_err(|err| {
            configuration_error(format!("overlap test '{}': {}", config.name, err.message))
        })?;

        Ok(Self {
            name: config.name.clone(),
            require_no_overlap: config.require_no_overlap,
            src: params.src,
            max_delta_r: params.delta_r,
            preselection,
            check_reco_components: params.check_reco_components,
            indexed: Vec::new(),
        })
    }

    pub fn build(config: &OverlapTestConfig) -> Result<Box<dyn OverlapTest>, CleaningError> {
        Ok(Box::new(Self::from_config(config)?))
    }

    fn shares_component(&self, object: &dyn PhysicsView, other: &IndexedObject) -> bool {
        object
            .components()
            .into_iter()
            .any(|(_, reference)| other.components.contains(reference))
    }
}

impl OverlapTest for DeltaROverlapTest {
    fn name(&self) -> &str {
        &self.name
    }

    fn require_no_overlap(&self) -> bool {
        self.require_no_overlap
    }

    fn refresh(&mut self, event: &dyn EventContext) -> Result<(), CleaningError> {
        self.indexed.clear();
        let others = event.collection(&self.src).ok_or_else(|| {
            input_missing(format!(
                "overlap test '{}': collection '{}' not found in event {}",
                self.name,
                self.src,
                event.event_id()
            ))
        })?;

        for (index, other) in others.iter().enumerate() {
            if !self.preselection.evaluate(other) {
                continue;
            }
            let (Some(eta), Some(phi)) = (other.attribute("eta"), other.attribute("phi")) else {
                continue;
            };
            self.indexed.push(IndexedObject {
                index,
                eta,
                phi,
                components: other.components().into_iter().map(|(_, r)| r.clone()).collect(),
            });
        }
        Ok(())
    }

    fn evaluate(&self, object: &dyn PhysicsView) -> OverlapOutcome {
        let (Some(eta), Some(phi)) = (object.attribute("eta"), object.attribute("phi")) else {
            return OverlapOutcome::none();
        };

        let mut closest: Vec<(f64, usize)> = self
            .indexed
            .iter()
            .filter_map(|other| {
                let dr = delta_r(eta, phi, other.eta, other.phi);
                if dr.is_nan() || dr >= self.max_delta_r {
                    return None;
                }
                if self.check_reco_components && !self.shares_component(object, other) {
                    return None;
                }
                Some((dr, other.index))
            })
            .collect();
        closest.sort_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0).then(lhs.1.cmp(&rhs.1)));

        OverlapOutcome::from_overlaps(
            closest
                .into_iter()
                .map(|(_, index)| ObjectRef::new(self.src.clone(), index))
                .collect(),
        )
    }
}

pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    (phi1 - phi2 + PI).rem_euclid(TAU) - PI
}

pub fn delta_r(eta1: f64, phi1: f64, eta2: f64, phi2: f64) -> f64 {
    let deta = eta1 - eta2;
    let dphi = delta_phi(phi1, phi2);
    (deta * deta + dphi * dphi).sqrt()
}
