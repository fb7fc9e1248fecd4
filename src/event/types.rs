use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::event::ports::{Cleanable, EventContext, ObjectSource, PhysicsView, ResultSink};

pub type EventId = u64;
pub type CollectionLabel = String;

/// Handle to one element of another per-event collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub collection: CollectionLabel,
    pub index: usize,
}

impl ObjectRef {
    pub fn new(collection: impl Into<String>, index: usize) -> Self {
        Self {
            collection: collection.into(),
            index,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.index)
    }
}

/// Generic reconstructed object: named numeric attributes, named references to
/// the low-level objects it was built from, and overlap annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PhysicsObject {
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
    #[serde(default)]
    pub components: BTreeMap<String, ObjectRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overlaps: BTreeMap<String, Vec<ObjectRef>>,
}

impl PhysicsObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, reference: ObjectRef) -> Self {
        self.components.insert(name.into(), reference);
        self
    }

    /// Shorthand for the kinematic triple most cuts are written against.
    pub fn kinematic(pt: f64, eta: f64, phi: f64) -> Self {
        Self::new()
            .with_attribute("pt", pt)
            .with_attribute("eta", eta)
            .with_attribute("phi", phi)
    }
}

impl PhysicsView for PhysicsObject {
    fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }

    fn component(&self, name: &str) -> Option<&ObjectRef> {
        self.components.get(name)
    }

    fn components(&self) -> Vec<(&str, &ObjectRef)> {
        self.components
            .iter()
            .map(|(name, reference)| (name.as_str(), reference))
            .collect()
    }
}

impl Cleanable for PhysicsObject {
    fn set_overlaps(&mut self, test_name: &str, overlaps: Vec<ObjectRef>) {
        self.overlaps.insert(test_name.to_string(), overlaps);
    }

    fn overlaps(&self, test_name: &str) -> Option<&[ObjectRef]> {
        self.overlaps.get(test_name).map(Vec::as_slice)
    }

    fn clear_overlaps(&mut self) {
        self.overlaps.clear();
    }
}

/// One unit of work: every collection available to the pipelines for this event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Event {
    pub id: EventId,
    #[serde(default)]
    pub collections: BTreeMap<CollectionLabel, Vec<PhysicsObject>>,
}

impl Event {
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            collections: BTreeMap::new(),
        }
    }

    pub fn with_collection(mut self, label: impl Into<String>, objects: Vec<PhysicsObject>) -> Self {
        self.collections.insert(label.into(), objects);
        self
    }

    pub fn take_collection(&mut self, label: &str) -> Option<Vec<PhysicsObject>> {
        self.collections.remove(label)
    }
}

impl EventContext for Event {
    fn event_id(&self) -> EventId {
        self.id
    }

    fn collection(&self, label: &str) -> Option<&[PhysicsObject]> {
        self.collections.get(label).map(Vec::as_slice)
    }
}

impl ObjectSource<PhysicsObject> for Event {
    fn objects(&self, label: &str) -> Option<&[PhysicsObject]> {
        self.collection(label)
    }
}

impl ResultSink<PhysicsObject> for Event {
    fn commit(&mut self, event_id: EventId, label: &str, objects: Vec<PhysicsObject>) {
        debug_assert_eq!(event_id, self.id, "output committed into a foreign event");
        self.collections.insert(label.to_string(), objects);
    }
}
