use crate::event::types::{EventId, ObjectRef, PhysicsObject};

/// Read-only view of an object, as seen by predicates and overlap tests.
pub trait PhysicsView {
    fn attribute(&self, name: &str) -> Option<f64>;

    fn component(&self, _name: &str) -> Option<&ObjectRef> {
        None
    }

    /// Every component reference, in a stable order.
    fn components(&self) -> Vec<(&str, &ObjectRef)> {
        Vec::new()
    }
}

/// An object kind the cleaning engine can copy and annotate.
pub trait Cleanable: PhysicsView + Clone + Send {
    fn set_overlaps(&mut self, test_name: &str, overlaps: Vec<ObjectRef>);

    fn overlaps(&self, test_name: &str) -> Option<&[ObjectRef]>;

    /// Drops every annotation, including ones carried in from upstream.
    fn clear_overlaps(&mut self);
}

/// Per-event lookup of auxiliary collections, used by overlap tests on refresh.
pub trait EventContext {
    fn event_id(&self) -> EventId;

    fn collection(&self, label: &str) -> Option<&[PhysicsObject]>;
}

/// Provides the primary collection a pipeline cleans.
pub trait ObjectSource<T> {
    fn objects(&self, label: &str) -> Option<&[T]>;
}

/// Accepts a completed output collection; only called for events that succeeded.
pub trait ResultSink<T> {
    fn commit(&mut self, event_id: EventId, label: &str, objects: Vec<T>);
}
