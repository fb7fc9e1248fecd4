pub mod ports;
pub mod sink;
pub mod types;

pub use ports::{Cleanable, EventContext, ObjectSource, PhysicsView, ResultSink};
pub use sink::{CollectingSink, CommittedCollection};
pub use types::{CollectionLabel, Event, EventId, ObjectRef, PhysicsObject};
