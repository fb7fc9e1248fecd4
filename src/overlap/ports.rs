use crate::{
    error::CleaningError,
    event::ports::{EventContext, PhysicsView},
    overlap::types::OverlapOutcome,
};

/// A named check of one candidate against some other per-event collection.
///
/// `refresh` runs once per event before any `evaluate` call and must replace,
/// not extend, whatever it indexed for the previous event. `evaluate` reads only
/// that refreshed state.
pub trait OverlapTest: Send {
    fn name(&self) -> &str;

    fn require_no_overlap(&self) -> bool;

    fn refresh(&mut self, event: &dyn EventContext) -> Result<(), CleaningError>;

    fn evaluate(&self, object: &dyn PhysicsView) -> OverlapOutcome;
}
