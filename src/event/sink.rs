use crate::event::{ports::ResultSink, types::EventId};

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedCollection<T> {
    pub event_id: EventId,
    pub label: String,
    pub objects: Vec<T>,
}

/// Keeps every committed collection in memory, in commit order.
#[derive(Debug, Clone)]
pub struct CollectingSink<T> {
    committed: Vec<CommittedCollection<T>>,
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        Self {
            committed: Vec::new(),
        }
    }
}

impl<T> CollectingSink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(&self) -> &[CommittedCollection<T>] {
        &self.committed
    }

    pub fn into_committed(self) -> Vec<CommittedCollection<T>> {
        self.committed
    }
}

impl<T> ResultSink<T> for CollectingSink<T> {
    fn commit(&mut self, event_id: EventId, label: &str, objects: Vec<T>) {
        self.committed.push(CommittedCollection {
            event_id,
            label: label.to_string(),
            objects,
        });
    }
}
