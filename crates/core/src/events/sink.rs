//! Where domain events go after a commit.

use std::sync::{Arc, Mutex};

use super::DomainEvent;

/// Receives events after the write that produced them has committed.
///
/// `emit` may run while the portfolio's write lock is held, so it must not
/// block or call back into the services. Its failure never rolls anything
/// back.
pub trait DomainEventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);

    fn emit_batch(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Drops every event.
#[derive(Clone, Default)]
pub struct NoOpDomainEventSink;

impl DomainEventSink for NoOpDomainEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// Records events in memory so tests can assert on them.
#[derive(Clone, Default)]
pub struct MockDomainEventSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl MockDomainEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Recorded events that name `portfolio_id`.
    pub fn events_for(&self, portfolio_id: &str) -> Vec<DomainEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.portfolio_id() == Some(portfolio_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DomainEventSink for MockDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Writes each event to the `log` facade at debug level.
#[derive(Clone, Default)]
pub struct LoggingDomainEventSink;

impl DomainEventSink for LoggingDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        log::debug!("domain event: {:?}", event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sink_filters_by_portfolio() {
        let sink = MockDomainEventSink::new();
        assert!(sink.is_empty());

        sink.emit(DomainEvent::portfolio_deleted("p1".to_string()));
        sink.emit_batch(vec![
            DomainEvent::ledger_rederived("p1".to_string(), None),
            DomainEvent::ledger_rederived("p2".to_string(), None),
        ]);

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_for("p1").len(), 2);
        assert_eq!(sink.events_for("p3").len(), 0);
    }

    #[test]
    fn test_snapshot_event_names_no_single_portfolio() {
        let sink = MockDomainEventSink::new();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        sink.emit(DomainEvent::snapshots_taken(vec!["p1".to_string()], date));
        assert!(sink.events_for("p1").is_empty());
    }
}
