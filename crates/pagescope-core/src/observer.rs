//! State-change notifications for presentation layers

use crate::aggregate::SessionTotals;
use pagescope_telemetry::ResourceRecord;

/// Receives session lifecycle events. Every hook defaults to a no-op.
pub trait SessionObserver: Send + Sync {
    /// Observer name (for logging)
    fn name(&self) -> &str;

    /// A new navigation started; any previous session is gone
    fn on_navigation_started(&mut self, _session_id: &str, _url: &str) {}

    /// Records were accepted into the active session
    fn on_resources_added(&mut self, _added: &[ResourceRecord], _totals: &SessionTotals) {}

    /// The active session's resources were cleared
    fn on_cleared(&mut self, _session_id: &str) {}

    /// Navigation settled
    fn on_navigation_finished(&mut self, _session_id: &str, _totals: &SessionTotals) {}

    /// Navigation failed
    fn on_navigation_failed(&mut self, _session_id: &str, _reason: &str) {}
}

/// Fans events out to observers in registration order
pub struct ObserverRegistry {
    observers: Vec<Box<dyn SessionObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn register(&mut self, observer: Box<dyn SessionObserver>) {
        tracing::debug!(observer = observer.name(), "observer registered");
        self.observers.push(observer);
    }

    /// Remove observers by name; returns how many were removed
    pub fn unregister(&mut self, name: &str) -> usize {
        let before = self.observers.len();
        self.observers.retain(|o| o.name() != name);
        before - self.observers.len()
    }

    pub fn navigation_started(&mut self, session_id: &str, url: &str) {
        for observer in &mut self.observers {
            observer.on_navigation_started(session_id, url);
        }
    }

    pub fn resources_added(&mut self, added: &[ResourceRecord], totals: &SessionTotals) {
        if added.is_empty() {
            return;
        }
        for observer in &mut self.observers {
            observer.on_resources_added(added, totals);
        }
    }

    pub fn cleared(&mut self, session_id: &str) {
        for observer in &mut self.observers {
            observer.on_cleared(session_id);
        }
    }

    pub fn navigation_finished(&mut self, session_id: &str, totals: &SessionTotals) {
        for observer in &mut self.observers {
            observer.on_navigation_finished(session_id, totals);
        }
    }

    pub fn navigation_failed(&mut self, session_id: &str, reason: &str) {
        for observer in &mut self.observers {
            observer.on_navigation_failed(session_id, reason);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: String,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl SessionObserver for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_navigation_started(&mut self, _session_id: &str, url: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:start:{}", self.name, url));
        }

        fn on_resources_added(&mut self, added: &[ResourceRecord], _totals: &SessionTotals) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:added:{}", self.name, added.len()));
        }
    }

    struct Silent;

    impl SessionObserver for Silent {
        fn name(&self) -> &str {
            "silent"
        }
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        registry.register(Box::new(Recorder {
            name: "first".to_string(),
            events: events.clone(),
        }));
        registry.register(Box::new(Recorder {
            name: "second".to_string(),
            events: events.clone(),
        }));

        registry.navigation_started("s1", "https://a.com/");

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "first:start:https://a.com/".to_string(),
                "second:start:https://a.com/".to_string()
            ]
        );
    }

    #[test]
    fn test_empty_additions_not_broadcast() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        registry.register(Box::new(Recorder {
            name: "r".to_string(),
            events: events.clone(),
        }));

        registry.resources_added(&[], &SessionTotals::default());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_default_hooks_and_unregister() {
        let mut registry = ObserverRegistry::new();
        registry.register(Box::new(Silent));
        registry.navigation_failed("s1", "dns error");
        registry.cleared("s1");
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.unregister("silent"), 1);
        assert!(registry.is_empty());
    }
}
