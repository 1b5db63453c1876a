use dashmap::DashMap;

use super::IteratorState;
use crate::errors::WebConnectorError;

/// Store `(ticket, step_name) -> IteratorState`.
///
/// Se inyecta en cada `IteratorStep` y en el engine (que limpia los cursores
/// del ticket al cerrar la sesión).
pub trait IteratorStore: Send + Sync {
    fn load(&self, ticket: &str, step_name: &str) -> Result<Option<IteratorState>, WebConnectorError>;
    fn save(&self, state: &IteratorState) -> Result<(), WebConnectorError>;
    fn remove(&self, ticket: &str, step_name: &str) -> Result<(), WebConnectorError>;
    /// Elimina todos los cursores de un ticket.
    fn remove_ticket(&self, ticket: &str) -> Result<(), WebConnectorError>;
}

#[derive(Debug, Default)]
pub struct InMemoryIteratorStore {
    inner: DashMap<(String, String), IteratorState>,
}

impl InMemoryIteratorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl IteratorStore for InMemoryIteratorStore {
    fn load(&self, ticket: &str, step_name: &str) -> Result<Option<IteratorState>, WebConnectorError> {
        Ok(self.inner
               .get(&(ticket.to_string(), step_name.to_string()))
               .map(|s| s.value().clone()))
    }

    fn save(&self, state: &IteratorState) -> Result<(), WebConnectorError> {
        self.inner
            .insert((state.ticket.clone(), state.step_name.clone()), state.clone());
        Ok(())
    }

    fn remove(&self, ticket: &str, step_name: &str) -> Result<(), WebConnectorError> {
        self.inner.remove(&(ticket.to_string(), step_name.to_string()));
        Ok(())
    }

    fn remove_ticket(&self, ticket: &str) -> Result<(), WebConnectorError> {
        self.inner.retain(|(t, _), _| t != ticket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_are_scoped_by_ticket_and_step() {
        let store = InMemoryIteratorStore::new();
        store.save(&IteratorState::not_started("t1", "a")).unwrap();
        store.save(&IteratorState::not_started("t1", "b")).unwrap();
        store.save(&IteratorState::not_started("t2", "a")).unwrap();
        assert!(store.load("t1", "b").unwrap().is_some());
        assert!(store.load("t3", "a").unwrap().is_none());

        store.remove_ticket("t1").unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.load("t2", "a").unwrap().is_some());
    }
}
