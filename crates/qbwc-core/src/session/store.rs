use dashmap::DashMap;

use super::AuthenticatedTicket;
use crate::errors::WebConnectorError;

/// Store clave/valor `ticket -> AuthenticatedTicket`.
///
/// Debe sobrevivir entre llamadas independientes; puede ser volátil o
/// durable (ver `qbwc-persistence`). Los métodos reciben `&self`: cada
/// implementación resuelve su propia concurrencia interna.
pub trait TicketStore: Send + Sync {
    /// Inserta un ticket nuevo. Falla si ya existe.
    fn insert(&self, ticket: &AuthenticatedTicket) -> Result<(), WebConnectorError>;
    fn load(&self, ticket: &str) -> Result<Option<AuthenticatedTicket>, WebConnectorError>;
    /// Reemplaza (o crea) el registro completo.
    fn save(&self, ticket: &AuthenticatedTicket) -> Result<(), WebConnectorError>;
    fn remove(&self, ticket: &str) -> Result<(), WebConnectorError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    inner: DashMap<String, AuthenticatedTicket>,
}

impl InMemoryTicketStore {
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

impl TicketStore for InMemoryTicketStore {
    fn insert(&self, ticket: &AuthenticatedTicket) -> Result<(), WebConnectorError> {
        use dashmap::mapref::entry::Entry;
        match self.inner.entry(ticket.ticket.clone()) {
            Entry::Occupied(_) => Err(WebConnectorError::Store(format!("duplicate ticket {}", ticket.ticket))),
            Entry::Vacant(slot) => {
                slot.insert(ticket.clone());
                Ok(())
            }
        }
    }

    fn load(&self, ticket: &str) -> Result<Option<AuthenticatedTicket>, WebConnectorError> {
        Ok(self.inner.get(ticket).map(|t| t.value().clone()))
    }

    fn save(&self, ticket: &AuthenticatedTicket) -> Result<(), WebConnectorError> {
        self.inner.insert(ticket.ticket.clone(), ticket.clone());
        Ok(())
    }

    fn remove(&self, ticket: &str) -> Result<(), WebConnectorError> {
        self.inner.remove(ticket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_duplicates() {
        let store = InMemoryTicketStore::new();
        let t = AuthenticatedTicket::new("abc", "h");
        store.insert(&t).expect("first insert");
        assert!(matches!(store.insert(&t), Err(WebConnectorError::Store(_))));
    }

    #[test]
    fn save_then_load_returns_latest() {
        let store = InMemoryTicketStore::new();
        let mut t = AuthenticatedTicket::new("abc", "h");
        store.insert(&t).unwrap();
        t.current_step = 1;
        store.save(&t).unwrap();
        assert_eq!(store.load("abc").unwrap().map(|t| t.current_step), Some(1));
        store.remove("abc").unwrap();
        assert!(store.load("abc").unwrap().is_none());
        assert!(store.is_empty());
    }
}
