use std::sync::{Arc, Mutex};

use dashmap::DashMap;

/// Un mutex por ticket. Tickets distintos no comparten nada.
#[derive(Debug, Default)]
pub(crate) struct TicketLocks {
    inner: DashMap<String, Arc<Mutex<()>>>,
}

impl TicketLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquire(&self, ticket: &str) -> Arc<Mutex<()>> {
        self.inner
            .entry(ticket.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Olvida el mutex de un ticket cerrado o desconocido.
    pub(crate) fn release(&self, ticket: &str) {
        self.inner.remove(ticket);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_ticket_shares_mutex() {
        let locks = TicketLocks::new();
        let a = locks.acquire("t1");
        let b = locks.acquire("t1");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &locks.acquire("t2")));
        locks.release("t1");
        assert_eq!(locks.len(), 1);
    }
}
