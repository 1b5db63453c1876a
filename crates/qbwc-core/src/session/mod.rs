//! Estado por ticket y su almacenamiento.

mod store;
mod types;

pub use store::{InMemoryTicketStore, TicketStore};
pub use types::{AuthenticatedTicket, SessionState};
