//! Protocolo de paginación qbXML.
//!
//! Una query cuyo resultado no cabe en un intercambio se pide con
//! `iterator="Start"` y `MaxReturned`; QuickBooks responde con
//! `iteratorID` e `iteratorRemainingCount` y el servidor sigue pidiendo
//! `iterator="Continue"` con esa clave hasta que no queden filas.
//!
//! Máquina de estados por (ticket, step): `NotStarted -> InProgress -> Done`.
//! `Done` no se persiste: el registro se elimina al retirar el step.

mod state;
mod step;
mod store;

pub use state::{IteratorState, IteratorStatus};
pub use step::{page_progress, IteratorQuery, IteratorStep};
pub use store::{InMemoryIteratorStore, IteratorStore};
