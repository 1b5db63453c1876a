//! qbwc-core: motor de sesiones para QuickBooks Web Connector.
//!
//! El Web Connector es un cliente SOAP que sondea al servidor con una
//! secuencia fija de llamadas (authenticate, sendRequestXML,
//! receiveResponseXML, closeConnection...). Este crate modela lo que hay
//! detrás de esas llamadas:
//! - `session`: el ticket autenticado y su store (estado por ticket).
//! - `step`: contrato de los steps, opciones de respuesta y registro ordenado.
//! - `iterator`: protocolo de paginación qbXML (`iterator="Start|Continue"`).
//! - `qbxml`: sobre genérico de request/response qbXML (sin payload de dominio).
//! - `auth`: autenticación, validación de versión y hooks del handler.
//! - `engine`: el driver de sesión que orquesta todo lo anterior.
pub mod auth;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod iterator;
pub mod qbxml;
pub mod session;
pub mod step;

pub use auth::{AcceptAllValidator, AuthDecision, AuthStatus, AuthenticateResult, Authenticator, MessageValidator,
               NoopHandler, StaticAuthenticator, VersionValidator, WebConnectorHandler};
pub use engine::{EngineBuilder, EngineConfig, WebConnectorEngine};
pub use errors::{classify_error, ErrorClass, WebConnectorError};
pub use iterator::{InMemoryIteratorStore, IteratorQuery, IteratorState, IteratorStatus, IteratorStep, IteratorStore};
pub use qbxml::{QbXmlRecord, QbXmlResponse, StatusSeverity};
pub use session::{AuthenticatedTicket, InMemoryTicketStore, SessionState, TicketStore};
pub use step::{FnStep, ResponseOptions, Step, StepRegistry};
