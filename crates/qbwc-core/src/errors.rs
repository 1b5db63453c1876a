//! Errores del core.
//!
//! Ningún error cruza la frontera SOAP: el driver los convierte en los
//! centinelas del protocolo (`""`, `-1`, `"done"`) y guarda el mensaje para
//! `getLastError`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum WebConnectorError {
    #[error("authentication failed for user '{0}'")]
    AuthenticationFailure(String),
    #[error("version rejected for ticket {0}")]
    VersionIncompatible(String),
    #[error("malformed response payload: {0}")]
    MalformedResponse(String),
    #[error("unknown ticket: {0}")]
    UnknownTicket(String),
    #[error("step '{step}' failed: {reason}")]
    StepFailure { step: String, reason: String },
    #[error("qbXML status {code} ({severity}): {message}")]
    ResponseStatus { code: i32, severity: String, message: String },
    #[error("client reported {hresult}: {message}")]
    Transport { hresult: String, message: String },
    #[error("no outstanding request for ticket {0}")]
    NoPendingRequest(String),
    #[error("duplicate step name: {0}")]
    DuplicateStep(String),
    #[error("step registry changed since ticket {0} was issued")]
    RegistryMismatch(String),
    #[error("store: {0}")]
    Store(String),
    #[error("internal: {0}")]
    Internal(String),
}

/// Clasificación gruesa para logging y para decidir si reintentar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Credenciales, ticket o versión del cliente.
    Client,
    /// Payload o secuencia de llamadas que no respeta el protocolo.
    Protocol,
    /// Fallos de infraestructura que pueden resolverse reintentando.
    Transient,
    /// Errores de configuración o de lógica del step.
    Permanent,
}

pub fn classify_error(err: &WebConnectorError) -> ErrorClass {
    match err {
        WebConnectorError::AuthenticationFailure(_)
        | WebConnectorError::VersionIncompatible(_)
        | WebConnectorError::UnknownTicket(_) => ErrorClass::Client,
        WebConnectorError::MalformedResponse(_)
        | WebConnectorError::ResponseStatus { .. }
        | WebConnectorError::NoPendingRequest(_) => ErrorClass::Protocol,
        WebConnectorError::Transport { .. } | WebConnectorError::Store(_) => ErrorClass::Transient,
        WebConnectorError::StepFailure { .. }
        | WebConnectorError::DuplicateStep(_)
        | WebConnectorError::RegistryMismatch(_)
        | WebConnectorError::Internal(_) => ErrorClass::Permanent,
    }
}
