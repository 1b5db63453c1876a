//! Constantes del protocolo Web Connector.
//!
//! Los valores de cadena que viajan por el cable (`"nvu"`, `"busy"`,
//! `"done"`) son los que el cliente de Intuit reconoce; no cambiarlos.

/// Progreso que retira un step (y, a nivel sesión, termina el intercambio).
pub const PROGRESS_DONE: i32 = 100;

/// Centinela negativo de `receiveResponseXML`: el cliente aborta la sesión
/// y llama a `getLastError`.
pub const PROGRESS_ABORT: i32 = -1;

/// Tamaño de página por defecto para queries con iterador.
pub const DEFAULT_MAX_RETURNED: u32 = 100;

/// Versión qbXML declarada en el prólogo de cada request.
pub const DEFAULT_QBXML_VERSION: &str = "13.0";

/// Segundo elemento de `authenticate` cuando las credenciales no son válidas.
pub const AUTH_INVALID_USER: &str = "nvu";

/// Segundo elemento de `authenticate` cuando la cuenta ya tiene una sesión.
pub const AUTH_BUSY: &str = "busy";

/// Respuesta de `connectionError` que da por terminada la sesión.
pub const CONNECTION_ERROR_DONE: &str = "done";

pub const CLOSE_OK_MESSAGE: &str = "Sync Completed";
pub const INVALID_TICKET_MESSAGE: &str = "Invalid ticket";
pub const VERSION_REJECTED_MESSAGE: &str =
    "The company file, country or qbXML version is not supported by this server";

/// Versión lógica del registro de steps. Participa en el hash del registro:
/// tickets emitidos con otro registro se rechazan.
pub const REGISTRY_VERSION: &str = "R1";
