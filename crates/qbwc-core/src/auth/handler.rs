use crate::errors::WebConnectorError;

/// Hooks opcionales que la aplicación engancha al ciclo de vida de la
/// sesión. Se ejecutan bajo el lock del ticket; no deben bloquear.
pub trait WebConnectorHandler: Send + Sync {
    /// Primer `sendRequestXML` de la sesión, antes de validar.
    fn process_client_information(&self, _ticket: &str, _company_file: &str, _country: &str, _major: u32, _minor: u32) {}

    fn on_authenticated(&self, _ticket: &str, _username: &str) {}

    fn on_version_rejected(&self, _ticket: &str) {}

    /// Cualquier error que el driver convierte en centinela.
    fn on_exception(&self, _ticket: &str, _error: &WebConnectorError) {}

    fn on_close(&self, _ticket: &str) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl WebConnectorHandler for NoopHandler {}
