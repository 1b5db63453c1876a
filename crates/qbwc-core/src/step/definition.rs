use crate::errors::WebConnectorError;
use crate::session::AuthenticatedTicket;
use crate::step::ResponseOptions;

/// Contrato de un step.
///
/// Los steps se registran una vez al arrancar y se comparten entre todas las
/// sesiones; el estado por sesión vive en el ticket o en stores inyectados,
/// nunca en el propio step.
pub trait Step: Send + Sync {
    /// Identificador estable; clave del estado del iterador.
    fn name(&self) -> &str;

    /// Fija tamaño de página y opciones propias. El builder del engine lo
    /// llama antes de que exista cualquier sesión.
    fn set_options(&mut self, _options: ResponseOptions) {}

    /// Request qbXML para el estado actual del ticket. `None` (o cadena
    /// vacía) indica que el step no tiene nada que hacer en esta ronda.
    fn send_xml(&self, ticket: &AuthenticatedTicket) -> Result<Option<String>, WebConnectorError>;

    /// Consume la respuesta del cliente y devuelve el progreso del step
    /// (0..=100). 100 retira el step.
    ///
    /// `hresult`/`message` no vacíos indican que QuickBooks no pudo procesar
    /// el request.
    fn receive_xml(&self,
                   ticket: &AuthenticatedTicket,
                   response: &str,
                   hresult: &str,
                   message: &str)
                   -> Result<i32, WebConnectorError>;

    /// Aplica lo que el último `receive_xml` de `ticket` dejó preparado. El
    /// driver lo llama sólo después de persistir el registro del ticket.
    fn commit(&self, _ticket: &str) -> Result<(), WebConnectorError> {
        Ok(())
    }

    /// Descarta lo preparado cuando la llamada no llegó a persistirse.
    fn discard(&self, _ticket: &str) {}

    /// Libera el estado que el step guarde para `ticket` al cerrar la sesión.
    fn close(&self, _ticket: &str) -> Result<(), WebConnectorError> {
        Ok(())
    }
}

/// Error de transporte común a todos los steps.
pub fn check_hresult(hresult: &str, message: &str) -> Result<(), WebConnectorError> {
    if hresult.trim().is_empty() {
        Ok(())
    } else {
        Err(WebConnectorError::Transport { hresult: hresult.to_string(),
                                           message: message.to_string() })
    }
}
