use qbwc_core::WebConnectorError;
use qbwc_persistence::PersistenceError;
use thiserror::Error;

/// Errores de arranque del servidor. Una vez en marcha, los errores de
/// sesión no salen del engine.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error del engine: {0}")]
    Engine(#[from] WebConnectorError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_variant_format() {
        let err = BridgeError::Config("QBWC_BIND_ADDR inválido".into());
        assert_eq!(err.to_string(), "Error de configuración: QBWC_BIND_ADDR inválido");
    }

    #[test]
    fn io_variant_from() {
        let err: BridgeError = std::io::Error::other("falló IO").into();
        assert_eq!(err.to_string(), "Error en IO: falló IO");
    }

    #[test]
    fn engine_variant_from() {
        let err: BridgeError = WebConnectorError::DuplicateStep("CustomerQuery".into()).into();
        assert_eq!(err.to_string(), "Error del engine: duplicate step name: CustomerQuery");
    }
}
