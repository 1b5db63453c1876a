use serde::{Deserialize, Serialize};

use crate::step::ResponseOptions;

/// Configuración del driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Respuesta de `serverVersion`.
    pub server_version: String,
    /// Por debajo de esta versión del Web Connector, `clientVersion`
    /// devuelve `E:` y el cliente no continúa.
    pub min_client_version: Option<String>,
    /// Por debajo de esta, `W:` (el usuario puede seguir).
    pub recommended_client_version: Option<String>,
    /// Base sobre la que se aplican las opciones de cada step.
    pub default_options: ResponseOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { server_version: env!("CARGO_PKG_VERSION").to_string(),
               min_client_version: None,
               recommended_client_version: None,
               default_options: ResponseOptions::default() }
    }
}
