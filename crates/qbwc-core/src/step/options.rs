use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::{DEFAULT_MAX_RETURNED, DEFAULT_QBXML_VERSION};
use crate::errors::WebConnectorError;

/// Opciones adjuntas a un step antes de construir su request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseOptions {
    /// Tope de filas por página para queries con iterador.
    pub max_returned: u32,
    pub qbxml_version: String,
    /// Atributo `onError` de `QBXMLMsgsRq`.
    pub on_error: String,
    /// Bolsa de opciones propias del step (filtros, flags de inclusión...).
    pub extra: Value,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self { max_returned: DEFAULT_MAX_RETURNED,
               qbxml_version: DEFAULT_QBXML_VERSION.to_string(),
               on_error: "stopOnError".to_string(),
               extra: json!({}) }
    }
}

impl ResponseOptions {
    pub fn with_max_returned(mut self, max_returned: u32) -> Self {
        self.max_returned = max_returned.max(1);
        self
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn extra_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(Value::as_bool)
    }

    /// Aplica overrides por step sobre estas opciones. Los objetos se
    /// mezclan en profundidad; cualquier otro valor reemplaza al base.
    pub fn merged(&self, overrides: &Value) -> Result<Self, WebConnectorError> {
        let mut base = serde_json::to_value(self).map_err(|e| WebConnectorError::Internal(e.to_string()))?;
        merge_json(&mut base, overrides);
        let mut merged: Self = serde_json::from_value(base)
            .map_err(|e| WebConnectorError::Internal(format!("invalid step options: {e}")))?;
        merged.max_returned = merged.max_returned.max(1);
        Ok(merged)
    }
}

fn merge_json(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(b), Value::Object(o)) => {
            for (k, v) in o {
                match b.get_mut(k) {
                    Some(slot) => merge_json(slot, v),
                    None => {
                        b.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (slot, other) => *slot = other.clone(),
    }
}
