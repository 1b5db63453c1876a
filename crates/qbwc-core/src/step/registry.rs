use indexmap::IndexMap;

use crate::constants::REGISTRY_VERSION;
use crate::errors::WebConnectorError;
use crate::step::Step;

/// Lista ordenada de steps, fija desde la configuración.
///
/// El índice del registro es el `current_step` del ticket; el nombre es la
/// clave del estado del iterador, por eso debe ser único.
pub struct StepRegistry {
    steps: IndexMap<String, Box<dyn Step>>,
    hash: String,
}

impl StepRegistry {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Result<Self, WebConnectorError> {
        let mut map: IndexMap<String, Box<dyn Step>> = IndexMap::with_capacity(steps.len());
        for step in steps {
            let name = step.name().to_string();
            if map.contains_key(&name) {
                return Err(WebConnectorError::DuplicateStep(name));
            }
            map.insert(name, step);
        }
        let names: Vec<&str> = map.keys().map(String::as_str).collect();
        let hash = registry_hash(&names);
        Ok(Self { steps: map, hash })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Step> {
        self.steps.get_index(index).map(|(_, s)| s.as_ref())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.get_index_of(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.keys().map(String::as_str).collect()
    }

    pub fn registry_hash(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
         .field("steps", &self.names())
         .field("hash", &self.hash)
         .finish()
    }
}

/// Hash blake3 de la versión del registro y los nombres en orden.
pub fn registry_hash(names: &[&str]) -> String {
    let mut h = blake3::Hasher::new();
    h.update(REGISTRY_VERSION.as_bytes());
    for n in names {
        h.update(b"\n");
        h.update(n.as_bytes());
    }
    h.finalize().to_hex().to_string()
}
