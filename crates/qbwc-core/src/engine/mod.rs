//! Driver de sesión del Web Connector.
//!
//! Orquesta la secuencia de llamadas del cliente: authenticate, luego
//! sendRequestXML/receiveResponseXML alternados sobre el registro de steps,
//! y closeConnection. Cada llamada toma el lock de su ticket, carga el
//! registro, lo muta sobre una copia y sólo la persiste si la operación
//! terminó bien.

pub mod builder;
pub mod config;
pub mod core;
mod locks;
pub mod version;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use core::WebConnectorEngine;
pub use version::compare_versions;
