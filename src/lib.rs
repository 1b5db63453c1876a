//! qbwc-bridge
//!
//! Servidor para QuickBooks Web Connector:
//! - `config`: `ServerConfig` desde variables de entorno / `.env`.
//! - `errors`: errores de arranque.
//! - `app`: ensamblado de stores, steps y engine.
//! - `logging`: subscriber de `tracing`.
//!
//! La lógica de sesión vive en `qbwc-core`; el transporte en `qbwc-soap`.

pub mod app;
pub mod config;
pub mod errors;
pub mod logging;

pub use config::ServerConfig;
pub use errors::BridgeError;
