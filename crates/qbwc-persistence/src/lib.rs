//! qbwc-persistence
//!
//! Stores durables (Postgres vía Diesel) para los traits del core:
//! `TicketStore` sobre `qbwc_tickets` e `IteratorStore` sobre
//! `qbwc_iterators`. Con ellos el flag de versión rechazada y los cursores
//! de iterador sobreviven a un reinicio del proceso.
//!
//! Módulos:
//! - `pg`: pool, reintentos y las dos implementaciones.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgIteratorStore, PgPool, PgTicketStore,
             PoolProvider};
