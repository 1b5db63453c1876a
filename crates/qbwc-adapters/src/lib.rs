//! qbwc-adapters: steps de ejemplo sobre `qbwc-core`.
//!
//! Aquí vive lo que el core deja fuera a propósito: el contenido de dominio
//! de los requests (filtros de cliente, de factura) y adónde van los
//! registros recibidos.
pub mod sink;
pub mod steps;

pub use sink::{InMemoryRecordSink, RecordSink, StoredRecord};
pub use steps::{CustomerAdd, CustomerQuery, InMemoryPendingCustomers, InvoiceQuery, NewCustomer, PendingCustomers};
