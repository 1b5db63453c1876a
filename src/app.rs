//! Ensamblado del servidor: stores, steps y engine a partir de
//! `ServerConfig`.

use std::sync::Arc;

use qbwc_adapters::{CustomerAdd, CustomerQuery, InMemoryPendingCustomers, InMemoryRecordSink, InvoiceQuery, RecordSink};
use qbwc_core::{EngineConfig, InMemoryIteratorStore, InMemoryTicketStore, IteratorStep, IteratorStore, ResponseOptions,
                StaticAuthenticator, TicketStore, VersionValidator, WebConnectorEngine};
use qbwc_persistence::{build_pool, PgIteratorStore, PgTicketStore, PoolProvider};
use serde_json::json;

use crate::config::ServerConfig;
use crate::errors::BridgeError;

/// Stores según haya o no `DATABASE_URL`.
pub fn build_stores(cfg: &ServerConfig) -> Result<(Arc<dyn TicketStore>, Arc<dyn IteratorStore>), BridgeError> {
    match &cfg.database_url {
        Some(url) => {
            let pool = build_pool(url, cfg.db_min_connections, cfg.db_max_connections)?;
            tracing::info!("using postgres stores");
            Ok((Arc::new(PgTicketStore::new(PoolProvider { pool: pool.clone() })),
                Arc::new(PgIteratorStore::new(PoolProvider { pool }))))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            Ok((Arc::new(InMemoryTicketStore::new()), Arc::new(InMemoryIteratorStore::new())))
        }
    }
}

/// Engine con los steps de ejemplo: clientes, facturas y altas pendientes.
pub fn build_engine(cfg: &ServerConfig,
                    tickets: Arc<dyn TicketStore>,
                    iterators: Arc<dyn IteratorStore>,
                    sink: Arc<dyn RecordSink>)
                    -> Result<WebConnectorEngine, BridgeError> {
    let authenticator = StaticAuthenticator::new(&cfg.username, &cfg.password).with_company_file(&cfg.company_file);
    let config = EngineConfig { default_options: ResponseOptions::default().with_max_returned(cfg.max_returned),
                                ..EngineConfig::default() };
    let engine = WebConnectorEngine::builder(authenticator)
        .with_config(config)
        .with_validator(VersionValidator::new(cfg.min_qbxml_major, cfg.min_qbxml_minor))
        .with_ticket_store(tickets)
        .with_iterator_store(iterators.clone())
        .add_step_with_options(IteratorStep::new(CustomerQuery::new(sink.clone()), iterators.clone()),
                               json!({"extra": {"ActiveStatus": "All"}}))
        .add_step_with_options(IteratorStep::new(InvoiceQuery::new(sink), iterators),
                               json!({"extra": {"IncludeLineItems": true}}))
        .add_step(CustomerAdd::new(InMemoryPendingCustomers::default()))
        .build()?;
    Ok(engine)
}

/// Atajo para el binario: stores, sink en memoria y engine.
pub fn build_from_config(cfg: &ServerConfig) -> Result<WebConnectorEngine, BridgeError> {
    let (tickets, iterators) = build_stores(cfg)?;
    build_engine(cfg, tickets, iterators, Arc::new(InMemoryRecordSink::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ServerConfig {
        ServerConfig::from_lookup(|key| match key {
                                      "QBWC_USERNAME" => Some("user".into()),
                                      "QBWC_PASSWORD" => Some("pw".into()),
                                      "QBWC_MAX_RETURNED" => Some("25".into()),
                                      _ => None,
                                  }).unwrap()
    }

    #[test]
    fn sample_registry_order_and_page_size() {
        let engine = build_from_config(&cfg()).unwrap();
        assert_eq!(engine.registry().names(), vec!["CustomerQuery", "InvoiceQuery", "CustomerAdd"]);

        let ticket = engine.authenticate("user", "pw").ticket;
        let rq = engine.send_request_xml(&ticket, "", "", "US", 13, 0);
        assert!(rq.contains("<MaxReturned>25</MaxReturned><ActiveStatus>All</ActiveStatus>"));
    }

    #[test]
    fn old_qbxml_is_rejected() {
        let engine = build_from_config(&cfg()).unwrap();
        let ticket = engine.authenticate("user", "pw").ticket;
        assert_eq!(engine.send_request_xml(&ticket, "", "", "US", 12, 0), "");
        assert!(!engine.is_valid_ticket(&ticket));
    }
}
