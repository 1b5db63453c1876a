
use std::sync::Arc;

use qbwc_core::{FnStep, VersionValidator, WebConnectorEngine};
use qbwc_persistence::{PgIteratorStore, PgTicketStore, PoolProvider};
use test_support::with_pool;

fn engine(pool: &qbwc_persistence::PgPool) -> WebConnectorEngine {
    WebConnectorEngine::with_credentials("user", "pw")
        .with_validator(VersionValidator::new(13, 0))
        .with_ticket_store(Arc::new(PgTicketStore::new(PoolProvider { pool: pool.clone() })))
        .with_iterator_store(Arc::new(PgIteratorStore::new(PoolProvider { pool: pool.clone() })))
        .add_step(FnStep::new("Ping", |_, _| Ok(Some("<PingRq/>".to_string())), |_, _, _| Ok(100)))
        .build()
        .expect("engine")
}

#[test]
fn version_rejection_holds_after_restart() {
    with_pool(|pool| {
        let first = engine(pool);
        let ticket = first.authenticate("user", "pw").ticket;
        assert_eq!(first.send_request_xml(&ticket, "", "", "US", 10, 0), "");
        drop(first);

        let restarted = engine(pool);
        assert!(!restarted.is_valid_ticket(&ticket));
        assert_eq!(restarted.send_request_xml(&ticket, "", "", "US", 13, 0), "");
        restarted.close_connection(&ticket);
    });
}

#[test]
fn session_resumes_on_a_new_engine() {
    with_pool(|pool| {
        let first = engine(pool);
        let ticket = first.authenticate("user", "pw").ticket;
        assert_eq!(first.send_request_xml(&ticket, "", "", "US", 13, 0), "<PingRq/>");
        drop(first);

        let restarted = engine(pool);
        assert_eq!(restarted.receive_response_xml(&ticket, "<ok/>", "", ""), 100);
        assert_eq!(restarted.close_connection(&ticket), "Sync Completed");
    });
}
