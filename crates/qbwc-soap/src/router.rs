use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use qbwc_core::WebConnectorEngine;
use tower_http::trace::TraceLayer;

use crate::envelope::{decode_call, dispatch, encode_result};
use crate::error::SoapError;

/// Estado compartido del router.
#[derive(Clone)]
pub struct SoapState {
    pub engine: Arc<WebConnectorEngine>,
}

/// Router con el endpoint SOAP montado en `path`.
pub fn create_router(engine: Arc<WebConnectorEngine>, path: &str) -> Router {
    Router::new().route(path, post(soap_endpoint))
                 .layer(TraceLayer::new_for_http())
                 .with_state(SoapState { engine })
}

async fn soap_endpoint(State(state): State<SoapState>, body: String) -> Result<Response, SoapError> {
    let call = decode_call(&body)?;
    let method = call.method();
    tracing::debug!(method, "soap call");

    // El engine es síncrono y puede tocar la base de datos.
    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || dispatch(&engine, &call)).await
                                                                              .map_err(|e| SoapError::Internal(e.to_string()))?;

    let xml = encode_result(method, &result);
    Ok(([(CONTENT_TYPE, "text/xml; charset=utf-8")], xml).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    #[tokio::test]
    async fn server_version_round_trip() {
        let engine = WebConnectorEngine::with_credentials("u", "p").build().unwrap();
        let server = TestServer::new(create_router(Arc::new(engine), "/qbwc")).unwrap();

        let response = server.post("/qbwc")
                             .text("<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\"><soap:Body>\
                                    <serverVersion xmlns=\"http://developer.intuit.com/\" /></soap:Body></soap:Envelope>")
                             .await;
        response.assert_status_ok();
        assert!(response.text().contains("<serverVersionResult>"));
    }

    #[tokio::test]
    async fn garbage_body_is_a_client_fault() {
        let engine = WebConnectorEngine::with_credentials("u", "p").build().unwrap();
        let server = TestServer::new(create_router(Arc::new(engine), "/qbwc")).unwrap();

        let response = server.post("/qbwc").text("not xml at all").expect_failure().await;
        assert_eq!(response.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.text().contains("<faultcode>soap:Client</faultcode>"));
    }
}
