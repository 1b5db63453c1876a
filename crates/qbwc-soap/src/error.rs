use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::envelope::encode_fault;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SoapError {
    #[error("malformed SOAP envelope: {0}")]
    Malformed(String),
    #[error("unknown SOAP method: {0}")]
    UnknownMethod(String),
    #[error("missing parameter '{param}' for {method}")]
    MissingParameter { method: String, param: String },
    #[error("invalid value '{value}' for parameter '{param}'")]
    InvalidParameter { param: String, value: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl SoapError {
    /// `soap:Client` para errores del request, `soap:Server` para el resto.
    pub fn fault_code(&self) -> &'static str {
        match self {
            SoapError::Internal(_) => "soap:Server",
            _ => "soap:Client",
        }
    }

    /// SOAP 1.1 responde todo fault con 500.
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for SoapError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "soap fault");
        let body = encode_fault(self.fault_code(), &self.to_string());
        (self.status(), [(axum::http::header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response()
    }
}
