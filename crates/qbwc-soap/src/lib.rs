//! qbwc-soap: transporte SOAP mínimo para el Web Connector.
//!
//! Decodifica el sobre SOAP de cada llamada, la despacha al
//! `WebConnectorEngine` y codifica el resultado. No sirve WSDL.
pub mod envelope;
pub mod error;
pub mod router;

pub use envelope::{decode_call, dispatch, encode_fault, encode_result, SoapCall, SoapResult};
pub use error::SoapError;
pub use router::{create_router, SoapState};
