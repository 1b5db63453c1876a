//! Sobre genérico qbXML.
//!
//! Sólo se modelan las partes de control: prólogo, `QBXMLMsgsRq`, atributos
//! de iterador y el bloque de estado de cada respuesta. El contenido de
//! dominio (un cliente, una factura) viaja como fragmento opaco en el request
//! y como registros aplanados `ruta -> texto` en la respuesta.

mod request;
mod response;

pub use request::{build_request, IteratorRequest, QbXmlRequest};
pub use response::{parse_response, QbXmlRecord, QbXmlResponse, StatusSeverity};
