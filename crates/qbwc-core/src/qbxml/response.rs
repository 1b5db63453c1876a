use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

use crate::errors::WebConnectorError;

/// `statusCode` que QuickBooks usa para "la query no encontró objetos".
const STATUS_NO_MATCH: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusSeverity {
    Info,
    Warn,
    Error,
}

impl StatusSeverity {
    fn parse(raw: &str) -> Self {
        match raw {
            "Error" => StatusSeverity::Error,
            "Warn" | "Warning" => StatusSeverity::Warn,
            _ => StatusSeverity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusSeverity::Info => "Info",
            StatusSeverity::Warn => "Warn",
            StatusSeverity::Error => "Error",
        }
    }
}

/// Hijo directo del `<...Rs>` (p. ej. `CustomerRet`) con sus hojas
/// aplanadas: `BillAddress/City -> "Toronto"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QbXmlRecord {
    pub tag: String,
    pub fields: BTreeMap<String, String>,
}

impl QbXmlRecord {
    fn new(tag: String) -> Self {
        Self { tag, fields: BTreeMap::new() }
    }

    pub fn field(&self, path: &str) -> Option<&str> {
        self.fields.get(path).map(String::as_str)
    }
}

/// Bloque de estado y registros de un mensaje de respuesta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QbXmlResponse {
    pub message_tag: String,
    pub request_id: Option<String>,
    pub status_code: i32,
    pub status_severity: StatusSeverity,
    pub status_message: String,
    pub iterator_id: Option<String>,
    pub iterator_remaining_count: Option<u32>,
    pub records: Vec<QbXmlRecord>,
}

impl QbXmlResponse {
    fn from_status(tag: String) -> Self {
        Self { message_tag: tag,
               request_id: None,
               status_code: 0,
               status_severity: StatusSeverity::Info,
               status_message: String::new(),
               iterator_id: None,
               iterator_remaining_count: None,
               records: Vec::new() }
    }

    /// `statusCode=1` con severidad no-Error es un resultado vacío válido.
    pub fn is_no_match(&self) -> bool {
        self.status_code == STATUS_NO_MATCH && self.status_severity != StatusSeverity::Error
    }

    pub fn ensure_success(&self) -> Result<(), WebConnectorError> {
        if self.status_severity == StatusSeverity::Error {
            return Err(WebConnectorError::ResponseStatus { code: self.status_code,
                                                           severity: self.status_severity.as_str().to_string(),
                                                           message: self.status_message.clone() });
        }
        Ok(())
    }
}

fn malformed(detail: impl std::fmt::Display) -> WebConnectorError {
    WebConnectorError::MalformedResponse(detail.to_string())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn read_status(e: &BytesStart<'_>, tag: &str) -> Result<QbXmlResponse, WebConnectorError> {
    let mut rs = QbXmlResponse::from_status(tag.to_string());
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(format!("attribute on <{tag}>: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let value = attr.unescape_value()
                        .map_err(|err| malformed(format!("attribute {key}: {err}")))?
                        .into_owned();
        match key.as_str() {
            "requestID" => rs.request_id = Some(value),
            "statusCode" => {
                rs.status_code = value.trim()
                                      .parse()
                                      .map_err(|_| malformed(format!("statusCode '{value}' is not a number")))?
            }
            "statusSeverity" => rs.status_severity = StatusSeverity::parse(&value),
            "statusMessage" => rs.status_message = value,
            "iteratorID" if !value.is_empty() => rs.iterator_id = Some(value),
            "iteratorRemainingCount" => {
                rs.iterator_remaining_count =
                    Some(value.trim()
                              .parse()
                              .map_err(|_| malformed(format!("iteratorRemainingCount '{value}' is not a number")))?)
            }
            _ => {}
        }
    }
    Ok(rs)
}

/// Extrae el primer `<response_tag>` del documento.
///
/// Errores (`MalformedResponse`): XML inválido o truncado, atributos de
/// estado no numéricos, o ausencia del elemento pedido.
pub fn parse_response(xml: &str, response_tag: &str) -> Result<QbXmlResponse, WebConnectorError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut found: Option<QbXmlResponse> = None;
    let mut records: Vec<QbXmlRecord> = Vec::new();
    let mut current: Option<QbXmlRecord> = None;
    // Ruta de elementos abiertos por debajo del `<...Rs>`; `None` = fuera.
    let mut path: Option<Vec<String>> = None;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e);
                if let Some(p) = path.as_mut() {
                    if p.is_empty() {
                        current = Some(QbXmlRecord::new(name.clone()));
                    }
                    p.push(name);
                } else if found.is_none() && name == response_tag {
                    found = Some(read_status(e, response_tag)?);
                    path = Some(Vec::new());
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e);
                match path.as_ref() {
                    Some(p) if p.is_empty() => records.push(QbXmlRecord::new(name)),
                    Some(p) => {
                        if let Some(rec) = current.as_mut() {
                            let mut key = p[1..].to_vec();
                            key.push(name);
                            rec.fields.insert(key.join("/"), String::new());
                        }
                    }
                    None if found.is_none() && name == response_tag => {
                        found = Some(read_status(e, response_tag)?);
                    }
                    None => {}
                }
            }
            Ok(Event::Text(ref t)) => {
                if let (Some(p), Some(rec)) = (path.as_ref(), current.as_mut()) {
                    if p.len() >= 2 {
                        let text = t.unescape().map_err(malformed)?;
                        rec.fields.insert(p[1..].join("/"), text.into_owned());
                    }
                }
            }
            Ok(Event::CData(ref c)) => {
                if let (Some(p), Some(rec)) = (path.as_ref(), current.as_mut()) {
                    if p.len() >= 2 {
                        rec.fields.insert(p[1..].join("/"), String::from_utf8_lossy(c).to_string());
                    }
                }
            }
            Ok(Event::End(_)) => {
                if let Some(p) = path.as_mut() {
                    if p.pop().is_none() {
                        path = None;
                    } else if p.is_empty() {
                        if let Some(rec) = current.take() {
                            records.push(rec);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(format!("XML parse error at {}: {e}", reader.buffer_position()))),
            _ => {}
        }
        buf.clear();
    }

    if path.is_some() {
        return Err(malformed(format!("unexpected end of document inside <{response_tag}>")));
    }
    let mut rs = found.ok_or_else(|| malformed(format!("missing <{response_tag}> element")))?;
    rs.records = records;
    Ok(rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMER_PAGE: &str = r#"<?xml version="1.0" ?><QBXML><QBXMLMsgsRs><CustomerQueryRs requestID="1" statusCode="0" statusSeverity="Info" statusMessage="Status OK" iteratorRemainingCount="18" iteratorID="{eb05f701-e727-472f-8ade-6753c4f67a46}"><CustomerRet><ListID>110000-1232697602</ListID><Name>10th Customer</Name><FullName>ABC &amp; Co</FullName><BillAddress><City>Toronto</City></BillAddress><IsActive>true</IsActive></CustomerRet></CustomerQueryRs></QBXMLMsgsRs></QBXML>"#;

    #[test]
    fn reads_status_block_and_iterator_attributes() {
        let rs = parse_response(CUSTOMER_PAGE, "CustomerQueryRs").expect("parse");
        assert_eq!(rs.request_id.as_deref(), Some("1"));
        assert_eq!(rs.status_code, 0);
        assert_eq!(rs.status_severity, StatusSeverity::Info);
        assert_eq!(rs.iterator_id.as_deref(), Some("{eb05f701-e727-472f-8ade-6753c4f67a46}"));
        assert_eq!(rs.iterator_remaining_count, Some(18));
    }

    #[test]
    fn flattens_record_fields() {
        let rs = parse_response(CUSTOMER_PAGE, "CustomerQueryRs").unwrap();
        assert_eq!(rs.records.len(), 1);
        let rec = &rs.records[0];
        assert_eq!(rec.tag, "CustomerRet");
        assert_eq!(rec.field("ListID"), Some("110000-1232697602"));
        assert_eq!(rec.field("FullName"), Some("ABC & Co"));
        assert_eq!(rec.field("BillAddress/City"), Some("Toronto"));
    }

    #[test]
    fn self_closing_response_is_an_empty_result() {
        let xml = r#"<QBXML><QBXMLMsgsRs><CustomerQueryRs requestID="1" statusCode="1" statusSeverity="Info" statusMessage="A query request did not find a matching object in QuickBooks" /></QBXMLMsgsRs></QBXML>"#;
        let rs = parse_response(xml, "CustomerQueryRs").unwrap();
        assert!(rs.records.is_empty());
        assert!(rs.is_no_match());
        assert!(rs.ensure_success().is_ok());
        assert!(rs.iterator_id.is_none());
    }

    #[test]
    fn error_severity_is_reported() {
        let xml = r#"<QBXML><QBXMLMsgsRs><CustomerAddRs statusCode="3100" statusSeverity="Error" statusMessage="The name is already in use."></CustomerAddRs></QBXMLMsgsRs></QBXML>"#;
        let rs = parse_response(xml, "CustomerAddRs").unwrap();
        match rs.ensure_success() {
            Err(WebConnectorError::ResponseStatus { code, .. }) => assert_eq!(code, 3100),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_element_and_broken_xml_are_malformed() {
        assert!(matches!(parse_response("<QBXML></QBXML>", "CustomerQueryRs"),
                         Err(WebConnectorError::MalformedResponse(_))));
        assert!(matches!(parse_response("<QBXML><CustomerQueryRs statusCode=\"0\"><CustomerRet></QBXML>", "CustomerQueryRs"),
                         Err(WebConnectorError::MalformedResponse(_))));
        assert!(matches!(parse_response("<QBXML><CustomerQueryRs statusCode=\"0\">", "CustomerQueryRs"),
                         Err(WebConnectorError::MalformedResponse(_))));
        assert!(matches!(parse_response("<CustomerQueryRs statusCode=\"abc\"/>", "CustomerQueryRs"),
                         Err(WebConnectorError::MalformedResponse(_))));
    }
}
