//! Sobre SOAP 1.1 de las llamadas del Web Connector.
//!
//! Sólo se lee el primer elemento dentro de `Body` (el método) y sus hijos
//! directos (los parámetros, por nombre local). Los prefijos de namespace se
//! ignoran.

use std::collections::HashMap;

use qbwc_core::WebConnectorEngine;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::SoapError;

/// Namespace de las respuestas, fijado por el WSDL de Intuit.
pub const QBWC_NAMESPACE: &str = "http://developer.intuit.com/";

/// Una llamada decodificada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoapCall {
    ServerVersion,
    ClientVersion {
        version: String,
    },
    Authenticate {
        username: String,
        password: String,
    },
    SendRequestXml {
        ticket: String,
        hcp_response: String,
        company_file: String,
        country: String,
        major: u32,
        minor: u32,
    },
    ReceiveResponseXml {
        ticket: String,
        response: String,
        hresult: String,
        message: String,
    },
    ConnectionError {
        ticket: String,
        hresult: String,
        message: String,
    },
    GetLastError {
        ticket: String,
    },
    CloseConnection {
        ticket: String,
    },
}

impl SoapCall {
    /// Nombre del método en el cable.
    pub fn method(&self) -> &'static str {
        match self {
            SoapCall::ServerVersion => "serverVersion",
            SoapCall::ClientVersion { .. } => "clientVersion",
            SoapCall::Authenticate { .. } => "authenticate",
            SoapCall::SendRequestXml { .. } => "sendRequestXML",
            SoapCall::ReceiveResponseXml { .. } => "receiveResponseXML",
            SoapCall::ConnectionError { .. } => "connectionError",
            SoapCall::GetLastError { .. } => "getLastError",
            SoapCall::CloseConnection { .. } => "closeConnection",
        }
    }
}

/// Valor de retorno de una llamada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoapResult {
    Text(String),
    Int(i32),
    /// `ArrayOfString` (sólo `authenticate`).
    Strings(Vec<String>),
}

struct Params {
    method: String,
    values: HashMap<String, String>,
}

impl Params {
    fn required(&self, name: &str) -> Result<String, SoapError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| SoapError::MissingParameter { method: self.method.clone(),
                                                         param: name.to_string() })
    }

    /// El cliente omite o vacía algunos parámetros; ausente = `""`.
    fn optional(&self, name: &str) -> String {
        self.values.get(name).cloned().unwrap_or_default()
    }

    fn number(&self, name: &str) -> Result<u32, SoapError> {
        let raw = self.optional(name);
        if raw.trim().is_empty() {
            return Ok(0);
        }
        raw.trim()
           .parse()
           .map_err(|_| SoapError::InvalidParameter { param: name.to_string(),
                                                      value: raw.clone() })
    }
}

fn read_params(xml: &str) -> Result<Params, SoapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_body = false;
    let mut method: Option<String> = None;
    let mut param: Option<(String, String)> = None;
    let mut nested = 0usize;
    let mut values = HashMap::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if !in_body {
                    in_body = name == "Body";
                } else if method.is_none() {
                    method = Some(name);
                } else if param.is_none() {
                    param = Some((name, String::new()));
                } else {
                    nested += 1;
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if in_body {
                    if method.is_none() {
                        method = Some(name);
                    } else if param.is_none() {
                        values.insert(name, String::new());
                    }
                }
            }
            Ok(Event::Text(ref t)) => {
                if let Some((_, value)) = param.as_mut() {
                    let text = t.unescape()
                                .map_err(|e| SoapError::Malformed(e.to_string()))?;
                    value.push_str(&text);
                }
            }
            Ok(Event::CData(ref c)) => {
                if let Some((_, value)) = param.as_mut() {
                    value.push_str(&String::from_utf8_lossy(c));
                }
            }
            Ok(Event::End(_)) => {
                if nested > 0 {
                    nested -= 1;
                } else if let Some((name, value)) = param.take() {
                    values.insert(name, value);
                } else if method.is_some() {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SoapError::Malformed(format!("at {}: {e}", reader.buffer_position()))),
            _ => {}
        }
        buf.clear();
    }

    let method = method.ok_or_else(|| SoapError::Malformed("no method element inside soap:Body".into()))?;
    Ok(Params { method, values })
}

/// Decodifica el sobre completo en una `SoapCall`.
pub fn decode_call(xml: &str) -> Result<SoapCall, SoapError> {
    let p = read_params(xml)?;
    let call = match p.method.as_str() {
        "serverVersion" => SoapCall::ServerVersion,
        "clientVersion" => SoapCall::ClientVersion { version: p.optional("strVersion") },
        "authenticate" => SoapCall::Authenticate { username: p.required("strUserName")?,
                                                   password: p.optional("strPassword") },
        "sendRequestXML" => SoapCall::SendRequestXml { ticket: p.required("ticket")?,
                                                       hcp_response: p.optional("strHCPResponse"),
                                                       company_file: p.optional("strCompanyFileName"),
                                                       country: p.optional("qbXMLCountry"),
                                                       major: p.number("qbXMLMajorVers")?,
                                                       minor: p.number("qbXMLMinorVers")? },
        "receiveResponseXML" => SoapCall::ReceiveResponseXml { ticket: p.required("ticket")?,
                                                               response: p.optional("response"),
                                                               hresult: p.optional("hresult"),
                                                               message: p.optional("message") },
        "connectionError" => SoapCall::ConnectionError { ticket: p.required("ticket")?,
                                                         hresult: p.optional("hresult"),
                                                         message: p.optional("message") },
        "getLastError" => SoapCall::GetLastError { ticket: p.required("ticket")? },
        "closeConnection" => SoapCall::CloseConnection { ticket: p.required("ticket")? },
        other => return Err(SoapError::UnknownMethod(other.to_string())),
    };
    Ok(call)
}

/// Ejecuta la llamada contra el engine. Bloqueante: los stores pueden
/// hacer I/O síncrono.
pub fn dispatch(engine: &WebConnectorEngine, call: &SoapCall) -> SoapResult {
    match call {
        SoapCall::ServerVersion => SoapResult::Text(engine.server_version()),
        SoapCall::ClientVersion { version } => SoapResult::Text(engine.client_version(version)),
        SoapCall::Authenticate { username, password } => {
            SoapResult::Strings(engine.authenticate(username, password).wire_values().to_vec())
        }
        SoapCall::SendRequestXml { ticket,
                                   hcp_response,
                                   company_file,
                                   country,
                                   major,
                                   minor, } => {
            SoapResult::Text(engine.send_request_xml(ticket, hcp_response, company_file, country, *major, *minor))
        }
        SoapCall::ReceiveResponseXml { ticket,
                                       response,
                                       hresult,
                                       message, } => {
            SoapResult::Int(engine.receive_response_xml(ticket, response, hresult, message))
        }
        SoapCall::ConnectionError { ticket, hresult, message } => {
            SoapResult::Text(engine.connection_error(ticket, hresult, message))
        }
        SoapCall::GetLastError { ticket } => SoapResult::Text(engine.get_last_error(ticket)),
        SoapCall::CloseConnection { ticket } => SoapResult::Text(engine.close_connection(ticket)),
    }
}

fn wrap_body(inner: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\
             <soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\">\
             <soap:Body>{inner}</soap:Body></soap:Envelope>")
}

/// `<{method}Response><{method}Result>..</{method}Result></{method}Response>`.
pub fn encode_result(method: &str, result: &SoapResult) -> String {
    let value = match result {
        SoapResult::Text(s) => escape(s.as_str()).into_owned(),
        SoapResult::Int(n) => n.to_string(),
        SoapResult::Strings(items) => items.iter()
                                           .map(|s| format!("<string>{}</string>", escape(s.as_str())))
                                           .collect(),
    };
    wrap_body(&format!("<{method}Response xmlns=\"{QBWC_NAMESPACE}\"><{method}Result>{value}</{method}Result></{method}Response>"))
}

pub fn encode_fault(code: &str, message: &str) -> String {
    wrap_body(&format!("<soap:Fault><faultcode>{}</faultcode><faultstring>{}</faultstring></soap:Fault>",
                       escape(code),
                       escape(message)))
}
