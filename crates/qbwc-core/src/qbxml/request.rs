use quick_xml::escape::escape;

use crate::step::ResponseOptions;

/// Modo de iterador del request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IteratorRequest {
    Start,
    Continue(String),
}

/// Request qbXML de un único mensaje.
#[derive(Debug, Clone)]
pub struct QbXmlRequest<'a> {
    /// Nombre del mensaje sin sufijo (`CustomerQuery` produce `CustomerQueryRq`).
    pub message: &'a str,
    pub request_id: &'a str,
    pub iterator: Option<IteratorRequest>,
    pub max_returned: Option<u32>,
    /// Fragmento XML ya serializado que va dentro del `<...Rq>`.
    pub body: &'a str,
}

impl<'a> QbXmlRequest<'a> {
    pub fn new(message: &'a str) -> Self {
        Self { message,
               request_id: "1",
               iterator: None,
               max_returned: None,
               body: "" }
    }

    pub fn with_iterator(mut self, iterator: IteratorRequest, max_returned: u32) -> Self {
        self.iterator = Some(iterator);
        self.max_returned = Some(max_returned);
        self
    }

    pub fn with_body(mut self, body: &'a str) -> Self {
        self.body = body;
        self
    }
}

/// Serializa el request completo, prólogo incluido.
pub fn build_request(req: &QbXmlRequest<'_>, options: &ResponseOptions) -> String {
    let mut attrs = format!(" requestID=\"{}\"", escape(req.request_id));
    match &req.iterator {
        Some(IteratorRequest::Start) => attrs.push_str(" iterator=\"Start\""),
        Some(IteratorRequest::Continue(key)) => {
            attrs.push_str(" iterator=\"Continue\"");
            attrs.push_str(&format!(" iteratorID=\"{}\"", escape(key.as_str())));
        }
        None => {}
    }
    let max = req.max_returned
                 .map(|n| format!("<MaxReturned>{n}</MaxReturned>"))
                 .unwrap_or_default();
    format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\
             <?qbxml version=\"{version}\"?>\
             <QBXML><QBXMLMsgsRq onError=\"{on_error}\">\
             <{msg}Rq{attrs}>{max}{body}</{msg}Rq>\
             </QBXMLMsgsRq></QBXML>",
            version = escape(options.qbxml_version.as_str()),
            on_error = escape(options.on_error.as_str()),
            msg = req.message,
            body = req.body)
}
