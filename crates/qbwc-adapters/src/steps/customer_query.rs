use std::sync::Arc;

use qbwc_core::{AuthenticatedTicket, IteratorQuery, QbXmlResponse, ResponseOptions, WebConnectorError};

use super::element;
use crate::sink::RecordSink;

/// `CustomerQueryRq` paginado. Opciones en `extra`: `ActiveStatus`
/// (`ActiveOnly`, `InactiveOnly`, `All`) y `FromModifiedDate`.
pub struct CustomerQuery {
    sink: Arc<dyn RecordSink>,
}

impl CustomerQuery {
    pub const NAME: &'static str = "CustomerQuery";

    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self { sink }
    }
}

impl IteratorQuery for CustomerQuery {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn message(&self) -> &str {
        "CustomerQuery"
    }

    fn request_body(&self, _ticket: &AuthenticatedTicket, options: &ResponseOptions) -> Result<String, WebConnectorError> {
        let mut body = String::new();
        if let Some(status) = options.extra_str("ActiveStatus") {
            body.push_str(&element("ActiveStatus", status));
        }
        if let Some(from) = options.extra_str("FromModifiedDate") {
            body.push_str(&element("FromModifiedDate", from));
        }
        Ok(body)
    }

    fn consume_page(&self, ticket: &AuthenticatedTicket, page: &QbXmlResponse) -> Result<(), WebConnectorError> {
        self.sink.store(&ticket.ticket, Self::NAME, &page.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemoryRecordSink;
    use serde_json::json;

    #[test]
    fn filters_come_from_extra_options() {
        let q = CustomerQuery::new(Arc::new(InMemoryRecordSink::new()));
        let options = ResponseOptions { extra: json!({"ActiveStatus": "All", "FromModifiedDate": "2024-01-01"}),
                                        ..ResponseOptions::default() };
        let body = q.request_body(&AuthenticatedTicket::new("t", "h"), &options).unwrap();
        assert_eq!(body, "<ActiveStatus>All</ActiveStatus><FromModifiedDate>2024-01-01</FromModifiedDate>");
        assert_eq!(q.request_body(&AuthenticatedTicket::new("t", "h"), &ResponseOptions::default()).unwrap(), "");
    }
}
