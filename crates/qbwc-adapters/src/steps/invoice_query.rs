use std::sync::Arc;

use qbwc_core::{AuthenticatedTicket, IteratorQuery, QbXmlResponse, ResponseOptions, WebConnectorError};

use super::element;
use crate::sink::RecordSink;

/// `InvoiceQueryRq` paginado. Opciones: `FromModifiedDate` y
/// `IncludeLineItems` (bool).
pub struct InvoiceQuery {
    sink: Arc<dyn RecordSink>,
}

impl InvoiceQuery {
    pub const NAME: &'static str = "InvoiceQuery";

    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self { sink }
    }
}

impl IteratorQuery for InvoiceQuery {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn message(&self) -> &str {
        "InvoiceQuery"
    }

    fn request_body(&self, _ticket: &AuthenticatedTicket, options: &ResponseOptions) -> Result<String, WebConnectorError> {
        let mut body = String::new();
        if let Some(from) = options.extra_str("FromModifiedDate") {
            body.push_str("<ModifiedDateRangeFilter>");
            body.push_str(&element("FromModifiedDate", from));
            body.push_str("</ModifiedDateRangeFilter>");
        }
        if let Some(include) = options.extra_bool("IncludeLineItems") {
            body.push_str(&element("IncludeLineItems", if include { "true" } else { "false" }));
        }
        Ok(body)
    }

    fn consume_page(&self, ticket: &AuthenticatedTicket, page: &QbXmlResponse) -> Result<(), WebConnectorError> {
        self.sink.store(&ticket.ticket, Self::NAME, &page.records)
    }
}
