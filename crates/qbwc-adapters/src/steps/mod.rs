//! Steps de ejemplo: dos queries con iterador y un alta.

mod customer_add;
mod customer_query;
mod invoice_query;

pub use customer_add::{CustomerAdd, InMemoryPendingCustomers, NewCustomer, PendingCustomers};
pub use customer_query::CustomerQuery;
pub use invoice_query::InvoiceQuery;

use quick_xml::escape::escape;

/// `<Tag>valor</Tag>` con el valor escapado.
pub(crate) fn element(tag: &str, value: &str) -> String {
    format!("<{tag}>{}</{tag}>", escape(value))
}
