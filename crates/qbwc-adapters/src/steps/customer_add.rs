use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use qbwc_core::qbxml::{build_request, parse_response, QbXmlRequest};
use qbwc_core::step::check_hresult;
use qbwc_core::{AuthenticatedTicket, ResponseOptions, Step, WebConnectorError};
use log::debug;
use serde::{Deserialize, Serialize};

use super::element;

/// Cliente pendiente de alta en QuickBooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewCustomer {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               company_name: None,
               email: None,
               phone: None }
    }

    fn to_body(&self) -> String {
        let mut body = String::from("<CustomerAdd>");
        body.push_str(&element("Name", &self.name));
        if let Some(v) = &self.company_name {
            body.push_str(&element("CompanyName", v));
        }
        if let Some(v) = &self.phone {
            body.push_str(&element("Phone", v));
        }
        if let Some(v) = &self.email {
            body.push_str(&element("Email", v));
        }
        body.push_str("</CustomerAdd>");
        body
    }
}

/// Origen de los clientes a dar de alta.
///
/// Cada ticket reserva su cliente con `claim`; la reserva se mantiene hasta
/// `complete` (respuesta correcta) o `release` (cierre de la sesión), así
/// que un reintento reenvía el mismo y dos sesiones nunca envían el mismo.
pub trait PendingCustomers: Send + Sync {
    /// Cliente reservado por `ticket`, o el siguiente libre (que queda
    /// reservado). `None` si no queda ninguno libre.
    fn claim(&self, ticket: &str) -> Result<Option<NewCustomer>, WebConnectorError>;
    fn claimed(&self, ticket: &str) -> Result<Option<NewCustomer>, WebConnectorError>;
    /// Marca como dado de alta el cliente reservado por `ticket`.
    fn complete(&self, ticket: &str, list_id: Option<&str>) -> Result<NewCustomer, WebConnectorError>;
    /// Devuelve la reserva de `ticket` a la cola.
    fn release(&self, ticket: &str) -> Result<(), WebConnectorError>;
    /// Libres más reservados.
    fn remaining(&self) -> Result<usize, WebConnectorError>;
    fn completed(&self) -> Result<usize, WebConnectorError>;
}

#[derive(Debug, Default)]
struct Queue {
    pending: VecDeque<NewCustomer>,
    claims: HashMap<String, NewCustomer>,
    /// (nombre, ListID asignado por QuickBooks)
    done: Vec<(String, Option<String>)>,
}

#[derive(Debug, Default)]
pub struct InMemoryPendingCustomers {
    inner: Mutex<Queue>,
}

impl InMemoryPendingCustomers {
    pub fn new<I: IntoIterator<Item = NewCustomer>>(customers: I) -> Self {
        Self { inner: Mutex::new(Queue { pending: customers.into_iter().collect(),
                                         ..Queue::default() }) }
    }

    pub fn push(&self, customer: NewCustomer) -> Result<(), WebConnectorError> {
        self.lock()?.pending.push_back(customer);
        Ok(())
    }

    pub fn added(&self) -> Vec<(String, Option<String>)> {
        self.lock().map(|q| q.done.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Queue>, WebConnectorError> {
        self.inner
            .lock()
            .map_err(|_| WebConnectorError::Internal("pending customers lock poisoned".into()))
    }
}

impl PendingCustomers for InMemoryPendingCustomers {
    fn claim(&self, ticket: &str) -> Result<Option<NewCustomer>, WebConnectorError> {
        let mut q = self.lock()?;
        if let Some(c) = q.claims.get(ticket) {
            return Ok(Some(c.clone()));
        }
        let Some(next) = q.pending.pop_front() else {
            return Ok(None);
        };
        q.claims.insert(ticket.to_string(), next.clone());
        Ok(Some(next))
    }

    fn claimed(&self, ticket: &str) -> Result<Option<NewCustomer>, WebConnectorError> {
        Ok(self.lock()?.claims.get(ticket).cloned())
    }

    fn complete(&self, ticket: &str, list_id: Option<&str>) -> Result<NewCustomer, WebConnectorError> {
        let mut q = self.lock()?;
        let customer = q.claims
                        .remove(ticket)
                        .ok_or_else(|| WebConnectorError::Internal(format!("ticket {ticket} has no claimed customer")))?;
        q.done.push((customer.name.clone(), list_id.map(str::to_string)));
        Ok(customer)
    }

    fn release(&self, ticket: &str) -> Result<(), WebConnectorError> {
        let mut q = self.lock()?;
        if let Some(c) = q.claims.remove(ticket) {
            q.pending.push_front(c);
        }
        Ok(())
    }

    fn remaining(&self) -> Result<usize, WebConnectorError> {
        let q = self.lock()?;
        Ok(q.pending.len() + q.claims.len())
    }

    fn completed(&self) -> Result<usize, WebConnectorError> {
        Ok(self.lock()?.done.len())
    }
}

/// Step sin iterador: un `CustomerAddRq` por cliente pendiente. Devuelve
/// `None` cuando no queda cliente libre para el ticket, así que el driver lo
/// salta sin ida y vuelta.
pub struct CustomerAdd<P: PendingCustomers> {
    source: P,
    options: ResponseOptions,
}

impl<P: PendingCustomers> CustomerAdd<P> {
    pub const NAME: &'static str = "CustomerAdd";

    pub fn new(source: P) -> Self {
        Self { source,
               options: ResponseOptions::default() }
    }

    pub fn source(&self) -> &P {
        &self.source
    }
}

impl<P: PendingCustomers> Step for CustomerAdd<P> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_options(&mut self, options: ResponseOptions) {
        self.options = options;
    }

    fn send_xml(&self, ticket: &AuthenticatedTicket) -> Result<Option<String>, WebConnectorError> {
        Ok(self.source.claim(&ticket.ticket)?.map(|customer| {
                                                  let body = customer.to_body();
                                                  build_request(&QbXmlRequest::new("CustomerAdd").with_body(&body),
                                                                &self.options)
                                              }))
    }

    fn receive_xml(&self,
                   ticket: &AuthenticatedTicket,
                   response: &str,
                   hresult: &str,
                   message: &str)
                   -> Result<i32, WebConnectorError> {
        check_hresult(hresult, message)?;
        let rs = parse_response(response, "CustomerAddRs")?;
        rs.ensure_success()?;
        if self.source.claimed(&ticket.ticket)?.is_none() {
            return Err(WebConnectorError::StepFailure { step: Self::NAME.into(),
                                                        reason: "response without a claimed customer".into() });
        }
        let list_id = rs.records.first().and_then(|r| r.field("ListID"));
        let customer = self.source.complete(&ticket.ticket, list_id)?;
        debug!("ticket {} added customer '{}' ({:?})", ticket.ticket, customer.name, list_id);

        let done = self.source.completed()?;
        let remaining = self.source.remaining()?;
        if remaining == 0 {
            return Ok(100);
        }
        Ok(((done * 100) / (done + remaining)).min(99) as i32)
    }

    fn close(&self, ticket: &str) -> Result<(), WebConnectorError> {
        self.source.release(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added_response(name: &str, list_id: &str) -> String {
        format!("<QBXML><QBXMLMsgsRs><CustomerAddRs requestID=\"1\" statusCode=\"0\" statusSeverity=\"Info\" \
                 statusMessage=\"Status OK\"><CustomerRet><ListID>{list_id}</ListID><Name>{name}</Name></CustomerRet>\
                 </CustomerAddRs></QBXMLMsgsRs></QBXML>")
    }

    #[test]
    fn empty_queue_has_nothing_to_send() {
        let step = CustomerAdd::new(InMemoryPendingCustomers::default());
        assert!(step.send_xml(&AuthenticatedTicket::new("t", "h")).unwrap().is_none());
    }

    #[test]
    fn one_request_per_customer_until_queue_drains() {
        let step = CustomerAdd::new(InMemoryPendingCustomers::new([NewCustomer::named("Ada & Co"),
                                                                    NewCustomer::named("Grace")]));
        let t = AuthenticatedTicket::new("t", "h");

        let rq = step.send_xml(&t).unwrap().unwrap();
        assert!(rq.contains("<CustomerAddRq requestID=\"1\"><CustomerAdd><Name>Ada &amp; Co</Name></CustomerAdd>"));
        assert_eq!(step.receive_xml(&t, &added_response("Ada &amp; Co", "80000001-1"), "", "").unwrap(), 50);

        let rq = step.send_xml(&t).unwrap().unwrap();
        assert!(rq.contains("<Name>Grace</Name>"));
        assert_eq!(step.receive_xml(&t, &added_response("Grace", "80000002-1"), "", "").unwrap(), 100);
        assert!(step.send_xml(&t).unwrap().is_none());
        assert_eq!(step.source().added()[0], ("Ada & Co".to_string(), Some("80000001-1".to_string())));
    }

    #[test]
    fn rejected_add_keeps_customer_queued() {
        let step = CustomerAdd::new(InMemoryPendingCustomers::new([NewCustomer::named("Ada")]));
        let t = AuthenticatedTicket::new("t", "h");
        step.send_xml(&t).unwrap();
        let rejected = "<QBXML><QBXMLMsgsRs><CustomerAddRs statusCode=\"3100\" statusSeverity=\"Error\" \
                        statusMessage=\"The name is already in use.\"/></QBXMLMsgsRs></QBXML>";
        assert!(matches!(step.receive_xml(&t, rejected, "", ""),
                         Err(WebConnectorError::ResponseStatus { code: 3100, .. })));
        assert_eq!(step.source().remaining().unwrap(), 1);
        // El reintento reenvía el mismo cliente.
        assert!(step.send_xml(&t).unwrap().unwrap().contains("<Name>Ada</Name>"));
    }

    #[test]
    fn concurrent_tickets_add_distinct_customers() {
        let step = CustomerAdd::new(InMemoryPendingCustomers::new([NewCustomer::named("Ada"), NewCustomer::named("Grace")]));
        let t1 = AuthenticatedTicket::new("t1", "h");
        let t2 = AuthenticatedTicket::new("t2", "h");

        assert!(step.send_xml(&t1).unwrap().unwrap().contains("<Name>Ada</Name>"));
        assert!(step.send_xml(&t2).unwrap().unwrap().contains("<Name>Grace</Name>"));
        // t2 responde antes que t1.
        assert_eq!(step.receive_xml(&t2, &added_response("Grace", "ID-2"), "", "").unwrap(), 50);
        assert_eq!(step.receive_xml(&t1, &added_response("Ada", "ID-1"), "", "").unwrap(), 100);

        let added = step.source().added();
        assert!(added.contains(&("Ada".to_string(), Some("ID-1".to_string()))));
        assert!(added.contains(&("Grace".to_string(), Some("ID-2".to_string()))));
        assert!(step.send_xml(&t1).unwrap().is_none());
        assert!(step.send_xml(&t2).unwrap().is_none());
    }

    #[test]
    fn closing_a_session_returns_its_claim() {
        let step = CustomerAdd::new(InMemoryPendingCustomers::new([NewCustomer::named("Ada")]));
        let t1 = AuthenticatedTicket::new("t1", "h");
        let t2 = AuthenticatedTicket::new("t2", "h");
        step.send_xml(&t1).unwrap();
        assert!(step.send_xml(&t2).unwrap().is_none());

        step.close("t1").unwrap();
        assert!(step.send_xml(&t2).unwrap().unwrap().contains("<Name>Ada</Name>"));
    }

    #[test]
    fn response_without_claim_is_a_step_failure() {
        let step = CustomerAdd::new(InMemoryPendingCustomers::new([NewCustomer::named("Ada")]));
        let t = AuthenticatedTicket::new("t", "h");
        assert!(matches!(step.receive_xml(&t, &added_response("Ada", "ID-1"), "", ""),
                         Err(WebConnectorError::StepFailure { .. })));
        assert_eq!(step.source().remaining().unwrap(), 1);
    }
}
