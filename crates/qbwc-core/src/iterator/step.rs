use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use log::{debug, warn};

use super::{IteratorState, IteratorStatus, IteratorStore};
use crate::constants::PROGRESS_DONE;
use crate::errors::WebConnectorError;
use crate::qbxml::{build_request, parse_response, IteratorRequest, QbXmlRequest, QbXmlResponse};
use crate::session::AuthenticatedTicket;
use crate::step::definition::check_hresult;
use crate::step::{ResponseOptions, Step};

/// Parte específica de una query paginada: qué mensaje pedir, con qué
/// filtros, y qué hacer con cada página.
pub trait IteratorQuery: Send + Sync {
    /// Nombre del step (clave del cursor).
    fn name(&self) -> &str;

    /// Mensaje qbXML sin sufijo, p. ej. `CustomerQuery`.
    fn message(&self) -> &str;

    /// Filtros adicionales que van tras `MaxReturned`.
    fn request_body(&self, _ticket: &AuthenticatedTicket, _options: &ResponseOptions) -> Result<String, WebConnectorError> {
        Ok(String::new())
    }

    /// Efectos de una página (persistir registros, etc.). Un error aquí deja
    /// el cursor intacto: la misma página se puede volver a procesar.
    fn consume_page(&self, ticket: &AuthenticatedTicket, page: &QbXmlResponse) -> Result<(), WebConnectorError>;
}

/// Escritura de cursor pendiente de `commit`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorWrite {
    Save(IteratorState),
    Remove,
}

/// Step con protocolo de iterador sobre una `IteratorQuery`.
///
/// `receive_xml` no toca el store: deja la escritura del cursor preparada
/// por ticket y el driver la aplica con `commit` tras guardar el ticket.
pub struct IteratorStep<Q: IteratorQuery> {
    query: Q,
    store: Arc<dyn IteratorStore>,
    options: ResponseOptions,
    staged: DashMap<String, CursorWrite>,
}

impl<Q: IteratorQuery> IteratorStep<Q> {
    pub fn new(query: Q, store: Arc<dyn IteratorStore>) -> Self {
        Self { query,
               store,
               options: ResponseOptions::default(),
               staged: DashMap::new() }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn options(&self) -> &ResponseOptions {
        &self.options
    }

    fn response_tag(&self) -> String {
        format!("{}Rs", self.query.message())
    }
}

/// Progreso de una página que deja el iterador abierto. Siempre en
/// `last..=99`.
///
/// Con `remaining` conocido: `floor(100 * consumed / (consumed + remaining))`.
/// Sin él: la mitad de la distancia que falta hasta 99.
pub fn page_progress(last: i32, consumed: u32, remaining: Option<u32>) -> i32 {
    let last = last.clamp(0, 99);
    let raw = match remaining {
        Some(r) => {
            let total = u64::from(consumed) + u64::from(r);
            if total == 0 {
                0
            } else {
                (u64::from(consumed) * 100 / total) as i32
            }
        }
        None => last + (99 - last) / 2,
    };
    raw.max(last).min(99)
}

impl<Q: IteratorQuery> Step for IteratorStep<Q> {
    fn name(&self) -> &str {
        self.query.name()
    }

    fn set_options(&mut self, options: ResponseOptions) {
        self.options = options;
    }

    fn send_xml(&self, ticket: &AuthenticatedTicket) -> Result<Option<String>, WebConnectorError> {
        let iterator = match self.store.load(&ticket.ticket, self.name())? {
            Some(state) => match state.continuation() {
                Some(key) => IteratorRequest::Continue(key.to_string()),
                None => IteratorRequest::Start,
            },
            None => {
                self.store.save(&IteratorState::not_started(&ticket.ticket, self.name()))?;
                IteratorRequest::Start
            }
        };
        debug!("iterator send ticket={} step={} mode={:?}", ticket.ticket, self.name(), iterator);
        let body = self.query.request_body(ticket, &self.options)?;
        let request = QbXmlRequest::new(self.query.message()).with_iterator(iterator, self.options.max_returned)
                                                             .with_body(&body);
        Ok(Some(build_request(&request, &self.options)))
    }

    fn receive_xml(&self,
                   ticket: &AuthenticatedTicket,
                   response: &str,
                   hresult: &str,
                   message: &str)
                   -> Result<i32, WebConnectorError> {
        check_hresult(hresult, message)?;
        // Nada se escribe en el store hasta que la página está parseada y
        // consumida.
        let page = parse_response(response, &self.response_tag())?;
        page.ensure_success()?;

        let previous = self.store
                           .load(&ticket.ticket, self.name())?
                           .unwrap_or_else(|| IteratorState::not_started(&ticket.ticket, self.name()));

        self.query.consume_page(ticket, &page).map_err(|e| match e {
                                                   WebConnectorError::StepFailure { .. } => e,
                                                   other => WebConnectorError::StepFailure { step: self.name().to_string(),
                                                                                             reason: other.to_string() },
                                               })?;

        let consumed = previous.consumed.saturating_add(page.records.len() as u32);
        match (&page.iterator_id, page.iterator_remaining_count) {
            (Some(key), remaining) if remaining != Some(0) => {
                if previous.continuation() == Some(key.as_str()) && page.records.is_empty() {
                    warn!("iterator {} returned an empty page with an unchanged key", self.name());
                }
                let progress = page_progress(previous.last_progress, consumed, remaining);
                let next = IteratorState { key: Some(key.clone()),
                                           status: IteratorStatus::InProgress,
                                           consumed,
                                           last_progress: progress,
                                           updated_at: Utc::now(),
                                           ..previous };
                self.staged.insert(ticket.ticket.clone(), CursorWrite::Save(next));
                debug!("iterator page ticket={} step={} consumed={} remaining={:?} progress={}",
                       ticket.ticket,
                       self.name(),
                       consumed,
                       remaining,
                       progress);
                Ok(progress)
            }
            _ => {
                self.staged.insert(ticket.ticket.clone(), CursorWrite::Remove);
                debug!("iterator done ticket={} step={} consumed={}", ticket.ticket, self.name(), consumed);
                Ok(PROGRESS_DONE)
            }
        }
    }

    fn commit(&self, ticket: &str) -> Result<(), WebConnectorError> {
        match self.staged.remove(ticket) {
            Some((_, CursorWrite::Save(state))) => self.store.save(&state),
            Some((_, CursorWrite::Remove)) => self.store.remove(ticket, self.name()),
            None => Ok(()),
        }
    }

    fn discard(&self, ticket: &str) {
        self.staged.remove(ticket);
    }

    fn close(&self, ticket: &str) -> Result<(), WebConnectorError> {
        self.staged.remove(ticket);
        self.store.remove(ticket, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::InMemoryIteratorStore;
    use crate::qbxml::QbXmlRecord;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CustomerQuery {
        seen: Mutex<Vec<QbXmlRecord>>,
        fail: bool,
    }

    impl IteratorQuery for CustomerQuery {
        fn name(&self) -> &str {
            "CustomerQuery"
        }
        fn message(&self) -> &str {
            "CustomerQuery"
        }
        fn consume_page(&self, _ticket: &AuthenticatedTicket, page: &QbXmlResponse) -> Result<(), WebConnectorError> {
            if self.fail {
                return Err(WebConnectorError::Store("sink offline".into()));
            }
            self.seen.lock().unwrap().extend(page.records.iter().cloned());
            Ok(())
        }
    }

    fn setup(fail: bool) -> (IteratorStep<CustomerQuery>, Arc<InMemoryIteratorStore>, AuthenticatedTicket) {
        let store = Arc::new(InMemoryIteratorStore::new());
        let step = IteratorStep::new(CustomerQuery { fail, ..Default::default() }, store.clone());
        (step, store, AuthenticatedTicket::new(uuid::Uuid::new_v4().to_string(), "h"))
    }

    /// `receive_xml` seguido de `commit`, como hace el driver.
    fn receive(step: &IteratorStep<CustomerQuery>, ticket: &AuthenticatedTicket, xml: &str) -> Result<i32, WebConnectorError> {
        let progress = step.receive_xml(ticket, xml, "", "")?;
        step.commit(&ticket.ticket)?;
        Ok(progress)
    }

    fn page(key: Option<&str>, remaining: Option<u32>, rows: usize) -> String {
        let mut attrs = String::new();
        if let Some(k) = key {
            attrs.push_str(&format!(" iteratorID=\"{k}\""));
        }
        if let Some(r) = remaining {
            attrs.push_str(&format!(" iteratorRemainingCount=\"{r}\""));
        }
        let body: String = (0..rows).map(|i| format!("<CustomerRet><ListID>{i}</ListID></CustomerRet>")).collect();
        format!("<?xml version=\"1.0\" ?><QBXML><QBXMLMsgsRs><CustomerQueryRs requestID=\"1\" statusCode=\"0\" statusSeverity=\"Info\" statusMessage=\"Status OK\"{attrs}>{body}</CustomerQueryRs></QBXMLMsgsRs></QBXML>")
    }

    #[test]
    fn first_request_starts_iterator_with_default_page_size() {
        let (step, store, ticket) = setup(false);
        let xml = step.send_xml(&ticket).unwrap().expect("request");
        assert!(xml.contains("<CustomerQueryRq requestID=\"1\" iterator=\"Start\">"));
        assert!(xml.contains("<MaxReturned>100</MaxReturned>"));
        let state = store.load(&ticket.ticket, "CustomerQuery").unwrap().expect("lazy state");
        assert_eq!(state.status, IteratorStatus::NotStarted);
    }

    #[test]
    fn stored_key_produces_continue_request() {
        let (step, store, ticket) = setup(false);
        let mut state = IteratorState::not_started(&ticket.ticket, "CustomerQuery");
        state.status = IteratorStatus::InProgress;
        state.key = Some("123456".into());
        store.save(&state).unwrap();

        let xml = step.send_xml(&ticket).unwrap().unwrap();
        assert!(xml.contains("iterator=\"Continue\" iteratorID=\"123456\""));
    }

    #[test]
    fn response_without_iterator_completes_step() {
        let (step, store, ticket) = setup(false);
        step.send_xml(&ticket).unwrap();
        assert_eq!(receive(&step, &ticket, &page(None, None, 1)).unwrap(), 100);
        assert!(store.load(&ticket.ticket, "CustomerQuery").unwrap().is_none());
        assert_eq!(step.query().seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn response_with_iterator_stores_key_and_reports_partial_progress() {
        let (step, store, ticket) = setup(false);
        let progress = receive(&step, &ticket, &page(Some("{eb05}"), Some(18), 2)).unwrap();
        assert_eq!(progress, 10);
        let state = store.load(&ticket.ticket, "CustomerQuery").unwrap().unwrap();
        assert_eq!(state.status, IteratorStatus::InProgress);
        assert_eq!(state.key.as_deref(), Some("{eb05}"));
        assert_eq!(state.consumed, 2);
    }

    #[test]
    fn remaining_zero_closes_iterator_even_with_key() {
        let (step, store, ticket) = setup(false);
        assert_eq!(receive(&step, &ticket, &page(Some("K"), Some(0), 3)).unwrap(), 100);
        assert!(store.is_empty());
    }

    #[test]
    fn empty_result_without_iterator_is_done_not_error() {
        let (step, _store, ticket) = setup(false);
        let xml = "<QBXML><QBXMLMsgsRs><CustomerQueryRs requestID=\"1\" statusCode=\"1\" statusSeverity=\"Info\" statusMessage=\"no match\"/></QBXMLMsgsRs></QBXML>";
        assert_eq!(step.receive_xml(&ticket, xml, "", "").unwrap(), 100);
    }

    #[test]
    fn malformed_payload_leaves_cursor_untouched() {
        let (step, store, ticket) = setup(false);
        receive(&step, &ticket, &page(Some("K1"), Some(4), 2)).unwrap();
        let before = store.load(&ticket.ticket, "CustomerQuery").unwrap();

        let err = receive(&step, &ticket, "<QBXML><CustomerQueryRs").unwrap_err();
        assert!(matches!(err, WebConnectorError::MalformedResponse(_)));
        assert_eq!(store.load(&ticket.ticket, "CustomerQuery").unwrap(), before);
    }

    #[test]
    fn collaborator_failure_is_a_step_failure_and_keeps_cursor() {
        let (step, store, ticket) = setup(true);
        let err = receive(&step, &ticket, &page(Some("K1"), Some(4), 2)).unwrap_err();
        assert!(matches!(err, WebConnectorError::StepFailure { .. }));
        assert!(store.load(&ticket.ticket, "CustomerQuery").unwrap().is_none());
    }

    #[test]
    fn cursor_moves_only_on_commit() {
        let (step, store, ticket) = setup(false);
        step.send_xml(&ticket).unwrap();
        assert_eq!(step.receive_xml(&ticket, &page(Some("K1"), Some(3), 2), "", "").unwrap(), 40);
        let untouched = store.load(&ticket.ticket, "CustomerQuery").unwrap().unwrap();
        assert_eq!(untouched.status, IteratorStatus::NotStarted);
        assert_eq!(untouched.consumed, 0);

        // Llamada descartada: el reintento cuenta la página una sola vez.
        step.discard(&ticket.ticket);
        assert_eq!(receive(&step, &ticket, &page(Some("K1"), Some(3), 2)).unwrap(), 40);
        let state = store.load(&ticket.ticket, "CustomerQuery").unwrap().unwrap();
        assert_eq!(state.consumed, 2);
        assert_eq!(state.key.as_deref(), Some("K1"));
    }

    #[test]
    fn close_drops_cursor_and_staged_write() {
        let (step, store, ticket) = setup(false);
        receive(&step, &ticket, &page(Some("K1"), Some(3), 2)).unwrap();
        step.receive_xml(&ticket, &page(Some("K1"), Some(1), 2), "", "").unwrap();
        step.close(&ticket.ticket).unwrap();
        step.commit(&ticket.ticket).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn hresult_is_reported_as_transport_error() {
        let (step, _store, ticket) = setup(false);
        let err = step.receive_xml(&ticket, "", "0x80040400", "QuickBooks found an error").unwrap_err();
        assert!(matches!(err, WebConnectorError::Transport { .. }));
    }

    #[test]
    fn unknown_remaining_count_moves_towards_99() {
        assert_eq!(page_progress(0, 10, None), 49);
        assert_eq!(page_progress(49, 20, None), 74);
        assert_eq!(page_progress(98, 30, None), 98);
        assert!(page_progress(99, 40, None) < 100);
    }

    #[test]
    fn known_remaining_count_is_floor_and_monotonic() {
        assert_eq!(page_progress(0, 2, Some(3)), 40);
        assert_eq!(page_progress(40, 4, Some(1)), 80);
        assert_eq!(page_progress(80, 4, Some(100)), 80);
        assert_eq!(page_progress(0, 0, Some(0)), 0);
    }
}
