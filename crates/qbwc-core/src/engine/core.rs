//! Implementación de `WebConnectorEngine`.

use std::cmp::Ordering;
use std::sync::Arc;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{AuthStatus, AuthenticateResult, Authenticator, MessageValidator, StaticAuthenticator,
                  WebConnectorHandler};
use crate::constants::{CLOSE_OK_MESSAGE, CONNECTION_ERROR_DONE, INVALID_TICKET_MESSAGE, PROGRESS_ABORT, PROGRESS_DONE,
                       VERSION_REJECTED_MESSAGE};
use crate::engine::locks::TicketLocks;
use crate::engine::version::compare_versions;
use crate::engine::{EngineBuilder, EngineConfig};
use crate::errors::{classify_error, WebConnectorError};
use crate::iterator::IteratorStore;
use crate::session::{AuthenticatedTicket, SessionState, TicketStore};
use crate::step::StepRegistry;

/// Driver de sesiones.
///
/// Inmutable tras `build`; se comparte entre hilos detrás de un `Arc`. Todo
/// el estado mutable vive en los stores y se toca bajo el lock del ticket.
pub struct WebConnectorEngine {
    pub(crate) authenticator: Box<dyn Authenticator>,
    pub(crate) validator: Box<dyn MessageValidator>,
    pub(crate) handler: Box<dyn WebConnectorHandler>,
    pub(crate) tickets: Arc<dyn TicketStore>,
    pub(crate) iterators: Arc<dyn IteratorStore>,
    pub(crate) registry: StepRegistry,
    pub(crate) config: EngineConfig,
    pub(crate) locks: TicketLocks,
}

impl std::fmt::Debug for WebConnectorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebConnectorEngine")
         .field("registry", &self.registry)
         .field("config", &self.config)
         .finish()
    }
}

impl WebConnectorEngine {
    #[inline]
    pub fn builder<A: Authenticator + 'static>(authenticator: A) -> EngineBuilder {
        EngineBuilder::new(authenticator)
    }

    /// Builder con credenciales fijas.
    pub fn with_credentials(username: &str, password: &str) -> EngineBuilder {
        EngineBuilder::new(StaticAuthenticator::new(username, password))
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ticket_store(&self) -> Arc<dyn TicketStore> {
        self.tickets.clone()
    }

    pub fn iterator_store(&self) -> Arc<dyn IteratorStore> {
        self.iterators.clone()
    }

    // ------------------------------------------------------------------
    // Métodos del protocolo
    // ------------------------------------------------------------------

    pub fn server_version(&self) -> String {
        self.config.server_version.clone()
    }

    /// `""` acepta; `W:` advierte; `E:` rechaza la versión del cliente.
    pub fn client_version(&self, version: &str) -> String {
        if let Some(min) = &self.config.min_client_version {
            if compare_versions(version, min) == Ordering::Less {
                info!("client version {version} rejected (minimum {min})");
                return format!("E:Web Connector {min} or later is required");
            }
        }
        if let Some(recommended) = &self.config.recommended_client_version {
            if compare_versions(version, recommended) == Ordering::Less {
                return format!("W:Web Connector {recommended} or later is recommended");
            }
        }
        String::new()
    }

    /// Autentica y, si procede, crea el registro del ticket con
    /// `current_step = 0`.
    ///
    /// Siempre devuelve un ticket: el cliente lo exige incluso cuando las
    /// credenciales fallan. Ese ticket no se persiste.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthenticateResult {
        let ticket = Uuid::new_v4().to_string();
        let decision = match self.authenticator.authenticate(username, password) {
            Ok(d) => d,
            Err(e) => {
                warn!("authenticator failed for user '{username}': {e}");
                return AuthenticateResult { ticket,
                                            company_file: None,
                                            status: AuthStatus::AlreadyInUse };
            }
        };
        match decision.status {
            AuthStatus::Ok => {
                let record = AuthenticatedTicket::new(ticket.clone(), self.registry.registry_hash());
                if let Err(e) = self.tickets.insert(&record) {
                    warn!("could not persist ticket {ticket}: {e}");
                    return AuthenticateResult { ticket,
                                                company_file: None,
                                                status: AuthStatus::AlreadyInUse };
                }
                info!("authenticated user '{username}' ticket={ticket}");
                self.handler.on_authenticated(&ticket, username);
                AuthenticateResult { ticket,
                                     company_file: decision.company_file,
                                     status: AuthStatus::Ok }
            }
            status => {
                let err = WebConnectorError::AuthenticationFailure(username.to_string());
                info!("{err} ({status:?})");
                self.handler.on_exception(&ticket, &err);
                AuthenticateResult { ticket,
                                     company_file: None,
                                     status }
            }
        }
    }

    /// Primera fase de la validación de versión. Un rechazo es terminal:
    /// `is_valid_ticket` devolverá `false` desde ese momento.
    pub fn validate_message(&self, ticket: &str, company_file: &str, country: &str, major: u32, minor: u32) -> bool {
        self.with_ticket(ticket, |t| Ok(self.validate_locked(t, company_file, country, major, minor)))
            .unwrap_or(false)
    }

    /// Segunda fase: el cliente no reenvía versión en llamadas posteriores,
    /// así que el resultado de la primera queda en el registro.
    pub fn is_valid_ticket(&self, ticket: &str) -> bool {
        match self.tickets.load(ticket) {
            Ok(Some(t)) => {
                t.is_authenticated
                && t.version_valid
                && t.state != SessionState::Closed
                && t.registry_hash == self.registry.registry_hash()
            }
            Ok(None) => false,
            Err(e) => {
                warn!("ticket store failed loading {ticket}: {e}");
                false
            }
        }
    }

    /// Devuelve el request del step actual, saltando los steps que no
    /// tienen nada que enviar. `""` = sin trabajo (o sesión inválida).
    pub fn send_request_xml(&self,
                            ticket: &str,
                            _hcp_response: &str,
                            company_file: &str,
                            country: &str,
                            major: u32,
                            minor: u32)
                            -> String {
        let result = self.with_ticket(ticket, |t| {
                             if t.state == SessionState::Validating
                                && !self.validate_locked(t, company_file, country, major, minor)
                             {
                                 return Ok(String::new());
                             }
                             if !t.version_valid {
                                 return Ok(String::new());
                             }
                             self.next_request(t)
                         });
        match result {
            Ok(xml) => xml,
            Err(e) => {
                warn!("sendRequestXML failed for ticket {ticket}: {e}");
                String::new()
            }
        }
    }

    /// Entrega la respuesta al step que produjo el último request.
    ///
    /// Devuelve el progreso de la sesión (100 = no queda trabajo) o `-1`
    /// si la llamada falló; en ese caso el registro queda como estaba y el
    /// motivo está disponible en `getLastError`.
    pub fn receive_response_xml(&self, ticket: &str, response: &str, hresult: &str, message: &str) -> i32 {
        let result = self.with_ticket_settled(ticket,
                                              |t| {
                                                  if !t.version_valid {
                                                      return Err(WebConnectorError::VersionIncompatible(t.ticket.clone()));
                                                  }
                                                  self.consume_response(t, response, hresult, message)
                                              },
                                              |&(_, index), saved| self.settle_step(ticket, index, saved));
        match result {
            Ok((progress, _)) => progress,
            Err(e) => {
                warn!("receiveResponseXML failed for ticket {ticket}: {e}");
                PROGRESS_ABORT
            }
        }
    }

    /// Registra el error de conexión del cliente y da la sesión por
    /// terminada.
    ///
    /// Siempre responde `"done"`: nunca se pide al cliente que reintente con
    /// otro company file (la alternativa `""` del protocolo no se usa).
    pub fn connection_error(&self, ticket: &str, hresult: &str, message: &str) -> String {
        let recorded = self.with_ticket(ticket, |t| {
                               t.last_error = Some(format!("{hresult}: {message}"));
                               Ok(())
                           });
        if let Err(e) = recorded {
            debug!("connectionError for ticket {ticket} not recorded: {e}");
        }
        info!("connection error on ticket {ticket}: {hresult} {message}");
        CONNECTION_ERROR_DONE.to_string()
    }

    pub fn get_last_error(&self, ticket: &str) -> String {
        let lock = self.locks.acquire(ticket);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match self.tickets.load(ticket) {
            Ok(Some(t)) if !t.version_valid => VERSION_REJECTED_MESSAGE.to_string(),
            Ok(Some(t)) => t.last_error.unwrap_or_default(),
            Ok(None) => {
                self.locks.release(ticket);
                INVALID_TICKET_MESSAGE.to_string()
            }
            Err(e) => e.to_string(),
        }
    }

    /// Cierra la sesión y libera el ticket y sus cursores.
    pub fn close_connection(&self, ticket: &str) -> String {
        let lock = self.locks.acquire(ticket);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let record = match self.tickets.load(ticket) {
            Ok(Some(t)) if t.state != SessionState::Closed => t,
            Ok(_) => {
                self.locks.release(ticket);
                return INVALID_TICKET_MESSAGE.to_string();
            }
            Err(e) => {
                warn!("closeConnection could not load ticket {ticket}: {e}");
                return e.to_string();
            }
        };
        if let Err(e) = self.release_session(&record) {
            warn!("closeConnection could not release ticket {ticket}: {e}");
            // Sin poder borrar, al menos dejarlo cerrado.
            let mut closed = record;
            closed.state = SessionState::Closed;
            closed.touch();
            if let Err(e) = self.tickets.save(&closed) {
                warn!("closeConnection could not mark ticket {ticket} closed: {e}");
            }
        }
        self.handler.on_close(ticket);
        self.locks.release(ticket);
        info!("closed ticket {ticket}");
        CLOSE_OK_MESSAGE.to_string()
    }

    /// Copia del registro del ticket, para inspección.
    pub fn session(&self, ticket: &str) -> Result<Option<AuthenticatedTicket>, WebConnectorError> {
        self.tickets.load(ticket)
    }

    // ------------------------------------------------------------------
    // Internos
    // ------------------------------------------------------------------

    /// Ejecuta `f` sobre una copia del registro bajo el lock del ticket.
    /// `Ok` persiste la copia; `Err` persiste el original con `last_error`.
    fn with_ticket<T, F>(&self, ticket: &str, f: F) -> Result<T, WebConnectorError>
        where F: FnOnce(&mut AuthenticatedTicket) -> Result<T, WebConnectorError>
    {
        self.with_ticket_settled(ticket, f, |_, _| Ok(()))
    }

    /// Como `with_ticket`, con `settle(&valor, guardado)` para las escrituras
    /// que dependen del registro: se llama con `true` después de persistir la
    /// copia y con `false` si no se pudo. Si `settle` falla tras guardar, el
    /// registro vuelve al original.
    fn with_ticket_settled<T, F, S>(&self, ticket: &str, f: F, settle: S) -> Result<T, WebConnectorError>
        where F: FnOnce(&mut AuthenticatedTicket) -> Result<T, WebConnectorError>,
              S: FnOnce(&T, bool) -> Result<(), WebConnectorError>
    {
        let lock = self.locks.acquire(ticket);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let original = match self.tickets.load(ticket)? {
            Some(t) if t.state != SessionState::Closed => t,
            _ => {
                self.locks.release(ticket);
                return Err(WebConnectorError::UnknownTicket(ticket.to_string()));
            }
        };
        if original.registry_hash != self.registry.registry_hash() {
            return Err(WebConnectorError::RegistryMismatch(ticket.to_string()));
        }

        let mut working = original.clone();
        let value = match f(&mut working) {
            Ok(value) => value,
            Err(e) => {
                self.record_failure(original, &e);
                return Err(e);
            }
        };
        working.touch();
        if let Err(e) = self.tickets.save(&working) {
            // El original sigue en el store; sólo se descarta lo preparado.
            let _ = settle(&value, false);
            self.record_failure(original, &e);
            return Err(e);
        }
        if let Err(e) = settle(&value, true) {
            self.record_failure(original, &e);
            return Err(e);
        }
        Ok(value)
    }

    /// Persiste `original` con `last_error` y avisa al handler.
    fn record_failure(&self, original: AuthenticatedTicket, e: &WebConnectorError) {
        warn!("ticket {} call failed ({:?}): {e}", original.ticket, classify_error(e));
        self.handler.on_exception(&original.ticket, e);
        let mut failed = original;
        failed.last_error = Some(e.to_string());
        failed.touch();
        if let Err(save_err) = self.tickets.save(&failed) {
            warn!("could not record last error for ticket {}: {save_err}", failed.ticket);
        }
    }

    /// `commit` o `discard` sobre el step que consumió la respuesta.
    fn settle_step(&self, ticket: &str, index: usize, saved: bool) -> Result<(), WebConnectorError> {
        let step = self.registry
                       .get(index)
                       .ok_or_else(|| WebConnectorError::Internal(format!("step index {index} out of range")))?;
        if saved {
            step.commit(ticket)
        } else {
            step.discard(ticket);
            Ok(())
        }
    }

    fn validate_locked(&self, t: &mut AuthenticatedTicket, company_file: &str, country: &str, major: u32, minor: u32) -> bool {
        if !t.version_valid {
            return false;
        }
        if t.state != SessionState::Validating {
            return true;
        }
        self.handler
            .process_client_information(&t.ticket, company_file, country, major, minor);
        if self.validator
               .validate_message(&t.ticket, company_file, country, major, minor)
        {
            t.state = SessionState::Running;
            debug!("ticket {} validated: country={country} qbxml={major}.{minor}", t.ticket);
            true
        } else {
            t.mark_version_invalid(self.registry.len());
            t.last_error = Some(VERSION_REJECTED_MESSAGE.to_string());
            self.handler.on_version_rejected(&t.ticket);
            info!("ticket {} rejected: company_file='{company_file}' country={country} qbxml={major}.{minor}",
                  t.ticket);
            false
        }
    }

    fn next_request(&self, t: &mut AuthenticatedTicket) -> Result<String, WebConnectorError> {
        let n = self.registry.len();
        while !t.is_exhausted(n) {
            let step = self.registry
                           .get(t.current_step)
                           .ok_or_else(|| WebConnectorError::Internal(format!("step index {} out of range", t.current_step)))?;
            match step.send_xml(t)? {
                Some(xml) if !xml.is_empty() => {
                    debug!("ticket {} step {} ({}) sent request", t.ticket, t.current_step, step.name());
                    t.pending_step = Some(step.name().to_string());
                    return Ok(xml);
                }
                _ => {
                    debug!("ticket {} step {} ({}) has nothing to send", t.ticket, t.current_step, step.name());
                    t.advance(n);
                }
            }
        }
        debug!("ticket {} has no more work", t.ticket);
        Ok(String::new())
    }

    fn consume_response(&self,
                        t: &mut AuthenticatedTicket,
                        response: &str,
                        hresult: &str,
                        message: &str)
                        -> Result<(i32, usize), WebConnectorError> {
        let n = self.registry.len();
        let pending = t.pending_step
                       .clone()
                       .ok_or_else(|| WebConnectorError::NoPendingRequest(t.ticket.clone()))?;
        let index = self.registry
                        .position(&pending)
                        .ok_or_else(|| WebConnectorError::RegistryMismatch(t.ticket.clone()))?;
        if index != t.current_step {
            return Err(WebConnectorError::Internal(format!("pending step {pending} is not the current step {}",
                                                           t.current_step)));
        }
        let step = self.registry
                       .get(index)
                       .ok_or_else(|| WebConnectorError::Internal(format!("step index {index} out of range")))?;

        let step_progress = match step.receive_xml(t, response, hresult, message) {
            Ok(p) => p.clamp(0, PROGRESS_DONE),
            Err(e) => {
                step.discard(&t.ticket);
                return Err(e);
            }
        };
        t.last_error = None;
        if step_progress >= PROGRESS_DONE {
            t.advance(n);
            info!("ticket {} retired step {pending} ({}/{n})", t.ticket, t.current_step);
            if !t.is_exhausted(n) {
                return Ok((session_progress(t.current_step, 0, n), index));
            }
        } else {
            t.pending_step = None;
        }
        Ok((session_progress(t.current_step, step_progress, n), index))
    }

    fn release_session(&self, t: &AuthenticatedTicket) -> Result<(), WebConnectorError> {
        for index in 0..self.registry.len() {
            if let Some(step) = self.registry.get(index) {
                step.close(&t.ticket)?;
            }
        }
        self.iterators.remove_ticket(&t.ticket)?;
        self.tickets.remove(&t.ticket)
    }
}

/// Progreso de la sesión: 100 sólo con todos los steps retirados.
fn session_progress(completed: usize, step_progress: i32, step_count: usize) -> i32 {
    if step_count == 0 || completed >= step_count {
        return PROGRESS_DONE;
    }
    let raw = (completed as i64 * 100 + i64::from(step_progress)) / step_count as i64;
    raw.clamp(0, 99) as i32
}
