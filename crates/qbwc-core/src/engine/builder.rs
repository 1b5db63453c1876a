//! Builder para `WebConnectorEngine`.
//!
//! Sólo el autenticador es obligatorio; el resto tiene valores por defecto
//! (validador que acepta todo, handler vacío, stores en memoria).
//!
//! ```ignore
//! let builder = WebConnectorEngine::builder(StaticAuthenticator::new("user", "pw"));
//! let cursors = builder.iterator_store();
//! let engine = builder.add_step(IteratorStep::new(CustomerQuery::new(sink), cursors))
//!                     .add_step_with_options(CustomerAdd::new(queue), json!({"on_error": "continueOnError"}))
//!                     .build()?;
//! ```
//!
//! El store de iteradores se fija antes de añadir steps: los
//! `IteratorStep` reciben el mismo `Arc` que el driver usa para limpiar los
//! cursores al cerrar la sesión.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::auth::{AcceptAllValidator, Authenticator, MessageValidator, NoopHandler, WebConnectorHandler};
use crate::engine::locks::TicketLocks;
use crate::engine::{EngineConfig, WebConnectorEngine};
use crate::errors::WebConnectorError;
use crate::iterator::{InMemoryIteratorStore, IteratorStore};
use crate::session::{InMemoryTicketStore, TicketStore};
use crate::step::{Step, StepRegistry};

pub struct EngineBuilder {
    authenticator: Box<dyn Authenticator>,
    validator: Box<dyn MessageValidator>,
    handler: Box<dyn WebConnectorHandler>,
    tickets: Arc<dyn TicketStore>,
    iterators: Arc<dyn IteratorStore>,
    config: EngineConfig,
    /// Steps en orden de registro con sus overrides de opciones.
    steps: Vec<(Box<dyn Step>, Value)>,
}

impl EngineBuilder {
    pub fn new<A: Authenticator + 'static>(authenticator: A) -> Self {
        Self { authenticator: Box::new(authenticator),
               validator: Box::new(AcceptAllValidator),
               handler: Box::new(NoopHandler),
               tickets: Arc::new(InMemoryTicketStore::new()),
               iterators: Arc::new(InMemoryIteratorStore::new()),
               config: EngineConfig::default(),
               steps: Vec::new() }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_validator<V: MessageValidator + 'static>(mut self, validator: V) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_handler<H: WebConnectorHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Box::new(handler);
        self
    }

    pub fn with_ticket_store(mut self, store: Arc<dyn TicketStore>) -> Self {
        self.tickets = store;
        self
    }

    pub fn with_iterator_store(mut self, store: Arc<dyn IteratorStore>) -> Self {
        self.iterators = store;
        self
    }

    /// Store de cursores que compartirán el driver y los `IteratorStep`.
    pub fn iterator_store(&self) -> Arc<dyn IteratorStore> {
        self.iterators.clone()
    }

    pub fn add_step<S: Step + 'static>(self, step: S) -> Self {
        self.add_step_with_options(step, json!({}))
    }

    /// Añade un step con overrides sobre `EngineConfig::default_options`.
    pub fn add_step_with_options<S: Step + 'static>(mut self, step: S, overrides: Value) -> Self {
        self.steps.push((Box::new(step), overrides));
        self
    }

    pub fn add_boxed_step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push((step, json!({})));
        self
    }

    /// Fija las opciones de cada step y congela el registro.
    ///
    /// Errores: `DuplicateStep` si dos steps comparten nombre; `Internal`
    /// si los overrides no encajan en `ResponseOptions`.
    pub fn build(self) -> Result<WebConnectorEngine, WebConnectorError> {
        let mut steps: Vec<Box<dyn Step>> = Vec::with_capacity(self.steps.len());
        for (mut step, overrides) in self.steps {
            let options = self.config.default_options.merged(&overrides)?;
            step.set_options(options);
            steps.push(step);
        }
        let registry = StepRegistry::new(steps)?;
        log::info!("web connector engine ready: steps={:?} registry_hash={}",
                   registry.names(),
                   registry.registry_hash());
        Ok(WebConnectorEngine { authenticator: self.authenticator,
                                validator: self.validator,
                                handler: self.handler,
                                tickets: self.tickets,
                                iterators: self.iterators,
                                registry,
                                config: self.config,
                                locks: TicketLocks::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuthenticator;
    use crate::step::FnStep;

    fn noop(name: &str) -> FnStep {
        FnStep::new(name, |_, _| Ok(None), |_, _, _| Ok(100))
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = EngineBuilder::new(StaticAuthenticator::new("u", "p")).add_step(noop("a"))
                                                                          .add_step(noop("a"))
                                                                          .build()
                                                                          .unwrap_err();
        assert_eq!(err, WebConnectorError::DuplicateStep("a".into()));
    }

    #[test]
    fn per_step_overrides_are_applied_over_defaults() {
        let captured = Arc::new(std::sync::Mutex::new(None));
        let sink = captured.clone();
        let step = FnStep::new("probe",
                               move |_, options| {
                                   *sink.lock().unwrap() = Some(options.max_returned);
                                   Ok(None)
                               },
                               |_, _, _| Ok(100));
        let engine = EngineBuilder::new(StaticAuthenticator::new("u", "p")).add_step_with_options(step,
                                                                                                  json!({"max_returned": 7}))
                                                                           .build()
                                                                           .unwrap();
        let auth = engine.authenticate("u", "p");
        assert_eq!(engine.send_request_xml(&auth.ticket, "", "", "US", 13, 0), "");
        assert_eq!(*captured.lock().unwrap(), Some(7));
    }
}
