use crate::errors::WebConnectorError;
use crate::session::AuthenticatedTicket;
use crate::step::definition::check_hresult;
use crate::step::{ResponseOptions, Step};

type SendFn = dyn Fn(&AuthenticatedTicket, &ResponseOptions) -> Result<Option<String>, WebConnectorError> + Send + Sync;
type ReceiveFn = dyn Fn(&AuthenticatedTicket, &str, &ResponseOptions) -> Result<i32, WebConnectorError> + Send + Sync;

/// Step armado con dos funciones: producir request y consumir respuesta.
pub struct FnStep {
    name: String,
    options: ResponseOptions,
    send: Box<SendFn>,
    receive: Box<ReceiveFn>,
}

impl FnStep {
    pub fn new<S, R>(name: impl Into<String>, send: S, receive: R) -> Self
        where S: Fn(&AuthenticatedTicket, &ResponseOptions) -> Result<Option<String>, WebConnectorError>
                  + Send
                  + Sync
                  + 'static,
              R: Fn(&AuthenticatedTicket, &str, &ResponseOptions) -> Result<i32, WebConnectorError>
                  + Send
                  + Sync
                  + 'static
    {
        Self { name: name.into(),
               options: ResponseOptions::default(),
               send: Box::new(send),
               receive: Box::new(receive) }
    }

    pub fn options(&self) -> &ResponseOptions {
        &self.options
    }
}

impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_options(&mut self, options: ResponseOptions) {
        self.options = options;
    }

    fn send_xml(&self, ticket: &AuthenticatedTicket) -> Result<Option<String>, WebConnectorError> {
        (self.send)(ticket, &self.options)
    }

    fn receive_xml(&self,
                   ticket: &AuthenticatedTicket,
                   response: &str,
                   hresult: &str,
                   message: &str)
                   -> Result<i32, WebConnectorError> {
        check_hresult(hresult, message)?;
        (self.receive)(ticket, response, &self.options)
    }
}

impl std::fmt::Debug for FnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}
