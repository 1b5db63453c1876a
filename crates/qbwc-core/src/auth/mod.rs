//! Autenticación y validación del cliente.
//!
//! - `Authenticator`: decide sobre usuario/contraseña y el company file.
//! - `MessageValidator`: primera fase de la validación de versión.
//! - `WebConnectorHandler`: hooks de aplicación sobre el ciclo de vida.

mod authenticator;
mod handler;
mod validator;

pub use authenticator::{AuthDecision, AuthStatus, AuthenticateResult, Authenticator, StaticAuthenticator};
pub use handler::{NoopHandler, WebConnectorHandler};
pub use validator::{AcceptAllValidator, MessageValidator, VersionValidator};
