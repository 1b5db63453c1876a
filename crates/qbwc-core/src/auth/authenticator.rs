use crate::constants::{AUTH_BUSY, AUTH_INVALID_USER};
use crate::errors::WebConnectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Ok,
    InvalidCredentials,
    /// Hay otra sesión o el backend no puede atender ahora.
    AlreadyInUse,
}

/// Veredicto del autenticador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub status: AuthStatus,
    /// Company file a abrir; `None` o vacío = el que esté abierto en QB.
    pub company_file: Option<String>,
}

impl AuthDecision {
    pub fn ok(company_file: Option<String>) -> Self {
        Self { status: AuthStatus::Ok,
               company_file }
    }

    pub fn invalid() -> Self {
        Self { status: AuthStatus::InvalidCredentials,
               company_file: None }
    }

    pub fn busy() -> Self {
        Self { status: AuthStatus::AlreadyInUse,
               company_file: None }
    }
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Result<AuthDecision, WebConnectorError>;
}

/// Credenciales fijas leídas de configuración.
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    username: String,
    password: String,
    company_file: Option<String>,
}

impl StaticAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(),
               password: password.into(),
               company_file: None }
    }

    pub fn with_company_file(mut self, company_file: impl Into<String>) -> Self {
        let path = company_file.into();
        self.company_file = if path.is_empty() { None } else { Some(path) };
        self
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, username: &str, password: &str) -> Result<AuthDecision, WebConnectorError> {
        if username == self.username && password == self.password {
            Ok(AuthDecision::ok(self.company_file.clone()))
        } else {
            Ok(AuthDecision::invalid())
        }
    }
}

/// Resultado de `authenticate` tal como lo ve el driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateResult {
    pub ticket: String,
    pub company_file: Option<String>,
    pub status: AuthStatus,
}

impl AuthenticateResult {
    /// Par `[ticket, segundo]` que espera el Web Connector: el company file
    /// (vacío = el abierto), `nvu` o `busy`.
    pub fn wire_values(&self) -> [String; 2] {
        let second = match self.status {
            AuthStatus::Ok => self.company_file.clone().unwrap_or_default(),
            AuthStatus::InvalidCredentials => AUTH_INVALID_USER.to_string(),
            AuthStatus::AlreadyInUse => AUTH_BUSY.to_string(),
        };
        [self.ticket.clone(), second]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_authenticator_checks_both_fields() {
        let auth = StaticAuthenticator::new("user", "secret").with_company_file("C:\\co.qbw");
        let ok = auth.authenticate("user", "secret").unwrap();
        assert_eq!(ok.status, AuthStatus::Ok);
        assert_eq!(ok.company_file.as_deref(), Some("C:\\co.qbw"));
        assert_eq!(auth.authenticate("user", "nope").unwrap().status, AuthStatus::InvalidCredentials);
        assert_eq!(auth.authenticate("other", "secret").unwrap().status, AuthStatus::InvalidCredentials);
    }

    #[test]
    fn wire_values_map_status() {
        let mut r = AuthenticateResult { ticket: "t".into(),
                                         company_file: None,
                                         status: AuthStatus::Ok };
        assert_eq!(r.wire_values(), ["t".to_string(), String::new()]);
        r.status = AuthStatus::InvalidCredentials;
        assert_eq!(r.wire_values()[1], "nvu");
        r.status = AuthStatus::AlreadyInUse;
        assert_eq!(r.wire_values()[1], "busy");
    }
}
