//! Registro `AuthenticatedTicket`.
//!
//! Rol en el flujo:
//! - Lo crea `authenticate` con `current_step = 0` y estado `Validating`.
//! - Sólo el driver lo muta, entre llamadas y bajo el lock del ticket.
//! - Invariante: `0 <= current_step <= step_count`; `current_step ==
//!   step_count` significa "no queda trabajo".
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fases de la sesión vistas desde el servidor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Autenticado; la primera llamada de contenido debe validar la versión.
    Validating,
    /// Validado; cada `sendRequestXML` ejecuta el step actual.
    Running,
    /// `closeConnection` recibido; el registro está por liberarse.
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Validating => "validating",
            SessionState::Running => "running",
            SessionState::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "validating" => Some(SessionState::Validating),
            "running" => Some(SessionState::Running),
            "closed" => Some(SessionState::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedTicket {
    pub ticket: String,
    pub current_step: usize,
    pub is_authenticated: bool,
    pub state: SessionState,
    /// Flag terminal de la validación en dos fases: una vez en `false` no
    /// vuelve a `true`.
    pub version_valid: bool,
    /// Step que produjo el último request aún sin respuesta.
    pub pending_step: Option<String>,
    pub last_error: Option<String>,
    /// Hash del registro de steps con el que se emitió el ticket.
    pub registry_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthenticatedTicket {
    pub fn new(ticket: impl Into<String>, registry_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { ticket: ticket.into(),
               current_step: 0,
               is_authenticated: true,
               state: SessionState::Validating,
               version_valid: true,
               pending_step: None,
               last_error: None,
               registry_hash: registry_hash.into(),
               created_at: now,
               updated_at: now }
    }

    pub fn is_exhausted(&self, step_count: usize) -> bool {
        self.current_step >= step_count
    }

    /// Retira el step actual. Nunca supera `step_count`.
    pub fn advance(&mut self, step_count: usize) {
        if self.current_step < step_count {
            self.current_step += 1;
        }
        self.pending_step = None;
    }

    /// Fuerza el estado "sin trabajo" sin retroceder el cursor.
    pub fn exhaust(&mut self, step_count: usize) {
        self.current_step = self.current_step.max(step_count);
        self.pending_step = None;
    }

    pub fn mark_version_invalid(&mut self, step_count: usize) {
        self.version_valid = false;
        self.exhaust(step_count);
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_never_passes_step_count() {
        let mut t = AuthenticatedTicket::new("t1", "h");
        t.advance(2);
        t.advance(2);
        t.advance(2);
        assert_eq!(t.current_step, 2);
        assert!(t.is_exhausted(2));
    }

    #[test]
    fn version_flag_is_terminal_and_exhausts() {
        let mut t = AuthenticatedTicket::new("t1", "h");
        t.pending_step = Some("a".into());
        t.mark_version_invalid(3);
        assert!(!t.version_valid);
        assert_eq!(t.current_step, 3);
        assert!(t.pending_step.is_none());
    }

    #[test]
    fn state_round_trips_through_str() {
        for s in [SessionState::Validating, SessionState::Running, SessionState::Closed] {
            assert_eq!(SessionState::parse(s.as_str()), Some(s));
        }
        assert_eq!(SessionState::parse("zombie"), None);
    }
}
