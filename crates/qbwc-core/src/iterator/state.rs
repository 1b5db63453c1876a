use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IteratorStatus {
    NotStarted,
    InProgress,
    Done,
}

impl IteratorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IteratorStatus::NotStarted => "not_started",
            IteratorStatus::InProgress => "in_progress",
            IteratorStatus::Done => "done",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "not_started" => Some(IteratorStatus::NotStarted),
            "in_progress" => Some(IteratorStatus::InProgress),
            "done" => Some(IteratorStatus::Done),
            _ => None,
        }
    }
}

/// Cursor de un step con iterador, indexado por (ticket, step_name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IteratorState {
    pub ticket: String,
    pub step_name: String,
    /// `iteratorID` de la última respuesta.
    pub key: Option<String>,
    pub status: IteratorStatus,
    /// Filas consumidas en páginas anteriores.
    pub consumed: u32,
    /// Último progreso reportado; el siguiente nunca es menor.
    pub last_progress: i32,
    pub updated_at: DateTime<Utc>,
}

impl IteratorState {
    pub fn not_started(ticket: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self { ticket: ticket.into(),
               step_name: step_name.into(),
               key: None,
               status: IteratorStatus::NotStarted,
               consumed: 0,
               last_progress: 0,
               updated_at: Utc::now() }
    }

    /// Clave de continuación vigente, sólo si el iterador está en curso.
    pub fn continuation(&self) -> Option<&str> {
        match self.status {
            IteratorStatus::InProgress => self.key.as_deref(),
            _ => None,
        }
    }
}
