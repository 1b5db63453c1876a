use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::debug;
use qbwc_core::{AuthenticatedTicket, SessionState, TicketStore, WebConnectorError};

use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::qbwc_tickets;

/// Fila de `qbwc_tickets`.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = qbwc_tickets)]
#[diesel(primary_key(ticket))]
#[diesel(treat_none_as_null = true)]
pub struct TicketRow {
    pub ticket: String,
    pub current_step: i32,
    pub is_authenticated: bool,
    pub state: String,
    pub version_valid: bool,
    pub pending_step: Option<String>,
    pub last_error: Option<String>,
    pub registry_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketRow {
    fn from_domain(t: &AuthenticatedTicket) -> Result<Self, PersistenceError> {
        let current_step =
            i32::try_from(t.current_step).map_err(|_| PersistenceError::Corrupt(format!("current_step {}", t.current_step)))?;
        Ok(Self { ticket: t.ticket.clone(),
                  current_step,
                  is_authenticated: t.is_authenticated,
                  state: t.state.as_str().to_string(),
                  version_valid: t.version_valid,
                  pending_step: t.pending_step.clone(),
                  last_error: t.last_error.clone(),
                  registry_hash: t.registry_hash.clone(),
                  created_at: t.created_at,
                  updated_at: t.updated_at })
    }

    fn into_domain(self) -> Result<AuthenticatedTicket, PersistenceError> {
        let state = SessionState::parse(&self.state).ok_or_else(|| PersistenceError::Corrupt(format!("state '{}'", self.state)))?;
        let current_step =
            usize::try_from(self.current_step).map_err(|_| PersistenceError::Corrupt(format!("current_step {}", self.current_step)))?;
        Ok(AuthenticatedTicket { ticket: self.ticket,
                                 current_step,
                                 is_authenticated: self.is_authenticated,
                                 state,
                                 version_valid: self.version_valid,
                                 pending_step: self.pending_step,
                                 last_error: self.last_error,
                                 registry_hash: self.registry_hash,
                                 created_at: self.created_at,
                                 updated_at: self.updated_at })
    }
}

/// `TicketStore` sobre `qbwc_tickets`.
pub struct PgTicketStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgTicketStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> TicketStore for PgTicketStore<P> {
    fn insert(&self, ticket: &AuthenticatedTicket) -> Result<(), WebConnectorError> {
        let row = TicketRow::from_domain(ticket)?;
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(qbwc_tickets::table).values(&row)
                                                    .execute(&mut conn)?;
            Ok(())
        })?;
        debug!("ticket inserted {}", ticket.ticket);
        Ok(())
    }

    fn load(&self, ticket: &str) -> Result<Option<AuthenticatedTicket>, WebConnectorError> {
        let row: Option<TicketRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            let r = qbwc_tickets::table.find(ticket)
                                       .select(TicketRow::as_select())
                                       .first(&mut conn)
                                       .optional()?;
            Ok(r)
        })?;
        Ok(row.map(TicketRow::into_domain).transpose()?)
    }

    fn save(&self, ticket: &AuthenticatedTicket) -> Result<(), WebConnectorError> {
        let row = TicketRow::from_domain(ticket)?;
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(qbwc_tickets::table).values(&row)
                                                    .on_conflict(qbwc_tickets::ticket)
                                                    .do_update()
                                                    .set(&row)
                                                    .execute(&mut conn)?;
            Ok(())
        })?;
        Ok(())
    }

    fn remove(&self, ticket: &str) -> Result<(), WebConnectorError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::delete(qbwc_tickets::table.find(ticket)).execute(&mut conn)?;
            Ok(())
        })?;
        debug!("ticket removed {ticket}");
        Ok(())
    }
}
