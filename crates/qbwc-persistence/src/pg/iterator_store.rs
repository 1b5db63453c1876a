use chrono::{DateTime, Utc};
use diesel::prelude::*;
use qbwc_core::{IteratorState, IteratorStatus, IteratorStore, WebConnectorError};

use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::qbwc_iterators;

/// Fila de `qbwc_iterators`, clave (ticket, step_name).
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = qbwc_iterators)]
#[diesel(primary_key(ticket, step_name))]
#[diesel(treat_none_as_null = true)]
pub struct IteratorRow {
    pub ticket: String,
    pub step_name: String,
    pub iterator_key: Option<String>,
    pub status: String,
    pub consumed: i32,
    pub last_progress: i32,
    pub updated_at: DateTime<Utc>,
}

impl IteratorRow {
    fn from_domain(s: &IteratorState) -> Result<Self, PersistenceError> {
        let consumed = i32::try_from(s.consumed).map_err(|_| PersistenceError::Corrupt(format!("consumed {}", s.consumed)))?;
        Ok(Self { ticket: s.ticket.clone(),
                  step_name: s.step_name.clone(),
                  iterator_key: s.key.clone(),
                  status: s.status.as_str().to_string(),
                  consumed,
                  last_progress: s.last_progress,
                  updated_at: s.updated_at })
    }

    fn into_domain(self) -> Result<IteratorState, PersistenceError> {
        let status =
            IteratorStatus::parse(&self.status).ok_or_else(|| PersistenceError::Corrupt(format!("status '{}'", self.status)))?;
        let consumed = u32::try_from(self.consumed).map_err(|_| PersistenceError::Corrupt(format!("consumed {}", self.consumed)))?;
        Ok(IteratorState { ticket: self.ticket,
                           step_name: self.step_name,
                           key: self.iterator_key,
                           status,
                           consumed,
                           last_progress: self.last_progress,
                           updated_at: self.updated_at })
    }
}

/// `IteratorStore` sobre `qbwc_iterators`.
pub struct PgIteratorStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgIteratorStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> IteratorStore for PgIteratorStore<P> {
    fn load(&self, ticket: &str, step_name: &str) -> Result<Option<IteratorState>, WebConnectorError> {
        let row: Option<IteratorRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            let r = qbwc_iterators::table.find((ticket, step_name))
                                         .select(IteratorRow::as_select())
                                         .first(&mut conn)
                                         .optional()?;
            Ok(r)
        })?;
        Ok(row.map(IteratorRow::into_domain).transpose()?)
    }

    fn save(&self, state: &IteratorState) -> Result<(), WebConnectorError> {
        let row = IteratorRow::from_domain(state)?;
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(qbwc_iterators::table).values(&row)
                                                      .on_conflict((qbwc_iterators::ticket, qbwc_iterators::step_name))
                                                      .do_update()
                                                      .set(&row)
                                                      .execute(&mut conn)?;
            Ok(())
        })?;
        Ok(())
    }

    fn remove(&self, ticket: &str, step_name: &str) -> Result<(), WebConnectorError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::delete(qbwc_iterators::table.find((ticket, step_name))).execute(&mut conn)?;
            Ok(())
        })?;
        Ok(())
    }

    fn remove_ticket(&self, ticket: &str) -> Result<(), WebConnectorError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::delete(qbwc_iterators::table.filter(qbwc_iterators::ticket.eq(ticket))).execute(&mut conn)?;
            Ok(())
        })?;
        Ok(())
    }
}
