use std::sync::Mutex;

use qbwc_core::{QbXmlRecord, WebConnectorError};
use serde::{Deserialize, Serialize};

/// Destino de los registros que llegan de QuickBooks.
pub trait RecordSink: Send + Sync {
    /// Guarda una página. Un `Err` deja el cursor del iterador intacto.
    fn store(&self, ticket: &str, source: &str, records: &[QbXmlRecord]) -> Result<(), WebConnectorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub ticket: String,
    pub source: String,
    pub record: QbXmlRecord,
}

/// Sink en memoria, para tests y para el binario sin base de datos.
#[derive(Debug, Default)]
pub struct InMemoryRecordSink {
    records: Mutex<Vec<StoredRecord>>,
}

impl InMemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, source: &str) -> usize {
        self.records
            .lock()
            .map(|r| r.iter().filter(|s| s.source == source).count())
            .unwrap_or(0)
    }
}

impl RecordSink for InMemoryRecordSink {
    fn store(&self, ticket: &str, source: &str, records: &[QbXmlRecord]) -> Result<(), WebConnectorError> {
        let mut guard = self.records
                            .lock()
                            .map_err(|_| WebConnectorError::Internal("record sink lock poisoned".into()))?;
        guard.extend(records.iter().map(|r| StoredRecord { ticket: ticket.to_string(),
                                                           source: source.to_string(),
                                                           record: r.clone() }));
        log::debug!("stored {} {source} records for ticket {ticket}", records.len());
        Ok(())
    }
}
