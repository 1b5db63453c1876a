//! Configuración del servidor.
//! Carga variables de entorno (.env una sola vez) y expone `ServerConfig`.
use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use qbwc_core::constants::DEFAULT_MAX_RETURNED;

use crate::errors::BridgeError;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Configuración del binario `qbwc-server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Ruta del endpoint SOAP (la que se pone en el `.qwc`).
    pub soap_path: String,
    pub username: String,
    pub password: String,
    /// Vacío = el company file abierto en QuickBooks.
    pub company_file: String,
    pub min_qbxml_major: u32,
    pub min_qbxml_minor: u32,
    pub max_returned: u32,
    /// Sin URL se usan los stores en memoria.
    pub database_url: Option<String>,
    pub db_min_connections: u32,
    pub db_max_connections: u32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, BridgeError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
        where F: Fn(&str) -> Option<String>
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, default: u32| -> Result<u32, BridgeError> {
            match get(key) {
                Some(v) => v.trim()
                            .parse()
                            .map_err(|_| BridgeError::Config(format!("{key}='{v}' no es un número"))),
                None => Ok(default),
            }
        };

        let bind_raw = get("QBWC_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let bind_addr = bind_raw.parse()
                                .map_err(|_| BridgeError::Config(format!("QBWC_BIND_ADDR='{bind_raw}' inválido")))?;
        let soap_path = get("QBWC_SOAP_PATH").unwrap_or_else(|| "/QBConnectorAsync.asmx".to_string());
        if !soap_path.starts_with('/') {
            return Err(BridgeError::Config(format!("QBWC_SOAP_PATH='{soap_path}' debe empezar con '/'")));
        }
        let username = get("QBWC_USERNAME").ok_or_else(|| BridgeError::Config("QBWC_USERNAME no definido".into()))?;
        let password = get("QBWC_PASSWORD").ok_or_else(|| BridgeError::Config("QBWC_PASSWORD no definido".into()))?;
        let max_returned = number("QBWC_MAX_RETURNED", DEFAULT_MAX_RETURNED)?;
        if max_returned == 0 {
            return Err(BridgeError::Config("QBWC_MAX_RETURNED debe ser > 0".into()));
        }

        Ok(Self { bind_addr,
                  soap_path,
                  username,
                  password,
                  company_file: get("QBWC_COMPANY_FILE").unwrap_or_default(),
                  min_qbxml_major: number("QBWC_MIN_QBXML_MAJOR", 13)?,
                  min_qbxml_minor: number("QBWC_MIN_QBXML_MINOR", 0)?,
                  max_returned,
                  database_url: get("DATABASE_URL"),
                  db_min_connections: number("DATABASE_MIN_CONNECTIONS", 2)?,
                  db_max_connections: number("DATABASE_MAX_CONNECTIONS", 16)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_only_credentials() {
        let cfg = ServerConfig::from_lookup(lookup(&[("QBWC_USERNAME", "u"), ("QBWC_PASSWORD", "p")])).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.soap_path, "/QBConnectorAsync.asmx");
        assert_eq!(cfg.max_returned, 100);
        assert_eq!((cfg.min_qbxml_major, cfg.min_qbxml_minor), (13, 0));
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.db_max_connections, 16);
    }

    #[test]
    fn missing_credentials_and_bad_numbers_fail() {
        assert!(matches!(ServerConfig::from_lookup(lookup(&[])), Err(BridgeError::Config(_))));
        let bad = lookup(&[("QBWC_USERNAME", "u"), ("QBWC_PASSWORD", "p"), ("QBWC_MAX_RETURNED", "lots")]);
        assert!(matches!(ServerConfig::from_lookup(bad), Err(BridgeError::Config(_))));
        let zero = lookup(&[("QBWC_USERNAME", "u"), ("QBWC_PASSWORD", "p"), ("QBWC_MAX_RETURNED", "0")]);
        assert!(ServerConfig::from_lookup(zero).is_err());
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = ServerConfig::from_lookup(lookup(&[("QBWC_USERNAME", "u"),
                                                      ("QBWC_PASSWORD", "p"),
                                                      ("DATABASE_URL", "  ")])).unwrap();
        assert!(cfg.database_url.is_none());
    }
}
