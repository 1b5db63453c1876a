/// Decide si el cliente (company file, país, versión qbXML) es aceptable.
///
/// Se consulta una vez por ticket, en el primer `sendRequestXML`. Un
/// `false` es terminal para la sesión.
pub trait MessageValidator: Send + Sync {
    fn validate_message(&self, ticket: &str, company_file: &str, country: &str, major: u32, minor: u32) -> bool;
}

/// Acepta cualquier cliente.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

impl MessageValidator for AcceptAllValidator {
    fn validate_message(&self, _ticket: &str, _company_file: &str, _country: &str, _major: u32, _minor: u32) -> bool {
        true
    }
}

/// Versión qbXML mínima y, opcionalmente, lista de países admitidos.
#[derive(Debug, Clone)]
pub struct VersionValidator {
    pub min_major: u32,
    pub min_minor: u32,
    /// Vacío = cualquier país.
    pub countries: Vec<String>,
}

impl VersionValidator {
    pub fn new(min_major: u32, min_minor: u32) -> Self {
        Self { min_major,
               min_minor,
               countries: Vec::new() }
    }

    pub fn with_countries<I, S>(mut self, countries: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }
}

impl MessageValidator for VersionValidator {
    fn validate_message(&self, _ticket: &str, _company_file: &str, country: &str, major: u32, minor: u32) -> bool {
        if !self.countries.is_empty() && !self.countries.iter().any(|c| c.eq_ignore_ascii_case(country)) {
            return false;
        }
        (major, minor) >= (self.min_major, self.min_minor)
    }
}
