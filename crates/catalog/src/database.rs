//! "Register a database" form rules: what the wizard accepts and the
//! registration request it produces.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Acl;

/// Database engines the registration form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Postgres,
    MySql,
    MongoDb,
    Redis,
    SqlServer,
    CockroachDb,
}

impl DatabaseEngine {
    /// Wire protocol the database service speaks for this engine.
    pub fn protocol(self) -> &'static str {
        match self {
            DatabaseEngine::Postgres => "postgres",
            DatabaseEngine::MySql => "mysql",
            DatabaseEngine::MongoDb => "mongodb",
            DatabaseEngine::Redis => "redis",
            DatabaseEngine::SqlServer => "sqlserver",
            DatabaseEngine::CockroachDb => "cockroachdb",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            DatabaseEngine::Postgres => 5432,
            DatabaseEngine::MySql => 3306,
            DatabaseEngine::MongoDb => 27017,
            DatabaseEngine::Redis => 6379,
            DatabaseEngine::SqlServer => 1433,
            DatabaseEngine::CockroachDb => 26257,
        }
    }
}

impl FromStr for DatabaseEngine {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DatabaseEngine::Postgres),
            "mysql" | "mariadb" => Ok(DatabaseEngine::MySql),
            "mongodb" | "mongo" => Ok(DatabaseEngine::MongoDb),
            "redis" => Ok(DatabaseEngine::Redis),
            "sqlserver" | "mssql" => Ok(DatabaseEngine::SqlServer),
            "cockroachdb" | "cockroach" => Ok(DatabaseEngine::CockroachDb),
            other => Err(format!("unknown database engine: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormLabel {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseFormError {
    #[error("you do not have permission to register databases")]
    AccessDenied,
    #[error("database name is required")]
    MissingName,
    #[error("connection endpoint is required")]
    MissingEndpoint,
    #[error("invalid port (1-65535)")]
    InvalidPort,
    #[error("duplicate label key: {0}")]
    DuplicateLabelKey(String),
}

/// What the user filled into the form. `port` falls back to the engine's
/// default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseForm {
    pub engine: DatabaseEngine,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub labels: Vec<FormLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDatabaseRequest {
    pub name: String,
    /// `<endpoint>:<port>`
    pub uri: String,
    pub protocol: String,
    pub labels: Vec<FormLabel>,
}

pub fn can_create_database(acl: &Acl) -> bool { acl.databases.create }

/// Digits only, 1 through 65535.
pub fn parse_port(value: &str) -> Result<u16, DatabaseFormError> {
    let v = value.trim();
    if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DatabaseFormError::InvalidPort);
    }
    match v.parse::<u16>() {
        Ok(p) if p >= 1 => Ok(p),
        _ => Err(DatabaseFormError::InvalidPort),
    }
}

fn check_labels(labels: &[FormLabel]) -> Result<(), DatabaseFormError> {
    for (i, l) in labels.iter().enumerate() {
        if labels[..i].iter().any(|o| o.name == l.name) {
            return Err(DatabaseFormError::DuplicateLabelKey(l.name.clone()));
        }
    }
    Ok(())
}

impl DatabaseForm {
    pub fn new(engine: DatabaseEngine) -> Self {
        Self { engine, name: String::new(), endpoint: String::new(), port: None, labels: Vec::new() }
    }

    /// Validates the form against the user's access and builds the request.
    pub fn to_request(&self, acl: &Acl) -> Result<RegisterDatabaseRequest, DatabaseFormError> {
        if !can_create_database(acl) {
            return Err(DatabaseFormError::AccessDenied);
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DatabaseFormError::MissingName);
        }
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(DatabaseFormError::MissingEndpoint);
        }
        let port = match &self.port {
            Some(p) => parse_port(p)?,
            None => self.engine.default_port(),
        };
        let labels: Vec<FormLabel> =
            self.labels.iter().map(|l| FormLabel { name: l.name.trim().to_string(), value: l.value.trim().to_string() }).collect();
        check_labels(&labels)?;
        debug!(db = %name, engine = ?self.engine, port, "database form accepted");
        Ok(RegisterDatabaseRequest {
            name: name.to_string(),
            uri: format!("{}:{}", endpoint, port),
            protocol: self.engine.protocol().to_string(),
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Access;

    fn allowed() -> Acl { Acl { databases: Access { create: true, ..Default::default() }, ..Default::default() } }

    fn form() -> DatabaseForm {
        DatabaseForm { name: "orders".into(), endpoint: "db.internal".into(), ..DatabaseForm::new(DatabaseEngine::Postgres) }
    }

    #[test]
    fn builds_uri_and_protocol_from_engine() {
        let req = form().to_request(&allowed()).expect("valid");
        assert_eq!(req.uri, "db.internal:5432");
        assert_eq!(req.protocol, "postgres");

        let mongo = DatabaseForm { engine: DatabaseEngine::MongoDb, port: Some("27018".into()), ..form() };
        let req = mongo.to_request(&allowed()).expect("valid");
        assert_eq!(req.uri, "db.internal:27018");
        assert_eq!(req.protocol, "mongodb");
    }

    #[test]
    fn needs_create_on_databases() {
        assert!(!can_create_database(&Acl::default()));
        assert_eq!(form().to_request(&Acl::default()), Err(DatabaseFormError::AccessDenied));
    }

    #[test]
    fn name_and_endpoint_are_required() {
        let no_name = DatabaseForm { name: "  ".into(), ..form() };
        assert_eq!(no_name.to_request(&allowed()), Err(DatabaseFormError::MissingName));
        assert_eq!(DatabaseFormError::MissingName.to_string(), "database name is required");
        let no_endpoint = DatabaseForm { endpoint: String::new(), ..form() };
        assert_eq!(no_endpoint.to_request(&allowed()), Err(DatabaseFormError::MissingEndpoint));
    }

    #[test]
    fn port_range() {
        assert_eq!(parse_port("1"), Ok(1));
        assert_eq!(parse_port("65535"), Ok(65535));
        for bad in ["0", "65536", "", "-1", "54a", "3.5"] {
            assert_eq!(parse_port(bad), Err(DatabaseFormError::InvalidPort), "{:?}", bad);
        }
        let cleared = DatabaseForm { port: Some(String::new()), ..form() };
        assert_eq!(cleared.to_request(&allowed()), Err(DatabaseFormError::InvalidPort));
        assert_eq!(DatabaseFormError::InvalidPort.to_string(), "invalid port (1-65535)");
    }

    #[test]
    fn label_keys_must_be_unique() {
        let labels = vec![
            FormLabel { name: "env".into(), value: "prod".into() },
            FormLabel { name: " env".into(), value: "dev".into() },
        ];
        let dup = DatabaseForm { labels, ..form() };
        assert_eq!(dup.to_request(&allowed()), Err(DatabaseFormError::DuplicateLabelKey("env".into())));
    }

    #[test]
    fn engine_defaults() {
        assert_eq!("MariaDB".parse::<DatabaseEngine>(), Ok(DatabaseEngine::MySql));
        assert_eq!(DatabaseEngine::SqlServer.default_port(), 1433);
        assert!("oracle".parse::<DatabaseEngine>().is_err());
    }
}
