//! Tether catalog: the data rules behind the console's "add resource" catalog,
//! database and integration registration, and session joining.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod database;
pub mod integration;
pub mod session;

pub use catalog::{builtin_specs, check_has_access, make_catalog, preselect, search_catalog, sort_by_kind, Access, Acl, CatalogKind, ResourceSpec};
pub use database::{can_create_database, parse_port, DatabaseEngine, DatabaseForm, DatabaseFormError, FormLabel, RegisterDatabaseRequest};
pub use integration::{AwsOidcSpec, Integration, IntegrationError, UpdateIntegrationRequest};
pub use session::{join_links, JoinError, JoinLink, ParticipantMode};
