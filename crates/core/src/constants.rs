//! Constants used throughout the HIP core crate.
//!
//! Defaults for configuration values and the names of the relational tables backing the
//! repositories live here so the store, the config layer and the binary agree on them.

/// Default SQLite database file when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "hip.sqlite3";

/// Default maximum size of a payload pushed inline, in megabytes.
pub const DEFAULT_DATA_SIZE_LIMIT_IN_MBS: u32 = 5;

/// Default lifetime of a health-information link, in minutes.
pub const DEFAULT_DATA_LINK_TTL_IN_MINUTES: u32 = 5;

/// Number of bytes in one megabyte for the size limit.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Table holding discovery requests.
pub const DISCOVERY_REQUEST_TABLE: &str = "discovery_request";

/// Table holding consent artefacts.
pub const CONSENT_TABLE: &str = "consent";

/// Table holding submitted health-information requests.
pub const DATA_FLOW_REQUEST_TABLE: &str = "data_flow_request";

/// Table holding link-addressed health-information payloads.
pub const HEALTH_INFORMATION_TABLE: &str = "health_information";
