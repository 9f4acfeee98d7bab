//! Repository contracts and their relational implementation.
//!
//! Each submodule declares the async contract the data-flow code depends on. The contracts
//! are object safe so services hold them as `Arc<dyn ...>` and tests substitute fakes.
//! [`sqlite::SqliteStore`] implements all of them over one SQLite database.

pub mod consent;
pub mod data_flow;
pub mod discovery;
pub mod health_information;
pub mod sqlite;

pub use consent::ConsentRepository;
pub use data_flow::DataFlowRepository;
pub use discovery::DiscoveryRequestRepository;
pub use health_information::HealthInformationRepository;
pub use sqlite::SqliteStore;
