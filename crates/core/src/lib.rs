//! # HIP Core
//!
//! Core business logic for the health-information-provider (HIP) data flow.
//!
//! This crate contains:
//! - The domain records exchanged with a consent manager (discovery requests, consents,
//!   health-information requests and link-addressed payloads)
//! - Async repository contracts and their SQLite implementation
//! - [`DataFlowService`], which validates consent, stores requests, and resolves links
//!   against their token and time-to-live
//!
//! **No transport concerns**: routing, HTTP handling and authentication belong to whatever
//! front end embeds this crate.

pub mod config;
pub mod consent;
pub mod constants;
pub mod data_flow;
pub mod discovery;
pub mod error;
pub mod error_representation;
pub mod health_information;
pub mod messaging;
pub mod repositories;

pub use config::DataFlowConfig;
pub use constants::DEFAULT_DATABASE_PATH;
pub use data_flow::{DataFlowService, Entry, HealthInformationRequest, HealthInformationResponse};
pub use error::{ConfigError, MessagingError, StoreError, StoreResult};
pub use error_representation::{ErrorCode, ErrorRepresentation};

// Re-export the shared validated types so callers need only depend on this crate.
pub use hip_types::{NonEmptyText, SecretText, TextError};
pub use hip_uuid::CanonicalId;
