//! `hip` operator binary.
//!
//! Resolves configuration from the environment once, opens the SQLite store, and runs a single
//! data-flow operation per invocation. Results are printed as JSON on stdout; refusals are
//! printed as an `ErrorRepresentation` and the process exits non-zero.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hip_core::config::{database_path_from_env_value, u32_from_env_value};
use hip_core::consent::{Consent, ConsentStatus};
use hip_core::constants::{DEFAULT_DATA_LINK_TTL_IN_MINUTES, DEFAULT_DATA_SIZE_LIMIT_IN_MBS};
use hip_core::discovery::DiscoveryRequest;
use hip_core::messaging::{ChannelQueue, DataFlowMessage};
use hip_core::repositories::{ConsentRepository, DiscoveryRequestRepository, SqliteStore};
use hip_core::{
    CanonicalId, DataFlowConfig, DataFlowService, ErrorRepresentation, HealthInformationRequest,
    NonEmptyText,
};

const DEFAULT_LOG_DIRECTIVES: &str = "hip=info,hip_core=info";

#[derive(Parser)]
#[command(name = "hip")]
#[command(about = "Health information provider data-flow CLI")]
struct Cli {
    /// SQLite database file (overrides HIP_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    InitDb,
    /// Record a discovery request
    AddDiscovery {
        transaction_id: NonEmptyText,
        consent_manager_user_id: NonEmptyText,
    },
    /// Remove a discovery request
    DeleteDiscovery {
        transaction_id: NonEmptyText,
        consent_manager_user_id: NonEmptyText,
    },
    /// Store a consent artefact
    AddConsent {
        consent_artefact_id: NonEmptyText,
        patient_id: NonEmptyText,
        #[arg(long, value_enum, default_value_t = StatusArg::Granted)]
        status: StatusArg,
    },
    /// Submit a health-information request read from a JSON file
    SubmitRequest {
        /// Request document; a transactionId is generated when absent
        file: PathBuf,
    },
    /// Package a payload for push, parking it behind a link if it exceeds the size limit
    StoreEntry {
        file: PathBuf,
    },
    /// Resolve a health-information link
    GetHealthInformation {
        link_id: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        transaction_id: NonEmptyText,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "UPPER")]
enum StatusArg {
    Granted,
    Revoked,
    Expired,
}

impl From<StatusArg> for ConsentStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Granted => ConsentStatus::Granted,
            StatusArg::Revoked => ConsentStatus::Revoked,
            StatusArg::Expired => ConsentStatus::Expired,
        }
    }
}

/// # Environment Variables
/// - `HIP_DATABASE_PATH`: SQLite file (default: "hip.sqlite3")
/// - `DATA_SIZE_LIMIT_IN_MBS`: inline payload limit (default: 5)
/// - `DATA_LINK_TTL_IN_MINUTES`: link lifetime (default: 5)
/// - `RUST_LOG`: tracing filter (default: `DEFAULT_LOG_DIRECTIVES`)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter(std::env::var("RUST_LOG").ok()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let database_path = cli
        .database
        .unwrap_or_else(|| database_path_from_env_value(std::env::var("HIP_DATABASE_PATH").ok()));
    let cfg = Arc::new(DataFlowConfig::new(
        u32_from_env_value(
            "DATA_SIZE_LIMIT_IN_MBS",
            std::env::var("DATA_SIZE_LIMIT_IN_MBS").ok(),
            DEFAULT_DATA_SIZE_LIMIT_IN_MBS,
        )?,
        u32_from_env_value(
            "DATA_LINK_TTL_IN_MINUTES",
            std::env::var("DATA_LINK_TTL_IN_MINUTES").ok(),
            DEFAULT_DATA_LINK_TTL_IN_MINUTES,
        )?,
    )?);

    let Some(command) = cli.command else {
        println!("Use 'hip --help' for commands");
        return Ok(());
    };

    tracing::debug!("-- Opening HIP store at {}", database_path.display());
    let store = Arc::new(
        SqliteStore::open(&database_path)
            .with_context(|| format!("opening {}", database_path.display()))?,
    );

    match command {
        Commands::InitDb => {
            tracing::info!("++ Schema ready in {}", database_path.display());
        }
        Commands::AddDiscovery {
            transaction_id,
            consent_manager_user_id,
        } => {
            if store
                .exists(&transaction_id, &consent_manager_user_id)
                .await?
            {
                anyhow::bail!(
                    "discovery request already open for {} / {}",
                    transaction_id,
                    consent_manager_user_id
                );
            }
            DiscoveryRequestRepository::add(
                &*store,
                DiscoveryRequest::new(transaction_id.clone(), consent_manager_user_id),
            )
            .await?;
            println!("Recorded discovery request {}", transaction_id);
        }
        Commands::DeleteDiscovery {
            transaction_id,
            consent_manager_user_id,
        } => {
            store
                .delete(&transaction_id, &consent_manager_user_id)
                .await?;
            println!("Removed discovery request {}", transaction_id);
        }
        Commands::AddConsent {
            consent_artefact_id,
            patient_id,
            status,
        } => {
            let status = ConsentStatus::from(status);
            ConsentRepository::add(
                &*store,
                Consent {
                    consent_artefact_id: consent_artefact_id.clone(),
                    patient_id,
                    status,
                    created_at: Utc::now(),
                },
            )
            .await?;
            println!("Stored consent {} ({})", consent_artefact_id, status);
        }
        Commands::SubmitRequest { file } => {
            let request = read_request(&file)?;
            let (service, mut receiver) = data_flow_service(store, cfg);

            let response = report(service.health_information_request_for(request).await)?;
            print_json(&response)?;

            while let Ok(message) = receiver.try_recv() {
                log_queued(&message);
            }
        }
        Commands::StoreEntry { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let (service, _receiver) = data_flow_service(store, cfg);

            let entry = report(service.entry_for(content).await)?;
            print_json(&entry)?;
        }
        Commands::GetHealthInformation {
            link_id,
            token,
            transaction_id,
        } => {
            let (service, _receiver) = data_flow_service(store, cfg);

            let response = report(
                service
                    .health_information_for(&link_id, &token, &transaction_id)
                    .await,
            )?;
            print_json(&response)?;
        }
    }

    Ok(())
}

/// Uses `RUST_LOG` as given when it parses, otherwise the binary's info-level default.
fn log_filter(rust_log: Option<String>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

fn data_flow_service(
    store: Arc<SqliteStore>,
    cfg: Arc<DataFlowConfig>,
) -> (DataFlowService, tokio::sync::mpsc::Receiver<DataFlowMessage>) {
    let (queue, receiver) = ChannelQueue::new(16);
    let service = DataFlowService::new(
        store.clone(),
        Arc::new(queue),
        store.clone(),
        store,
        cfg,
    );
    (service, receiver)
}

/// Reads a request document, generating a transaction id if the document has none.
fn read_request(file: &Path) -> anyhow::Result<HealthInformationRequest> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let mut document: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

    if let Some(fields) = document.as_object_mut() {
        if !fields.contains_key("transactionId") {
            let generated = CanonicalId::new().to_string();
            tracing::info!("generated transaction id {}", generated);
            fields.insert("transactionId".into(), serde_json::Value::String(generated));
        }
    }

    serde_json::from_value(document)
        .with_context(|| format!("{} is not a health information request", file.display()))
}

/// Prints a refusal as JSON and turns it into the process error.
fn report<T>(result: Result<T, ErrorRepresentation>) -> anyhow::Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(representation) => {
            print_json(&representation)?;
            Err(representation.into())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn log_queued(message: &DataFlowMessage) {
    tracing::info!(
        "queued data flow request {} (consent {}) for push to {}",
        message.transaction_id,
        message.consent_id,
        message.data_push_url
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_consent_status_defaults_to_granted() {
        let cli = Cli::try_parse_from(["hip", "add-consent", "consent-1", "patient@ncg"]).unwrap();
        match cli.command {
            Some(Commands::AddConsent { status, .. }) => {
                assert_eq!(ConsentStatus::from(status), ConsentStatus::Granted)
            }
            _ => panic!("expected add-consent"),
        }
    }

    #[test]
    fn test_add_consent_accepts_upper_case_status() {
        let cli = Cli::try_parse_from([
            "hip",
            "add-consent",
            "consent-1",
            "patient@ncg",
            "--status",
            "REVOKED",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::AddConsent { status, .. }) => {
                assert_eq!(ConsentStatus::from(status), ConsentStatus::Revoked)
            }
            _ => panic!("expected add-consent"),
        }
    }

    #[test]
    fn test_add_consent_rejects_unknown_status_as_usage_error() {
        let err = Cli::try_parse_from([
            "hip",
            "add-consent",
            "consent-1",
            "patient@ncg",
            "--status",
            "GRANTD",
        ])
        .err()
        .expect("typo should be rejected");

        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
        assert!(!err.to_string().contains("malformed"));
    }

    #[test]
    fn test_log_filter_keeps_rust_log_directives() {
        let filter = log_filter(Some("hip_core=debug".into()));
        assert_eq!(filter.to_string(), "hip_core=debug");
    }

    #[test]
    fn test_log_filter_falls_back_to_default() {
        let filter = log_filter(None);
        let rendered = filter.to_string();
        assert!(rendered.contains("hip=info"));
        assert!(rendered.contains("hip_core=info"));
    }
}
