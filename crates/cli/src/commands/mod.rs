pub mod chain;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod resolve;
pub mod seed;
pub mod step;

use std::sync::Arc;

use orgroute_core::approvals::ApprovalRoutingService;
use orgroute_core::config::{AppConfig, LoadOptions};
use orgroute_core::errors::{ApplicationError, InterfaceError};
use orgroute_db::{connect_from_config, DbPool, SqlOrgGraphReader};
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::warn;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_VERIFICATION: u8 = 6;
pub const EXIT_INVALID_INPUT: u8 = 7;
pub const EXIT_RESOLUTION: u8 = 8;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

/// `(error_class, message, exit_code)` carried out of a command's async block.
pub(crate) type Failure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Failure surfaced through the interface error mapping: user-safe message plus the
    /// correlation id that ties it to the logged detail.
    pub fn interface_failure(command: &str, error: &InterfaceError, exit_code: u8) -> Self {
        let error_class = match error {
            InterfaceError::BadRequest { .. } => "invalid_input",
            InterfaceError::ServiceUnavailable { .. } => "resolution",
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: error.user_message().to_string(),
            correlation_id: Some(error.correlation_id().to_string()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn load_config(
    command: &str,
    options: &LoadOptions,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, Failure> {
    connect_from_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))
}

pub(crate) fn routing_service(config: &AppConfig, pool: DbPool) -> ApprovalRoutingService {
    ApprovalRoutingService::new(Arc::new(SqlOrgGraphReader::new(pool)), &config.resolver)
}

/// Log the full error under a fresh correlation id and map it for the operator.
pub(crate) fn application_failure(
    command: &str,
    error: impl Into<ApplicationError>,
    exit_code: u8,
) -> CommandResult {
    let error = error.into();
    let correlation_id = new_correlation_id();
    warn!(
        event_name = "cli.command.failed",
        command,
        correlation_id = %correlation_id,
        error = %error,
        "command failed"
    );
    CommandResult::interface_failure(command, &error.into_interface(correlation_id), exit_code)
}
