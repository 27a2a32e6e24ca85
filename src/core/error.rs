use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,
    ConfigMultipleErrors,

    ValidationInvalidArgument,

    TargetNotFound,

    SshIdentityFileNotFound,

    RollbackNoPriorRelease,

    RemoteListFailed,
    RemoteCommandFailed,
    RemoteCommandTimeout,

    DbOperationFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigMultipleErrors => "config.multiple_errors",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::TargetNotFound => "target.not_found",

            ErrorCode::SshIdentityFileNotFound => "ssh.identity_file_not_found",

            ErrorCode::RollbackNoPriorRelease => "rollback.no_prior_release",

            ErrorCode::RemoteListFailed => "remote.list_failed",
            ErrorCode::RemoteCommandFailed => "remote.command_failed",
            ErrorCode::RemoteCommandTimeout => "remote.command_timeout",

            ErrorCode::DbOperationFailed => "db.operation_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    /// Whether this code belongs to the configuration family.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConfigMissingKey
                | ErrorCode::ConfigInvalidJson
                | ErrorCode::ConfigInvalidValue
                | ErrorCode::ConfigMultipleErrors
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

/// One entry of an aggregated configuration failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigProblem {
    pub key: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshIdentityFileNotFoundDetails {
    pub host: String,
    pub identity_file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoPriorReleaseDetails {
    pub operation: String,
    pub release_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub target: TargetDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommandTimeoutDetails {
    pub command: String,
    pub timeout_secs: u64,
    pub target: TargetDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let key = key.into();
        Self::new(
            ErrorCode::ConfigMissingKey,
            format!("Missing required configuration key '{}'", key),
            to_details(ConfigMissingKeyDetails { key, path }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid configuration file",
            to_details(ConfigInvalidJsonDetails {
                path: path.into(),
                error: error.into(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            }),
        )
    }

    /// Collapse a list of configuration problems into one error.
    ///
    /// A single problem keeps its specific code so callers can match on it.
    pub fn config_problems(mut problems: Vec<ConfigProblem>) -> Self {
        if problems.len() == 1 {
            let problem = problems.remove(0);
            return Self::config_invalid_value(problem.key, None, problem.problem);
        }

        let summary = problems
            .iter()
            .map(|p| p.key.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Self::new(
            ErrorCode::ConfigMultipleErrors,
            format!("Configuration has {} problems ({})", problems.len(), summary),
            serde_json::json!({ "problems": problems }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem: problem.into(),
                id,
            }),
        )
    }

    pub fn target_not_found(id: impl Into<String>, path: Option<String>) -> Self {
        Self::new(
            ErrorCode::TargetNotFound,
            "Deploy target not found",
            to_details(NotFoundDetails {
                id: id.into(),
                path,
            }),
        )
        .with_hint("Create ~/.config/rollout/targets/<id>.json or pass --config <path>")
    }

    pub fn ssh_identity_file_not_found(
        host: impl Into<String>,
        identity_file: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::SshIdentityFileNotFound,
            "SSH identity file not found",
            to_details(SshIdentityFileNotFoundDetails {
                host: host.into(),
                identity_file: identity_file.into(),
            }),
        )
    }

    pub fn no_prior_release(operation: impl Into<String>, release_count: usize) -> Self {
        let operation = operation.into();
        Self::new(
            ErrorCode::RollbackNoPriorRelease,
            format!(
                "could not rollback the {} because there is no prior release",
                operation
            ),
            to_details(NoPriorReleaseDetails {
                operation,
                release_count,
            }),
        )
    }

    pub fn remote_list_failed(details: RemoteCommandFailedDetails) -> Self {
        Self::new(
            ErrorCode::RemoteListFailed,
            "Failed to list remote directory",
            to_details(details),
        )
    }

    pub fn remote_command_failed(details: RemoteCommandFailedDetails) -> Self {
        Self::new(
            ErrorCode::RemoteCommandFailed,
            "Remote command failed",
            to_details(details),
        )
    }

    pub fn remote_command_timeout(details: RemoteCommandTimeoutDetails) -> Self {
        let message = format!("Remote command timed out after {}s", details.timeout_secs);
        Self::new(ErrorCode::RemoteCommandTimeout, message, to_details(details))
    }

    pub fn db_operation_failed(
        operation: impl Into<String>,
        details: RemoteCommandFailedDetails,
    ) -> Self {
        Self::new(
            ErrorCode::DbOperationFailed,
            format!("Database {} failed", operation.into()),
            to_details(details),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            serde_json::json!({ "error": error.into(), "context": context }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    /// Re-tag a remote failure as a database operation failure.
    ///
    /// Other error kinds (timeouts, config) pass through unchanged.
    pub fn into_db_operation(self, operation: &str) -> Self {
        if self.code != ErrorCode::RemoteCommandFailed {
            return self;
        }
        Self {
            code: ErrorCode::DbOperationFailed,
            message: format!("Database {} failed", operation),
            ..self
        }
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
