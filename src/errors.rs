//! Error types.
//!
//! [`AdminError`] covers failures of the database administrative API.
//! Most of them are expected while the environment comes up and are
//! swallowed by the caller.  [`BootstrapError`] is what ends a run: every
//! variant terminates the process with a nonzero exit code.

use thiserror::Error;

/// `replSetGetStatus` code for a node that has not joined a replica set yet.
pub const NOT_YET_INITIALIZED_CODE: i32 = 94;

/// `replSetInitiate` code for a node that already belongs to a replica set.
pub const ALREADY_INITIALIZED_CODE: i32 = 23;

/// Failure of a single administrative command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdminError {
    /// The node answered, but it is not part of a replica set yet.
    #[error("replica set not yet initialized: {message}")]
    NotYetInitialized { message: String },

    /// The host could not be reached (DNS, refused, server selection timeout).
    #[error("host unreachable: {message}")]
    Unreachable { message: String },

    /// The node rejected the command.
    #[error("command failed ({code_name}, code {code}): {message}")]
    Command {
        code: i32,
        code_name: String,
        message: String,
    },

    /// The reply could not be decoded.
    #[error("malformed reply: {0}")]
    Decode(String),
}

impl AdminError {
    /// Build the error a node returns for a command code.
    pub fn from_code(code: i32, code_name: &str, message: &str) -> Self {
        if code == NOT_YET_INITIALIZED_CODE {
            AdminError::NotYetInitialized {
                message: message.to_string(),
            }
        } else {
            AdminError::Command {
                code,
                code_name: code_name.to_string(),
                message: message.to_string(),
            }
        }
    }
}

/// A failure that aborts the bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A member never answered `ping` within the host-wait budget.
    #[error("timed out waiting for {host} after {attempts} attempts")]
    HostTimeout { host: String, attempts: u32 },

    /// `replSetInitiate` failed. Never retried.
    #[error("replica set initiation failed: {message}")]
    InitiateFailed { message: String },

    /// Status never reported `ok: 1` within the poll budget.
    #[error("replica set did not report a healthy status after {attempts} polls")]
    PrimaryTimeout { attempts: u32 },
}

impl BootstrapError {
    /// Short stable name for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            BootstrapError::HostTimeout { .. } => "HostTimeout",
            BootstrapError::InitiateFailed { .. } => "InitiateFailed",
            BootstrapError::PrimaryTimeout { .. } => "PrimaryTimeout",
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether the failure came from an exhausted attempt budget.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            BootstrapError::HostTimeout { .. } | BootstrapError::PrimaryTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_not_yet_initialized() {
        let err =
            AdminError::from_code(94, "NotYetInitialized", "no replset config has been received");
        assert_eq!(
            err,
            AdminError::NotYetInitialized {
                message: "no replset config has been received".to_string()
            }
        );
    }

    #[test]
    fn test_from_code_other_command() {
        let err = AdminError::from_code(23, "AlreadyInitialized", "already initialized");
        assert!(matches!(err, AdminError::Command { code: 23, .. }));
        assert_eq!(
            err.to_string(),
            "command failed (AlreadyInitialized, code 23): already initialized"
        );
    }

    #[test]
    fn test_bootstrap_error_messages() {
        let err = BootstrapError::HostTimeout {
            host: "mongo-secondary2:27017".to_string(),
            attempts: 30,
        };
        assert_eq!(
            err.to_string(),
            "timed out waiting for mongo-secondary2:27017 after 30 attempts"
        );
        assert_eq!(err.code(), "HostTimeout");
        assert!(err.is_timeout());

        let err = BootstrapError::InitiateFailed {
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "replica set initiation failed: boom");
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_every_failure_exits_nonzero() {
        let errors = [
            BootstrapError::HostTimeout {
                host: "h:1".to_string(),
                attempts: 1,
            },
            BootstrapError::InitiateFailed {
                message: String::new(),
            },
            BootstrapError::PrimaryTimeout { attempts: 60 },
        ];
        for err in errors {
            assert_eq!(err.exit_code(), 1);
        }
    }
}
