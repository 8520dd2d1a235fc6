//! # Error Classifier
//!
//! Maps a failed remote call onto the gateway's error taxonomy:
//!
//! | Remote failure                                   | Kind            | Status |
//! |--------------------------------------------------|-----------------|--------|
//! | `InvalidArgument`, `Unauthenticated`, or the     | Unauthenticated | 401    |
//! | backend's "incorrect data received" sentinel     |                 |        |
//! | `NotFound`, or the "data not found" sentinel     | NotFound        | 404    |
//! | anything else                                    | Internal        | 500    |
//!
//! The user service reports its domain errors as plain status messages in some paths
//! (status code `Unknown`), so the sentinel text is checked after the code.
//!
//! Classification is pure. Callers log the status detail; only the operation's caller-safe
//! message ends up in the response.

use tonic::{Code, Status};

use crate::core::error::{ErrorKind, GatewayError};

/// Backend message for rejected or expired data (tokens, credentials)
pub const INCORRECT_DATA_SENTINEL: &str = "incorrect data received";

/// Backend message for a missing entity
pub const DATA_NOT_FOUND_SENTINEL: &str = "data not found";

/// Caller-facing wording for one remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// Short name used in logs, e.g. "create user"
    pub name: &'static str,
    /// Message for Unauthenticated failures
    pub rejected: &'static str,
    /// Message for NotFound failures
    pub not_found: &'static str,
    /// Message for Internal failures
    pub failed: &'static str,
}

impl Operation {
    pub const AUTHENTICATE: Operation = Operation {
        name: "authenticate user",
        rejected: "Unauthorized",
        not_found: "User not found",
        failed: "Internal server error",
    };
    pub const CREATE_USER: Operation = Operation {
        name: "create user",
        rejected: "Invalid user details",
        not_found: "User not found",
        failed: "Failed to create user",
    };
    pub const LOGIN_USER: Operation = Operation {
        name: "login user",
        rejected: "Invalid email or password",
        not_found: "User not found",
        failed: "Failed to login user",
    };
    pub const VERIFY_USER: Operation = Operation {
        name: "verify user",
        rejected: "Token is expired",
        not_found: "User not found or invalid token",
        failed: "Failed to verify user",
    };
    pub const SEND_VERIFICATION: Operation = Operation {
        name: "send verification",
        rejected: "Unauthorized",
        not_found: "User not found",
        failed: "Failed to send verification to user",
    };
    pub const UPDATE_ROLE: Operation = Operation {
        name: "update user role",
        rejected: "Unauthorized",
        not_found: "User or role not found",
        failed: "Failed to update user role",
    };
    pub const RESET_PASSWORD: Operation = Operation {
        name: "reset user password",
        rejected: "Invalid email",
        not_found: "User not found",
        failed: "Failed to reset user password",
    };
    pub const UPDATE_PASSWORD: Operation = Operation {
        name: "update user password",
        rejected: "Token is expired",
        not_found: "User not found or invalid token",
        failed: "Failed to update user password",
    };
    pub const ADD_EDITOR: Operation = Operation {
        name: "add editor user",
        rejected: "Token is expired",
        not_found: "User not found or invalid token",
        failed: "Failed to add editor user",
    };
    pub const SEND_EDITOR_INVITE: Operation = Operation {
        name: "send editor invite",
        rejected: "Unauthorized",
        not_found: "User not found",
        failed: "Failed to send editor invite",
    };

    /// Message shown to the caller for a failure of the given kind
    pub fn message_for(&self, kind: ErrorKind) -> &'static str {
        match kind {
            ErrorKind::Unauthenticated => self.rejected,
            ErrorKind::NotFound => self.not_found,
            ErrorKind::InvalidInput | ErrorKind::Internal => self.failed,
        }
    }
}

/// Decide which kind a remote failure belongs to
pub fn classify_status(status: &Status) -> ErrorKind {
    match status.code() {
        Code::InvalidArgument | Code::Unauthenticated => ErrorKind::Unauthenticated,
        Code::NotFound => ErrorKind::NotFound,
        _ => classify_message(status.message()),
    }
}

fn classify_message(message: &str) -> ErrorKind {
    let message = message.to_ascii_lowercase();
    if message.contains(INCORRECT_DATA_SENTINEL) {
        ErrorKind::Unauthenticated
    } else if message.contains(DATA_NOT_FOUND_SENTINEL) {
        ErrorKind::NotFound
    } else {
        ErrorKind::Internal
    }
}

/// Turn a remote failure into the error returned to the caller
pub fn classify(operation: &Operation, status: &Status) -> GatewayError {
    let kind = classify_status(status);
    GatewayError::of_kind(kind, operation.message_for(kind))
}

/// Error for a remote call that did not finish within its deadline
pub fn deadline_exceeded(operation: &Operation) -> GatewayError {
    GatewayError::internal(operation.failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_map_to_kinds() {
        let cases = [
            (Code::InvalidArgument, ErrorKind::Unauthenticated),
            (Code::Unauthenticated, ErrorKind::Unauthenticated),
            (Code::NotFound, ErrorKind::NotFound),
            (Code::Unavailable, ErrorKind::Internal),
            (Code::DeadlineExceeded, ErrorKind::Internal),
            (Code::Cancelled, ErrorKind::Internal),
            (Code::Internal, ErrorKind::Internal),
            (Code::PermissionDenied, ErrorKind::Internal),
            (Code::AlreadyExists, ErrorKind::Internal),
        ];

        for (code, expected) in cases {
            assert_eq!(
                classify_status(&Status::new(code, "detail")),
                expected,
                "code {:?}",
                code
            );
        }
    }

    #[test]
    fn test_sentinel_messages_are_recognized() {
        assert_eq!(
            classify_status(&Status::unknown("Incorrect data received")),
            ErrorKind::Unauthenticated
        );
        assert_eq!(
            classify_status(&Status::unknown("rpc error: data not found")),
            ErrorKind::NotFound
        );
        assert_eq!(
            classify_status(&Status::unknown("connection reset by peer")),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_code_takes_precedence_over_message() {
        assert_eq!(
            classify_status(&Status::not_found("incorrect data received")),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_classify_never_leaks_backend_detail() {
        let status = Status::internal("pq: relation \"users\" does not exist");
        let error = classify(&Operation::CREATE_USER, &status);

        assert_eq!(error, GatewayError::internal("Failed to create user"));
        assert!(!error.message().contains("users"));
    }

    #[test]
    fn test_operation_messages() {
        assert_eq!(
            classify(&Operation::VERIFY_USER, &Status::invalid_argument("expired")),
            GatewayError::unauthenticated("Token is expired")
        );
        assert_eq!(
            classify(&Operation::VERIFY_USER, &Status::not_found("no row")),
            GatewayError::not_found("User not found or invalid token")
        );
        assert_eq!(
            deadline_exceeded(&Operation::LOGIN_USER),
            GatewayError::internal("Failed to login user")
        );
    }
}
