//! Error codes shared by the server and its clients
//!
//! Codes are grouped by leading digit:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Ticket errors
//! - 6xxx: Catalog errors
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as a bare `u16` so clients can switch on the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (username/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Superuser required
    AdminRequired = 2003,
    /// Country is outside the user's grants
    CountryNotPermitted = 2010,

    // ==================== 4xxx: Ticket ====================
    /// Ticket not found (or not visible to the caller)
    TicketNotFound = 4001,
    /// Finished date precedes the reported date
    FinishedBeforeReported = 4002,
    /// Finished date precedes the deadline
    FinishedBeforeDeadline = 4003,
    /// External code is already used by another ticket
    ExternalCodeExists = 4004,
    /// Ticket has no original country to revert to
    NoOriginalCountry = 4005,

    // ==================== 6xxx: Catalog ====================
    /// Country not found
    CountryNotFound = 6001,
    /// Country name already exists
    CountryNameExists = 6002,
    /// Device not found
    DeviceNotFound = 6101,
    /// Device name already exists
    DeviceNameExists = 6102,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,
    /// Username already exists
    UsernameExists = 8002,
    /// User already holds this country grant
    PermissionGrantExists = 8003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field missing",
            ErrorCode::ValueOutOfRange => "Value out of range",

            // Auth
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::InvalidCredentials => "Invalid username or password",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Invalid token",
            ErrorCode::AccountDisabled => "Account is disabled",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Superuser access required",
            ErrorCode::CountryNotPermitted => "Country is not permitted for this user",

            // Ticket
            ErrorCode::TicketNotFound => "Ticket not found",
            ErrorCode::FinishedBeforeReported => {
                "Finished date cannot be earlier than the reported date"
            }
            ErrorCode::FinishedBeforeDeadline => {
                "Finished date cannot be earlier than the deadline"
            }
            ErrorCode::ExternalCodeExists => "External code already exists",
            ErrorCode::NoOriginalCountry => "Ticket has no original country",

            // Catalog
            ErrorCode::CountryNotFound => "Country not found",
            ErrorCode::CountryNameExists => "Country name already exists",
            ErrorCode::DeviceNotFound => "Device not found",
            ErrorCode::DeviceNameExists => "Device name already exists",

            // User
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::UsernameExists => "Username already exists",
            ErrorCode::PermissionGrantExists => "Country permission already granted",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1007 => Ok(ErrorCode::AccountDisabled),

            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),
            2010 => Ok(ErrorCode::CountryNotPermitted),

            4001 => Ok(ErrorCode::TicketNotFound),
            4002 => Ok(ErrorCode::FinishedBeforeReported),
            4003 => Ok(ErrorCode::FinishedBeforeDeadline),
            4004 => Ok(ErrorCode::ExternalCodeExists),
            4005 => Ok(ErrorCode::NoOriginalCountry),

            6001 => Ok(ErrorCode::CountryNotFound),
            6002 => Ok(ErrorCode::CountryNameExists),
            6101 => Ok(ErrorCode::DeviceNotFound),
            6102 => Ok(ErrorCode::DeviceNameExists),

            8001 => Ok(ErrorCode::UserNotFound),
            8002 => Ok(ErrorCode::UsernameExists),
            8003 => Ok(ErrorCode::PermissionGrantExists),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ErrorCode] = &[
        ErrorCode::Success,
        ErrorCode::Unknown,
        ErrorCode::ValidationFailed,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::InvalidRequest,
        ErrorCode::InvalidFormat,
        ErrorCode::RequiredField,
        ErrorCode::ValueOutOfRange,
        ErrorCode::NotAuthenticated,
        ErrorCode::InvalidCredentials,
        ErrorCode::TokenExpired,
        ErrorCode::TokenInvalid,
        ErrorCode::AccountDisabled,
        ErrorCode::PermissionDenied,
        ErrorCode::AdminRequired,
        ErrorCode::CountryNotPermitted,
        ErrorCode::TicketNotFound,
        ErrorCode::FinishedBeforeReported,
        ErrorCode::FinishedBeforeDeadline,
        ErrorCode::ExternalCodeExists,
        ErrorCode::NoOriginalCountry,
        ErrorCode::CountryNotFound,
        ErrorCode::CountryNameExists,
        ErrorCode::DeviceNotFound,
        ErrorCode::DeviceNameExists,
        ErrorCode::UserNotFound,
        ErrorCode::UsernameExists,
        ErrorCode::PermissionGrantExists,
        ErrorCode::InternalError,
        ErrorCode::DatabaseError,
        ErrorCode::ConfigError,
    ];

    #[test]
    fn every_code_parses_back_from_its_number() {
        for code in ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
        }
    }

    #[test]
    fn ticket_codes_live_in_4xxx() {
        assert_eq!(ErrorCode::TicketNotFound.code(), 4001);
        assert_eq!(ErrorCode::FinishedBeforeReported.code(), 4002);
        assert_eq!(ErrorCode::FinishedBeforeDeadline.code(), 4003);
        assert_eq!(ErrorCode::ExternalCodeExists.code(), 4004);
        assert_eq!(ErrorCode::NoOriginalCountry.code(), 4005);
    }

    #[test]
    fn unknown_numbers_are_rejected() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
        assert!(serde_json::from_str::<ErrorCode>("10000").is_err());
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::ExternalCodeExists).unwrap(),
            "4004"
        );
        let parsed: ErrorCode = serde_json::from_str("6002").unwrap();
        assert_eq!(parsed, ErrorCode::CountryNameExists);
    }

    #[test]
    fn display_and_message() {
        assert_eq!(ErrorCode::InternalError.to_string(), "9001");
        assert_eq!(ErrorCode::TicketNotFound.message(), "Ticket not found");
        assert_eq!(
            InvalidErrorCode(42).to_string(),
            "invalid error code: 42"
        );
    }
}
