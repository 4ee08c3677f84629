//! Process exit codes
//!
//! Scripts rely on these values, so they must stay stable across releases.

use dk_core::Error;

/// Exit codes returned by `dk`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// Unclassified failure
    GeneralError = 1,
    /// Bad arguments or configuration
    UsageError = 2,
    /// Storage service or network failure
    NetworkError = 3,
    /// Missing API key or rejected credentials
    AuthError = 4,
    /// File or object does not exist
    NotFound = 5,
    /// Cancelled by Ctrl-C
    Interrupted = 130,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Classify a library error
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::InvalidArgument(_) | Error::Config(_) | Error::Toml(_) => ExitCode::UsageError,
            Error::Unauthorized(_) => ExitCode::AuthError,
            Error::SessionOpenFailed(_)
            | Error::PartUploadFailed { .. }
            | Error::MultipartUploadFailed { .. }
            | Error::CommitFailed(_)
            | Error::Network(_) => ExitCode::NetworkError,
            Error::Cancelled { .. } => ExitCode::Interrupted,
            Error::NotFound(_) => ExitCode::NotFound,
            Error::Io(_) | Error::Json(_) | Error::General(_) => ExitCode::GeneralError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::UsageError.as_i32(), 2);
        assert_eq!(ExitCode::AuthError.as_i32(), 4);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_from_error() {
        assert_eq!(
            ExitCode::from_error(&Error::Unauthorized("no key".into())),
            ExitCode::AuthError
        );
        assert_eq!(
            ExitCode::from_error(&Error::Cancelled { aborted: true }),
            ExitCode::Interrupted
        );
        assert_eq!(
            ExitCode::from_error(&Error::PartUploadFailed {
                part_number: 2,
                cause: "reset".into()
            }),
            ExitCode::NetworkError
        );
        assert_eq!(
            ExitCode::from_error(&Error::InvalidArgument("bad".into())),
            ExitCode::UsageError
        );
        assert_eq!(
            ExitCode::from_error(&Error::NotFound("a.bin".into())),
            ExitCode::NotFound
        );
    }
}
