// Consistent exit codes for the revisit CLI.
//
//   0 = success
//   1 = general error
//   2 = usage/argument error
//   3 = position file unreadable or corrupt
//   4 = document not tracked

use std::process;

use revisit_common::path::PathError;
use revisit_tracker::StoreError;

use crate::commands::NotTracked;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Corrupt = 3,
    NotTracked = 4,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<NotTracked>().is_some() {
                return Self::NotTracked;
            }
            if cause.downcast_ref::<PathError>().is_some() {
                return Self::Usage;
            }
            if let Some(store_err) = cause.downcast_ref::<StoreError>() {
                return match store_err {
                    StoreError::Parse { .. } => Self::Corrupt,
                    _ => Self::Error,
                };
            }
        }
        Self::Error
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
