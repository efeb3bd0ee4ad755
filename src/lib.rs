#![warn(
    missing_docs,
    missing_debug_implementations,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications,
    clippy::uninlined_format_args
)]

//! A lazy-binding C ABI shim over the SimCAN vendor CAN interface.
//!
//! The crate builds a dynamic library exporting the classic SimCAN user API
//! (`CanOpen`, `CanClose`, `CanSend`, `CanReceive`, remote reply management,
//! statistics, properties, timestamps, device handle and remote frame
//! callback registration). The actual work happens in the vendor's
//! `SimCan` library, which is loaded the first time it is needed. Each
//! vendor entry point is looked up by name on first call and cached from
//! then on.
//!
//! ## Layers
//!
//! * [api::SimCanApi] mirrors the vendor ABI, one method per entry point
//! * [library::SimCanLibrary] implements it by dynamic loading
//! * [simulation::SimulatedSimCan] implements it in memory, for testing
//! * [shim::SimCanShim] is the context object holding the "initialized"
//!   state, parsing net names and refusing calls before initialization
//! * [ffi] exports the C functions over a process wide [shim::SimCanShim]
//!
//! ## Errors
//!
//! Failures are reported the Windows way: a sentinel return value plus the
//! platform last error (see [last_error]). SimCAN specific codes and their
//! descriptions live in [error_codes].

use std::path::PathBuf;

pub mod api;
pub mod binding;
pub mod config;
pub mod error_codes;
pub mod ffi;
pub mod last_error;
pub mod library;
pub mod net_name;
pub mod shim;
pub mod simulation;
pub mod types;

pub use api::SimCanApi;
pub use config::ShimConfig;
pub use library::SimCanLibrary;
pub use shim::SimCanShim;

use binding::EntryPoint;
use error_codes::CanErrorCode;
use last_error::ERROR_BAD_ARGUMENTS;

/// Shim result
pub type ShimResult<T> = Result<T, ShimError>;

#[derive(Debug, thiserror::Error)]
/// Failures of the shim itself. Vendor failures are not errors at this
/// level, they come back as the vendor's own return value.
pub enum ShimError {
    /// The vendor library could not be loaded
    #[error("Failed to load {}: {source}", path.display())]
    LibraryLoad {
        /// Path that was tried
        path: PathBuf,
        /// Platform error code
        code: u32,
        /// Loader error
        #[source]
        source: libloading::Error,
    },
    /// The vendor library does not export an entry point
    #[error("Failed to retrieve address of {symbol}: {source}")]
    SymbolNotFound {
        /// Entry point that was looked up
        symbol: EntryPoint,
        /// Platform error code
        code: u32,
        /// Loader error
        #[source]
        source: libloading::Error,
    },
    /// Called before the vendor was initialized
    #[error("SimCAN is not initialized")]
    NotInitialized,
    /// Net name is not of the form `CAN<n>`
    #[error("Invalid net name '{0}'")]
    InvalidNetName(String),
    /// `SimCanInit` failed
    #[error("SimCAN initialization failed with code 0x{code:04X}: {}", error_codes::can_error_msg(*code))]
    InitFailed {
        /// Error code left by the vendor
        code: u32,
    },
}

impl ShimError {
    /// Platform error code to report through the last error
    pub fn code(&self) -> u32 {
        match self {
            ShimError::LibraryLoad { code, .. } => *code,
            ShimError::SymbolNotFound { code, .. } => *code,
            ShimError::NotInitialized => CanErrorCode::NotInitialized as u32,
            ShimError::InvalidNetName(_) => ERROR_BAD_ARGUMENTS,
            ShimError::InitFailed { code } => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(ShimError::NotInitialized.code(), 0x1F0F);
        assert_eq!(ShimError::InvalidNetName("CA".into()).code(), 160);
        assert_eq!(ShimError::InitFailed { code: 0x1F15 }.code(), 0x1F15);
    }

    #[test]
    fn display() {
        assert_eq!(
            ShimError::InvalidNetName("X".into()).to_string(),
            "Invalid net name 'X'"
        );
        assert_eq!(
            ShimError::InitFailed { code: 0x1F15 }.to_string(),
            "SimCAN initialization failed with code 0x1F15: Failed to validate license."
        );
    }
}
