//! Where the vendor library is found

use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable that overrides [ShimConfig::library_path]
pub const LIBRARY_ENV_VAR: &str = "SIMCAN_LIBRARY";

/// Shim configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    /// Path or bare file name of the SimCAN library. Bare names go through
    /// the platform's normal library search.
    pub library_path: PathBuf,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from(default_library_name()),
        }
    }
}

impl ShimConfig {
    /// Config that loads the library at `path`
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: path.into(),
        }
    }

    /// Default config, with [LIBRARY_ENV_VAR] taking precedence when set
    pub fn from_env() -> Self {
        Self::from_override(std::env::var_os(LIBRARY_ENV_VAR))
    }

    fn from_override(value: Option<OsString>) -> Self {
        match value {
            Some(p) if !p.is_empty() => {
                log::debug!("Using SimCAN library from {LIBRARY_ENV_VAR}: {p:?}");
                Self::with_library_path(p)
            }
            _ => Self::default(),
        }
    }
}

/// `SimCan.dll` on Windows, `libSimCan.so` / `libSimCan.dylib` elsewhere
pub fn default_library_name() -> OsString {
    libloading::library_filename("SimCan")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name() {
        let name = default_library_name();
        if cfg!(windows) {
            assert_eq!(name, "SimCan.dll");
        } else if cfg!(target_os = "macos") {
            assert_eq!(name, "libSimCan.dylib");
        } else {
            assert_eq!(name, "libSimCan.so");
        }
        assert_eq!(ShimConfig::default().library_path, PathBuf::from(name));
    }

    #[test]
    fn override_rules() {
        assert_eq!(ShimConfig::from_override(None), ShimConfig::default());
        assert_eq!(
            ShimConfig::from_override(Some(OsString::new())),
            ShimConfig::default()
        );
        assert_eq!(
            ShimConfig::from_override(Some("/opt/simcan/libSimCan.so".into())).library_path,
            PathBuf::from("/opt/simcan/libSimCan.so")
        );
    }
}
