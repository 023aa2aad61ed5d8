//! Shared, ambient building blocks used by both the `unklogd` daemon and the
//! `diagnostics` binary: process-wide logging setup and a small error-location
//! helper for disambiguating `thiserror` variants that can originate from more
//! than one call site.

pub mod error;
pub mod logging;

/// Expands to a version string combining the crate version with the git
/// describe output when available, for use in `#[clap(version = ...)]`.
#[macro_export]
macro_rules! version {
    () => {
        $crate::const_format::concatcp!(
            env!("CARGO_PKG_VERSION"),
            " (",
            $crate::git_version::git_version!(fallback = "unknown"),
            ")"
        )
    };
}

#[doc(hidden)]
pub use const_format;
#[doc(hidden)]
pub use git_version;
