//! Shared setup for the command-line tools.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

// ============================================================================
// Functions
// ============================================================================

/// Initializes tracing. `RUST_LOG` overrides the default filter.
pub fn init_logging(debug: bool) {
    let default = if debug {
        "maicraft_link=debug"
    } else {
        "maicraft_link=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Resolves the project root, defaulting to the current directory.
pub fn project_root(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| PathBuf::from("."))
}
