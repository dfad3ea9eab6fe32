/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Installs a formatted `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive`. Returns false if a
/// global subscriber was already installed, in which case nothing changes.
pub fn init_logging(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging("info");
        assert!(!init_logging("debug"));
    }
}
