use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable that overrides the `-v` derived filter.
pub const LOG_ENV: &str = "NATIVEKIT_LOG";

/// Filter directive for a `-v` count: none is silent, `-v` errors, `-vv`
/// warnings, `-vvv` progress, `-vvvv` and up everything.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "off",
        1 => "error",
        2 => "warn",
        3 => "info",
        _ => "debug",
    }
}

/// Installs the global stderr subscriber. Later calls are no-ops.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_ladder() {
        assert_eq!(level_for_verbosity(0), "off");
        assert_eq!(level_for_verbosity(1), "error");
        assert_eq!(level_for_verbosity(2), "warn");
        assert_eq!(level_for_verbosity(3), "info");
        assert_eq!(level_for_verbosity(4), "debug");
        assert_eq!(level_for_verbosity(9), "debug");
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(1);
        init_logging(4);
    }
}
