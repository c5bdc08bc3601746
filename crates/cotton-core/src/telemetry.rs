//! Tracing initialisation shared by the `cotton` and `cottond` binaries.

use tracing::Level;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Dependencies that log per request or per query at `debug`.
const QUIET_TARGETS: [&str; 5] = ["surrealdb", "surrealkv", "hyper", "reqwest", "tower_http"];

/// Default filter when `RUST_LOG` is unset.
///
/// Cotton crates log at `level`. The storage engine and HTTP stacks are
/// capped at `warn`, unless `level` is `trace`, in which case everything is
/// traced.
pub fn default_directives(level: Level) -> String {
    let base = level.as_str().to_ascii_lowercase();
    if level == Level::TRACE {
        return base;
    }
    let mut directives = vec![base];
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));
    directives.join(",")
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over [`default_directives`] when set. With `json` the
/// output is newline-delimited JSON without targets; text output keeps the
/// target so collector and capture logs can be told apart. Only the first
/// call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let layer = if json {
        fmt::layer().with_target(false).json().boxed()
    } else {
        fmt::layer().with_target(true).compact().boxed()
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Map the CLI `--verbose` flag to a default level.
pub fn level_for(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::DEBUG);
    }

    #[test]
    fn test_default_directives_quiet_dependencies() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("surrealdb=warn"));
        assert!(directives.contains("hyper=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_default_directives_trace_is_unfiltered() {
        assert_eq!(default_directives(Level::TRACE), "trace");
    }

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(true), Level::DEBUG);
        assert_eq!(level_for(false), Level::INFO);
    }
}
