//! Tracing setup shared by the host and the peer.
//!
//! `RUST_LOG` wins when set. Otherwise `NUMDUEL_LOG` picks the level for this
//! crate (`debug`, `warn`, `error`, default `info`). `LOG_FORMAT=json` switches
//! to JSON lines. Output always goes to stderr: the peer's stdout carries
//! control frames and the host's carries the summary.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn level_from_env(value: Option<&str>) -> &'static str {
    match value {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") => "error",
        _ => "info",
    }
}

fn env_filter() -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    let level = level_from_env(std::env::var("NUMDUEL_LOG").ok().as_deref());
    EnvFilter::new(format!("numduel={level}"))
}

/// Install the global subscriber. Later calls are no-ops.
///
/// Host and peer share one stderr, so lines are told apart by the `side`
/// span `main` opens around each process rather than by module target.
/// JSON lines carry that span as `span`.
pub fn init_tracing() {
    let registry = tracing_subscriber::registry().with(env_filter());
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let _ = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry
            .with(layer.json().with_current_span(true).with_span_list(false))
            .try_init()
    } else {
        registry.with(layer).try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(level_from_env(None), "info");
        assert_eq!(level_from_env(Some("warning")), "warn");
        assert_eq!(level_from_env(Some("debug")), "debug");
        assert_eq!(level_from_env(Some("loud")), "info");
    }
}
