//! Log output for the `medsafe` binary.
//!
//! stdout carries the run and results reports, which users redirect or diff
//! between runs, so every log line is written to stderr instead.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const HARNESS_CRATES: [&str; 3] = ["medsafe_core", "medsafe_pipeline", "medsafe"];

/// Filter used when `RUST_LOG` is unset: harness crates at `level`, everything
/// else at `warn`.
fn default_directives(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(HARNESS_CRATES.iter().map(|krate| format!("{krate}={level}")));
    directives.join(",")
}

/// Install the process-wide subscriber.
///
/// With `json`, stage events become one JSON object per line, suitable for
/// collecting alongside a batch of runs. A second call leaves the first
/// subscriber in place.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_quiet_dependencies() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,medsafe_core=DEBUG,medsafe_pipeline=DEBUG,medsafe=DEBUG"
        );
        assert!(EnvFilter::try_new(default_directives(Level::INFO)).is_ok());
    }

    #[test]
    fn second_init_is_ignored() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
