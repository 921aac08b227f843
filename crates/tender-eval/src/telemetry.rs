use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    Directive { directive: String, source: ParseError },
    Init(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Directive { directive, .. } => {
                write!(f, "cannot build a log filter from '{directive}'")
            }
            TelemetryError::Init(err) => {
                write!(f, "log subscriber failed to install: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Directive { source, .. } => Some(source),
            TelemetryError::Init(err) => Some(&**err),
        }
    }
}

/// Directive scoping the configured level to the evaluation crates while
/// third-party dependencies stay at `warn`.
fn level_directive(config: &TelemetryConfig) -> String {
    format!(
        "warn,tender_eval={level},tender_eval_api={level}",
        level = config.log_level
    )
}

fn filter_from_directive(directive: String) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&directive)
        .map_err(|source| TelemetryError::Directive { directive, source })
}

/// Install the process-wide subscriber: compact single-line output, no ansi,
/// no targets. `RUST_LOG` overrides the configured level outright.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_from_directive(level_directive(config))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Init)
}
