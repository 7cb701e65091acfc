use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Transport crates log every connection at debug; keep them quiet unless asked.
const TRANSPORT_DIRECTIVES: [&str; 2] = ["hyper_util=warn", "reqwest=warn"];

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(
                    f,
                    "invalid log level/filter '{}': unable to build EnvFilter",
                    value
                )
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// `override_directives` is the raw `RUST_LOG` value; when it parses, it wins.
fn build_filter(
    override_directives: Option<&str>,
    log_level: &str,
) -> Result<EnvFilter, TelemetryError> {
    if let Some(filter) = override_directives.and_then(|raw| EnvFilter::try_new(raw).ok()) {
        return Ok(filter);
    }

    let mut directives = vec![log_level.to_string()];
    directives.extend(TRANSPORT_DIRECTIVES.iter().map(|d| d.to_string()));

    EnvFilter::try_new(directives.join(",")).map_err(|source| TelemetryError::EnvFilter {
        value: log_level.to_string(),
        source,
    })
}

/// Installs the global subscriber on stderr so command output on stdout stays
/// machine-readable. `RUST_LOG` wins over the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(rust_log.as_deref(), &config.log_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
