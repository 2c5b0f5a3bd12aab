use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use tracing_subscriber::Registry;

use crate::LoggingConfig;

/// Build (but do not install) a subscriber from `config`. The embedding
/// binary decides when and whether to call `.init()`/`.try_init()`,
/// mirroring the teacher's own top-level composition of
/// `tracing_subscriber::registry()` layers rather than a library crate
/// installing global state on its own.
pub fn init_tracing(
    config: &LoggingConfig,
) -> anyhow::Result<Box<dyn tracing::Subscriber + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = Registry::default().with(filter);

    if let Some(path) = &config.file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Box::new(subscriber.with(
            fmt::layer().with_target(true).with_ansi(false).with_writer(file),
        )))
    } else {
        Ok(Box::new(subscriber.with(fmt::layer().with_target(true))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_subscriber_without_installing_it() {
        let config = LoggingConfig::default();
        assert!(init_tracing(&config).is_ok());
    }

    #[test]
    fn builds_file_backed_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatter.log");
        let config = LoggingConfig {
            level: "debug".into(),
            file: Some(path.to_string_lossy().into_owned()),
        };
        assert!(init_tracing(&config).is_ok());
    }
}
