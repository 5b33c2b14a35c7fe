use std::env;
use tracing_subscriber::EnvFilter;

fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// `APODICTIC_LOG` wins over `-v` flags. Logs go to stderr so stdout only
/// carries the command report.
pub fn init(verbosity: u8) {
    let filter = match env::var("APODICTIC_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives.trim())
            .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(verbosity))),
        _ => EnvFilter::new(verbosity_filter(verbosity)),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
