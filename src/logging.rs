use std::io;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `BFSTEP_LOG=bfstep::engine=trace`.
pub const LOG_ENV: &str = "BFSTEP_LOG";

/// Install the global stderr subscriber. Program output owns stdout, so logs
/// never go there. Safe to call more than once; later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .without_time()
        .try_init();
}
