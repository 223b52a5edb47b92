//! Process-wide `tracing` subscriber for the relay.
//!
//! Quiz events are logged under the `quiz` target. Startup, configuration
//! and upstream plumbing use `quizrelay_backend`. `LOG_LEVEL` takes any
//! `EnvFilter` directive string and replaces [`DEFAULT_FILTER`] wholesale.
//! `LOG_FORMAT=json` emits one JSON object per event for log shippers;
//! anything else keeps the human-readable format.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,quiz=debug,quizrelay_backend=debug,tower_http=info,axum=info";

fn wants_json(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let format = std::env::var("LOG_FORMAT").ok();
    if wants_json(format.as_deref()) {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
