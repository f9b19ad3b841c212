pub mod config;
pub mod core_state; // Flow state, session token, run gate
pub mod diagnostic;
pub mod intake; // Input collection + validation
pub mod models;
pub mod orchestration; // Langflow client
pub mod progress; // Run driver + stage reveal
pub mod reconcile; // Response -> six stage slots
pub mod render; // Text, transcript, JSON/PDF export
pub mod run_gate;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the
/// default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
