//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered by `filter` (an `EnvFilter` directive
/// string such as `patient_dashboard_core=debug`).
///
/// Returns `false` when a global subscriber was already installed, either
/// by an earlier call or by the host application. Calling it again is
/// harmless.
pub fn init_logging(filter: &str) -> bool {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("invalid log filter {:?}: {}, falling back to info", filter, e);
        EnvFilter::new("info")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
