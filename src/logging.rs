//! Inicialización de logs: `tracing-subscriber` a stderr, filtrado por
//! `RUST_LOG`. Los crates de librería usan `log`; sus registros entran por
//! el puente `tracing-log` que `init()` instala.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "info,qbwc_core=info,tower_http=info";

pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry().with(filter)
                                  .with(tracing_subscriber::fmt::layer().with_target(true)
                                                                        .with_writer(std::io::stderr))
                                  .init();
}
