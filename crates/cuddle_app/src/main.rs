use cuddle_app::app::run;
use cuddle_core::CuddleConfig;

fn main() {
    tracing_subscriber::fmt::init();
    let config = CuddleConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(%err, "ignoring invalid configuration");
        CuddleConfig::default()
    });
    let json = std::env::args().skip(1).any(|arg| arg == "--json");
    if let Err(err) = run(config, json) {
        eprintln!("Failed to start CuddlePix: {err:#}");
    }
}
