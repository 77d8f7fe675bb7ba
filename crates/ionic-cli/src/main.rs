mod cli;
mod commands;

use cli::{DumpParams, MacrosParams, build_cli};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "IONIC_LOG";

fn main() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("dump", m)) => {
            let params = DumpParams::from_matches(m);
            commands::dump::run(params.into());
        }
        Some(("macros", m)) => {
            let params = MacrosParams::from_matches(m);
            commands::macros::run(params.into());
        }
        _ => unreachable!("clap should have caught this"),
    }
}
