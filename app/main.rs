mod cli;
mod config;
mod errors;
mod util;

use clap::Parser;
use cli::AppCli;
use config::AppConfig;
use rtmp_server::{RtmpServer, RtmpServerConfig};
use time::macros::format_description;
use tokio::signal;
use tracing::{self, Dispatch};
use tracing_subscriber::{self, EnvFilter, fmt::time::LocalTime};
use util::parse_log_level;

#[tokio::main]
async fn main() {
    let cli_args = AppCli::parse();
    let mut app_config = AppConfig::new(cli_args.config.as_ref().map(|p| p.display().to_string()))
        .expect("failed to load configuration");
    app_config
        .apply(cli_args)
        .expect("failed to apply cli overrides");
    app_config.validate().expect("invalid configuration");

    let log_level = parse_log_level(&app_config.logger.level).unwrap();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_timer(LocalTime::new(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second] [unix_timestamp precision:nanosecond]"
        )))
        // Use a more compact, abbreviated log format
        .compact()
        // Display source code file paths
        .with_file(true)
        // Display source code line numbers
        .with_line_number(true)
        // Display the thread name an event was recorded on
        .with_thread_names(true)
        // display the event's target (module path)
        .with_target(true)
        .with_env_filter(EnvFilter::from_env("LOG_LEVEL"))
        // Build the subscriber
        .finish();
    tracing::dispatcher::set_global_default(Dispatch::new(subscriber)).unwrap();

    tracing::debug!("running");

    if app_config.rtmp_server.enable {
        let rtmp_server_config = RtmpServerConfig {
            address: app_config.rtmp_server.address,
            port: app_config.rtmp_server.port,
            session: app_config.rtmp_server.session,
        };
        let rtmp_server = RtmpServer::new(rtmp_server_config);
        tokio::spawn(async move {
            if let Err(e) = rtmp_server.run().await {
                tracing::error!(error = %e, "rtmp server stopped");
            }
        });
    }

    let _ = signal::ctrl_c().await;
}
