mod app;
mod chat;
mod cli;
mod commands;
mod config;
mod conversation;
mod core;
mod display;
mod input;
mod providers;
mod store;

use crate::app::Application;
use crate::chat::{ChatDispatcher, ChatSession, session::apply_preferences};
use crate::cli::Args;
use crate::commands::{ChatState, create_command_registry};
use crate::config::Config;
use crate::core::error::ChatError;
use crate::store::SecureStore;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type LogHandle = reload::Handle<EnvFilter, Registry>;

/// Installs the subscriber before anything can log. `RUST_LOG` wins; otherwise
/// `warn` until the config file supplies its own level.
fn init_logging() -> LogHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (filter, handle) = reload::Layer::new(filter);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();

    handle
}

fn apply_log_level(handle: &LogHandle, level: &str) {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return;
    }
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                debug!(error = %e, "could not apply configured log level");
            }
        }
        Err(e) => warn!(value = level, error = %e, "ignoring invalid log_level in config"),
    }
}

async fn run() -> Result<(), ChatError> {
    let args = Args::parse();

    let log_handle = init_logging();
    let mut config = Config::load()?;
    apply_log_level(&log_handle, &config.log_level);

    let store = SecureStore::open_default()?;
    apply_preferences(&mut config, &store);
    args.apply_to(&mut config);
    debug!(provider = ?config.provider, model = %config.model, "starting");

    let dispatcher = ChatDispatcher::from_config(&config, store)?;
    let state = ChatState::new(ChatSession::new(dispatcher));

    let mut app = Application::new(args, state, create_command_registry());
    app.run().await
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        display::display_error(&e);
        std::process::exit(1);
    }
}
