use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use dotchat_cli::app::App;
use dotchat_cli::cli::Cli;
use dotchat_cli::config::{
    config_file_path, validate_invocation, EnvConfig, FileConfig, Settings,
};
use dotchat_cli::console::{Console, ProcessConsole};
use dotchat_cli::credentials::{resolve_api_key, CredentialStore};
use dotchat_cli::editor::resolve_editor_command;
use dotchat_cli::error::exit_code_for;
use dotchat_cli::output::resolve_pager_command;
use dotchat_cli::providers::provider_for_service;
use session_store::{format_listing, HistoryLedger};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DOTCHAT_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match main_impl(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(exit_code_for(&error))
        }
    }
}

fn main_impl(cli: Cli) -> Result<()> {
    let lookup = |key: &str| std::env::var(key).ok();
    let app_dir = session_store::app_dir()?;
    let env = EnvConfig::from_env();
    let file = match config_file_path(&cli, &env) {
        Some(path) => FileConfig::load(&path)?,
        None => FileConfig::default(),
    };
    let today = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date();
    let settings = Settings::resolve(&cli, file, &env, &app_dir, today)?;
    tracing::debug!(service = settings.service.as_str(), "settings resolved");

    let mut console = ProcessConsole::new(
        resolve_editor_command(lookup),
        resolve_pager_command(lookup),
    );

    if cli.history {
        let listing = HistoryLedger::new(&settings.history_file)
            .listing()
            .context("reading session history")?;
        return console.print(&format_listing(&listing)?);
    }

    let stdin_is_terminal = console.stdin_is_terminal();
    let assume = validate_invocation(
        cli.assume_yes,
        cli.assume_no,
        stdin_is_terminal,
        console.stdout_is_terminal(),
    )?;

    let api_key = if settings.service.requires_api_key() {
        let store = CredentialStore::in_app_dir(&app_dir);
        let mut prompt = |message: &str| console.prompt_line(message);
        let prompt: Option<&mut dyn FnMut(&str) -> Result<String>> = if stdin_is_terminal {
            Some(&mut prompt)
        } else {
            None
        };
        Some(resolve_api_key(settings.service, lookup, &store, prompt)?)
    } else {
        None
    };
    let provider = provider_for_service(&settings, api_key.as_deref())?;

    let working_dir = std::env::current_dir().context("reading current directory")?;
    let mut app = App::new(settings, assume, provider, console).with_working_dir(working_dir);
    app.run(cli.filename.as_deref())?;
    Ok(())
}
