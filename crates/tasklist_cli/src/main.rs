//! `tasklist` command-line front end.
//!
//! # Responsibility
//! - Resolve storage and logging locations from flags and environment.
//! - Dispatch one command (or an interactive session) to the core store,
//!   then re-render the filtered view.

mod commands;
mod render;
mod shell;

use clap::{Parser, Subcommand};
use commands::{execute, CliError, Session, TaskCommand};
use log::info;
use render::render_list;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tasklist_core::db::open_db;
use tasklist_core::{default_log_level, init_logging, SqliteKvRepository, StoreConfig};

const DB_FILE_NAME: &str = "tasklist.sqlite3";
const ENV_DB_PATH: &str = "TASKLIST_DB_PATH";
const ENV_LOG_DIR: &str = "TASKLIST_LOG_DIR";

#[derive(Debug, Parser)]
#[command(name = "tasklist", version, about = "Local-first task list")]
struct Cli {
    /// SQLite file holding tasks [env: TASKLIST_DB_PATH].
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Directory for rolling log files [env: TASKLIST_LOG_DIR].
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    #[command(flatten)]
    Task(TaskCommand),
    /// Interactive session; selection and filter live until exit.
    Shell,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = resolve_log_dir(cli.log_dir.clone()) {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, &log_dir) {
            eprintln!("warning: {err}");
        }
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let db_path = resolve_db_path(cli.db);
    let conn = open_db(&db_path)?;
    let config = StoreConfig::from_env();
    let repo = SqliteKvRepository::new(&conn).with_quota(config.quota_bytes);
    let mut session = Session::open(&repo, config);
    info!(
        "event=cli_start module=cli status=ok tasks={}",
        session.store.len()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Some(CliCommand::Shell) => {
            shell::run_shell(&mut session, io::stdin().lock(), &mut out)?;
        }
        Some(CliCommand::Task(command)) => {
            let renders = !matches!(
                command,
                TaskCommand::Export { output: None } | TaskCommand::Theme { .. }
            );
            execute(&mut session, command, &mut out)?;
            if renders {
                render_list(&mut out, &session.store, session.theme.load())?;
            }
        }
        None => render_list(&mut out, &session.store, session.theme.load())?,
    }
    out.flush()?;
    Ok(())
}

fn resolve_db_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| non_empty_env(ENV_DB_PATH).map(PathBuf::from))
        .unwrap_or_else(|| std::env::temp_dir().join(DB_FILE_NAME))
}

fn resolve_log_dir(flag: Option<PathBuf>) -> Option<PathBuf> {
    let dir = flag.or_else(|| non_empty_env(ENV_LOG_DIR).map(PathBuf::from))?;
    if dir.is_absolute() {
        return Some(dir);
    }
    std::env::current_dir().ok().map(|cwd| cwd.join(dir))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{resolve_db_path, resolve_log_dir, Cli, CliCommand};
    use crate::commands::TaskCommand;
    use clap::Parser;
    use std::path::PathBuf;
    use tasklist_core::{Filter, Priority};

    #[test]
    fn explicit_paths_win() {
        let path = PathBuf::from("/tmp/explicit.sqlite3");
        assert_eq!(resolve_db_path(Some(path.clone())), path);
        assert_eq!(
            resolve_log_dir(Some(PathBuf::from("/var/log/tasklist"))),
            Some(PathBuf::from("/var/log/tasklist"))
        );
    }

    #[test]
    fn relative_log_dir_is_made_absolute() {
        let resolved = resolve_log_dir(Some(PathBuf::from("logs"))).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("logs"));
    }

    #[test]
    fn parses_add_with_priority_and_global_db_flag() {
        let cli = Cli::try_parse_from([
            "tasklist", "add", "--priority", "high", "file", "taxes", "--db", "/tmp/x.db",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        match cli.command {
            Some(CliCommand::Task(TaskCommand::Add { priority, text })) => {
                assert_eq!(priority, Some(Priority::High));
                assert_eq!(text, vec!["file", "taxes"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_list_filter_and_rejects_unknown_filter() {
        let cli = Cli::try_parse_from(["tasklist", "ls", "--filter", "completed"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(CliCommand::Task(TaskCommand::List {
                filter: Some(Filter::Completed)
            }))
        ));
        assert!(Cli::try_parse_from(["tasklist", "list", "--filter", "someday"]).is_err());
    }

    #[test]
    fn no_subcommand_means_list() {
        let cli = Cli::try_parse_from(["tasklist"]).unwrap();
        assert!(cli.command.is_none());
    }
}
