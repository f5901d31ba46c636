//! Line-oriented interactive session over one store.
//!
//! # Responsibility
//! - Keep a single `TaskStore` alive so filter and selection carry across
//!   commands.
//! - Re-render after every command that changed store state.
//!
//! # Invariants
//! - A failing command prints a notice and the session continues.

use crate::commands::{execute, resolve_id, CliError, Session, TaskCommand};
use crate::render::render_list;
use clap::{Parser, Subcommand};
use log::debug;
use std::cell::Cell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use tasklist_core::KvRepository;

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand)]
enum ShellCommand {
    #[command(flatten)]
    Task(TaskCommand),
    /// Mark a task for bulk operations.
    Select { id: String },
    /// Unmark a task.
    Deselect { id: String },
    /// Mark every task in the current view.
    SelectAll,
    /// Unmark everything.
    ClearSelection,
    /// Leave the session.
    #[command(alias = "exit")]
    Quit,
}

/// Reads commands from `input` until EOF or `quit`.
pub fn run_shell<R: KvRepository>(
    session: &mut Session<R>,
    mut input: impl BufRead,
    out: &mut impl Write,
) -> io::Result<()> {
    let changed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&changed);
    session.store.subscribe(move |event| {
        debug!("event=store_notify module=cli status=ok detail={event:?}");
        flag.set(true);
    });

    render_list(out, &session.store, session.theme.load())?;
    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.is_empty() {
            continue;
        }

        let command = match ShellLine::try_parse_from(tokens) {
            Ok(parsed) => parsed.command,
            Err(err) => {
                write!(out, "{err}")?;
                continue;
            }
        };
        let force_render = matches!(
            command,
            ShellCommand::Task(TaskCommand::List { .. } | TaskCommand::Theme { .. })
        );

        let result = match command {
            ShellCommand::Quit => break,
            ShellCommand::Task(command) => execute(session, command, out),
            ShellCommand::Select { id } => {
                resolve_id(&session.store, &id).map(|id| {
                    session.store.select(&id);
                })
            }
            ShellCommand::Deselect { id } => {
                resolve_id(&session.store, &id).map(|id| {
                    session.store.deselect(&id);
                })
            }
            ShellCommand::SelectAll => {
                session.store.select_all();
                Ok(())
            }
            ShellCommand::ClearSelection => {
                session.store.clear_selection();
                Ok(())
            }
        };
        if let Err(err) = result {
            report(out, &err)?;
        }

        if changed.replace(false) || force_render {
            render_list(out, &session.store, session.theme.load())?;
        }
    }
    Ok(())
}

fn report(out: &mut impl Write, err: &CliError) -> io::Result<()> {
    writeln!(out, "error: {err}")
}
