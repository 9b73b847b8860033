//! Interactive list browsing.
//!
//! Reads one command per line and re-renders the list after each one.
//! Every command counts as session activity; an idle logout ends the loop.

use std::io::Write;
use std::str::FromStr;

use carehub_client::list::{ListController, ListStatus};
use carehub_client::session::{LogoutReason, SessionContext, SessionEvent};
use carehub_core::resources::Resource;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;

use crate::render;

pub const HELP: &str = "\
Commands:
  n, next            next page
  p, prev            previous page
  g, page <n>        jump to page n
  f <key>=<value>    edit a draft filter (empty value clears it)
  a, apply           apply draft filters
  c, clear           clear all filters
  r, retry           fetch the current page again
  h, help            show this help
  q, quit            leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseCommand {
    Next,
    Prev,
    Page(u32),
    Filter { key: String, value: String },
    Apply,
    Clear,
    Retry,
    Help,
    Quit,
}

impl FromStr for BrowseCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match word {
            "n" | "next" => Ok(Self::Next),
            "p" | "prev" => Ok(Self::Prev),
            "g" | "page" => rest
                .parse()
                .map(Self::Page)
                .map_err(|_| format!("Expected a page number, got '{rest}'")),
            "f" | "filter" => match rest.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => Ok(Self::Filter {
                    key: key.trim().to_string(),
                    value: value.to_string(),
                }),
                _ => Err(format!("Expected key=value, got '{rest}'")),
            },
            "a" | "apply" => Ok(Self::Apply),
            "c" | "clear" => Ok(Self::Clear),
            "r" | "retry" => Ok(Self::Retry),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            _ => Err(format!("Unknown command '{word}'. Type `h` for help.")),
        }
    }
}

/// Run one command against the list. Returns `false` to stop.
async fn execute<W: Write>(
    command: BrowseCommand,
    list: &ListController<Value>,
    out: &mut W,
) -> std::io::Result<bool> {
    match command {
        BrowseCommand::Next => {
            if !list.next_page().await {
                writeln!(out, "No next page.")?;
            }
        }
        BrowseCommand::Prev => {
            if !list.prev_page().await {
                writeln!(out, "No previous page.")?;
            }
        }
        BrowseCommand::Page(page) => {
            if !list.go_to_page(page).await {
                writeln!(out, "Page {page} is not available.")?;
            }
        }
        BrowseCommand::Filter { key, value } => match list.set_draft_field(&key, &value).await {
            Ok(stored) => writeln!(out, "Draft {key} = '{stored}'. Type `a` to apply.")?,
            Err(e) => writeln!(out, "{e}")?,
        },
        BrowseCommand::Apply => {
            list.apply_filters().await;
        }
        BrowseCommand::Clear => {
            list.clear_filters().await;
        }
        BrowseCommand::Retry => {
            if list.snapshot().status == ListStatus::Error {
                list.retry().await;
            } else {
                list.refresh().await;
            }
        }
        BrowseCommand::Help => {
            writeln!(out, "{HELP}")?;
            return Ok(true);
        }
        BrowseCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Browse `resource` until the input ends, the user quits or the session
/// is logged out.
pub async fn run<R, W>(
    resource: Resource,
    list: &ListController<Value>,
    session: &SessionContext,
    input: R,
    out: &mut W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut events = session.subscribe();
    let mut lines = input.lines();

    list.mount().await;
    write!(out, "{}", render::list(resource, &list.snapshot()))?;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            event = events.recv() => match event {
                Ok(SessionEvent::LoggedOut { reason }) => {
                    let why = match reason {
                        LogoutReason::Idle => "Signed out after inactivity.",
                        LogoutReason::Manual => "Signed out.",
                    };
                    writeln!(out, "{why}")?;
                    return Ok(());
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        };

        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        session.touch().await;

        let command = match line.parse::<BrowseCommand>() {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };
        let rerender = !matches!(command, BrowseCommand::Help | BrowseCommand::Filter { .. });
        if !execute(command, list, out).await? {
            return Ok(());
        }
        if rerender {
            write!(out, "{}", render::list(resource, &list.snapshot()))?;
        }
    }
}
