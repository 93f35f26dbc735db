//! Slash commands of the interactive session

use std::path::PathBuf;

use weather_chat_core::{Thread, ThreadId};

/// Help text printed by `/help`
pub const HELP: &str = "\
Commands:
  /new [title]      start a new thread
  /threads          list threads, most recent first
  /switch <n|id>    switch to a thread
  /rename <title>   rename the active thread
  /clear            clear the active thread
  /delete [n|id]    delete a thread (default: active)
  /export [dir]     export the active thread as JSON
  /help             show this help
  /quit             leave
Anything else is sent to the weather agent.";

/// One line of user input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the agent
    Send(String),
    /// `/new [title]`
    New(Option<String>),
    /// `/threads`
    Threads,
    /// `/switch <n|id>`
    Switch(String),
    /// `/rename <title>`
    Rename(String),
    /// `/clear`
    Clear,
    /// `/delete [n|id]`
    Delete(Option<String>),
    /// `/export [dir]`
    Export(Option<PathBuf>),
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
    /// Unrecognised or malformed slash command
    Invalid(String),
}

/// Parse a line; blank lines yield `None`
#[must_use]
pub fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Send(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };
    let arg = arg.map(str::to_string);

    let command = match (name, arg) {
        ("new", title) => Command::New(title),
        ("threads" | "list", None) => Command::Threads,
        ("switch", Some(target)) => Command::Switch(target),
        ("rename", Some(title)) => Command::Rename(title),
        ("clear", None) => Command::Clear,
        ("delete", target) => Command::Delete(target),
        ("export", dir) => Command::Export(dir.map(PathBuf::from)),
        ("help" | "?", None) => Command::Help,
        ("quit" | "exit", None) => Command::Quit,
        _ => Command::Invalid(line.to_string()),
    };
    Some(command)
}

/// Resolve a 1-based position in `threads` or a thread id (or unique id prefix)
#[must_use]
pub fn resolve_thread_ref(threads: &[&Thread], reference: &str) -> Option<ThreadId> {
    if let Ok(n) = reference.parse::<usize>() {
        if let Some(thread) = n.checked_sub(1).and_then(|i| threads.get(i)) {
            return Some(thread.id.clone());
        }
    }

    if let Some(thread) = threads.iter().find(|t| t.id.as_str() == reference) {
        return Some(thread.id.clone());
    }

    let mut matches = threads
        .iter()
        .filter(|t| t.id.as_str().starts_with(reference));
    match (matches.next(), matches.next()) {
        (Some(thread), None) => Some(thread.id.clone()),
        _ => None,
    }
}
