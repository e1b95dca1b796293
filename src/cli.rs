use crate::error::CommandError;
use crate::types::{Query, QueryKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxCommand {
    List,
    Show(usize),
    Draft { index: usize, text: String },
    Send(usize),
    Dismiss(usize),
    Reload,
    Stats,
    Help,
    Quit,
}

pub const INBOX_HELP: &str = "commands:\n  list\n  show <n>\n  draft <n> <text>\n  send <n>\n  dismiss <n>\n  reload\n  stats\n  help\n  quit";

pub fn parse_command(line: &str) -> Result<InboxCommand, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(CommandError::Empty);
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim_start).unwrap_or_default();

    match verb {
        "list" | "ls" => Ok(InboxCommand::List),
        "show" => Ok(InboxCommand::Show(parse_index("show", rest)?)),
        "send" => Ok(InboxCommand::Send(parse_index("send", rest)?)),
        "dismiss" => Ok(InboxCommand::Dismiss(parse_index("dismiss", rest)?)),
        "draft" => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let index = parse_index("draft", parts.next().unwrap_or_default())?;
            let text = parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(CommandError::MissingText)?;
            Ok(InboxCommand::Draft {
                index,
                text: text.to_string(),
            })
        }
        "reload" => Ok(InboxCommand::Reload),
        "stats" => Ok(InboxCommand::Stats),
        "help" | "?" => Ok(InboxCommand::Help),
        "quit" | "exit" => Ok(InboxCommand::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_index(verb: &'static str, raw: &str) -> Result<usize, CommandError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CommandError::MissingIndex(verb));
    }
    match raw.parse::<usize>() {
        Ok(index) if index > 0 => Ok(index),
        _ => Err(CommandError::InvalidIndex(raw.to_string())),
    }
}

pub fn resolve(queries: &[Query], index: usize) -> Result<QueryKey, CommandError> {
    index
        .checked_sub(1)
        .and_then(|i| queries.get(i))
        .map(Query::key)
        .ok_or(CommandError::NoSuchQuery(index))
}
