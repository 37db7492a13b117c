//! Line commands read by the `medals-client` binary.

use medals_engine::EntityId;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Delete(EntityId),
    Increment(EntityId, String),
    Decrement(EntityId, String),
    Save(EntityId),
    Reset(EntityId),
    Show,
    Help,
    Quit,
}

/// Error returned for input that is not a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(String);

pub const USAGE: &str = "\
commands:
  add <name>          create an entity
  del <id>            delete an entity
  + <id> <counter>    increment a counter
  - <id> <counter>    decrement a counter
  save <id>           persist unsaved edits
  reset <id>          discard unsaved edits
  show                print the board
  help                print this text
  quit                exit";

impl Command {
    /// Parse one line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        let Some((word, rest)) = split_word(line) else {
            return Ok(None);
        };

        let command = match word {
            "add" => {
                if rest.is_empty() {
                    return Err(ParseError("usage: add <name>".into()));
                }
                Command::Add(rest.to_string())
            }
            "del" | "delete" => Command::Delete(parse_id(rest)?),
            "save" => Command::Save(parse_id(rest)?),
            "reset" => Command::Reset(parse_id(rest)?),
            "+" => {
                let (id, counter) = parse_id_counter(rest)?;
                Command::Increment(id, counter)
            }
            "-" => {
                let (id, counter) = parse_id_counter(rest)?;
                Command::Decrement(id, counter)
            }
            "show" | "ls" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(ParseError(format!("unknown command: {other}"))),
        };
        Ok(Some(command))
    }
}

fn split_word(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((line, "")),
    }
}

fn parse_id(text: &str) -> Result<EntityId, ParseError> {
    text.trim()
        .parse()
        .map_err(|_| ParseError(format!("not an id: {:?}", text.trim())))
}

fn parse_id_counter(text: &str) -> Result<(EntityId, String), ParseError> {
    let mut parts = text.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(counter), None) => Ok((parse_id(id)?, counter.to_string())),
        _ => Err(ParseError("usage: +|- <id> <counter>".into())),
    }
}
