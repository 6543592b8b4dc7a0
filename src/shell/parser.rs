use std::collections::HashMap;

use derive_more::{Display, IsVariant};
use hashlink::LinkedHashMap;
use snafu::{Snafu, ensure};

/// Value recorded for a flag on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Display, IsVariant)]
pub enum FlagValue {
    #[display("true")]
    Present,
    #[display("{_0}")]
    Value(String),
}

impl FlagValue {
    pub fn value(&self) -> Option<&str> {
        match self {
            FlagValue::Present => None,
            FlagValue::Value(value) => Some(value),
        }
    }
}

/// One tokenized input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The trimmed line this command was parsed from
    pub input: String,
    pub name: String,
    pub args: Vec<String>,
    pub flags: LinkedHashMap<char, FlagValue>,
}

impl ParsedCommand {
    pub fn has_flag(&self, flag: char) -> bool {
        self.flags.contains_key(&flag)
    }

    pub fn flag_value(&self, flag: char) -> Option<&str> {
        self.flags.get(&flag).and_then(FlagValue::value)
    }
}

/// Per-command table of flags that consume the following token as their
/// value, e.g. `mkdir -p dev/test`.
#[derive(Debug, Clone, Default)]
pub struct FlagGrammar {
    value_flags: HashMap<String, Vec<char>>,
}

impl FlagGrammar {
    pub fn takes_value(&self, command: &str, flag: char) -> bool {
        self.value_flags
            .get(command)
            .is_some_and(|flags| flags.contains(&flag))
    }
}

impl<'a> FromIterator<(&'a str, &'a [char])> for FlagGrammar {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a [char])>>(iter: T) -> Self {
        let value_flags = iter
            .into_iter()
            .filter(|(_, flags)| !flags.is_empty())
            .map(|(command, flags)| (command.to_string(), flags.to_vec()))
            .collect();
        Self { value_flags }
    }
}

/// Splits `line` into a command name, positional arguments and flags.
///
/// A token is a flag when it is `-` followed by exactly one ASCII letter.
/// Value-taking flags swallow the next token unless it starts with `-`.
pub fn parse_shell_command(line: &str, grammar: &FlagGrammar) -> Result<ParsedCommand, ParseError> {
    let input = line.trim();
    ensure!(!input.is_empty(), EmptyCommandSnafu);

    let mut tokens = input.split_whitespace().peekable();
    let name = tokens.next().unwrap_or_default().to_string();
    let mut args = Vec::new();
    let mut flags = LinkedHashMap::new();

    while let Some(token) = tokens.next() {
        let Some(flag) = flag_letter(token) else {
            args.push(token.to_string());
            continue;
        };

        let value = match tokens.peek() {
            Some(next) if !next.starts_with('-') && grammar.takes_value(&name, flag) => {
                FlagValue::Value(next.to_string())
            }
            _ => FlagValue::Present,
        };
        if value.is_value() {
            tokens.next();
        }
        flags.insert(flag, value);
    }

    Ok(ParsedCommand {
        input: input.to_string(),
        name,
        args,
        flags,
    })
}

fn flag_letter(token: &str) -> Option<char> {
    let mut chars = token.strip_prefix('-')?.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => Some(letter),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ParseError {
    #[snafu(display("EmptyCommand: nothing to run"))]
    EmptyCommand,
}
