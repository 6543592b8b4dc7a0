use derive_more::IsVariant;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

use crate::filesystem::{FileTree, TreeError};
use crate::shell::commands::{COMMANDS, find_command};
use crate::shell::parser::{FlagGrammar, ParseError, ParsedCommand, parse_shell_command};

/// Result of a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq, IsVariant)]
pub enum CommandOutput {
    Text(String),
    /// Nothing to print
    Silent,
    /// The terminal should be cleared
    Clear,
    /// The current shell context should be left
    Exit,
}

/// Routes parsed lines to the command table.
///
/// The dispatcher holds no tree of its own; callers pass in whichever tree
/// is active for the current context.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    grammar: FlagGrammar,
}

impl Default for Dispatcher {
    fn default() -> Self {
        let grammar = COMMANDS
            .iter()
            .map(|spec| (spec.name, spec.value_flags))
            .collect();
        Self { grammar }
    }
}

impl Dispatcher {
    pub fn parse(&self, line: &str) -> Result<ParsedCommand, CommandError> {
        parse_shell_command(line, &self.grammar).context(ParseSnafu)
    }

    pub fn dispatch(
        &self,
        tree: &mut FileTree,
        command: &ParsedCommand,
    ) -> Result<CommandOutput, CommandError> {
        let spec = find_command(&command.name).context(UnknownCommandSnafu {
            input: &command.input,
        })?;
        debug!(
            "Dispatching '{}' with args {:?} and flags {:?}",
            spec.name, command.args, command.flags
        );
        (spec.handler)(tree, command)
    }

    pub fn execute(&self, tree: &mut FileTree, line: &str) -> Result<CommandOutput, CommandError> {
        let command = self.parse(line)?;
        self.dispatch(tree, &command)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CommandError {
    #[snafu(display("{source}"))]
    Parse { source: ParseError },
    #[snafu(display("UnknownCommand: {input}"))]
    UnknownCommand { input: String },
    #[snafu(display("{command}: {message}"))]
    MissingOperand { command: String, message: String },
    #[snafu(display("{context}: {source}"))]
    Failed { context: String, source: TreeError },
}

impl CommandError {
    /// The underlying tree failure, if the engine rejected the command.
    pub fn tree_error(&self) -> Option<&TreeError> {
        match self {
            CommandError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }
}
