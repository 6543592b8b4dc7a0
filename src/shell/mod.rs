//! Line-oriented shell on top of [`crate::filesystem::FileTree`].

mod commands;
mod dispatcher;
mod parser;
mod session;

pub use commands::{COMMANDS, CommandSpec, Handler, find_command};
pub use dispatcher::{CommandError, CommandOutput, Dispatcher};
pub use parser::{FlagGrammar, FlagValue, ParseError, ParsedCommand, parse_shell_command};
pub use session::{HOST_CONTEXT, Session, SessionError, ShellContext};
