use snafu::{ResultExt, ensure};

use crate::filesystem::{FileTree, Node, TreeError};
use crate::shell::dispatcher::{CommandError, CommandOutput, FailedSnafu, MissingOperandSnafu};
use crate::shell::parser::ParsedCommand;

/// Size shown for directories in long listings.
const DIRECTORY_SIZE: usize = 4096;

pub type Handler = fn(&mut FileTree, &ParsedCommand) -> Result<CommandOutput, CommandError>;

pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    /// Flags that take the following token as their value
    pub value_flags: &'static [char],
    pub handler: Handler,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "pwd",
        usage: "pwd",
        summary: "Print the current directory",
        value_flags: &[],
        handler: pwd,
    },
    CommandSpec {
        name: "cd",
        usage: "cd [path]",
        summary: "Change the current directory",
        value_flags: &[],
        handler: cd,
    },
    CommandSpec {
        name: "ls",
        usage: "ls [-l] [path]",
        summary: "List directory contents",
        value_flags: &['l'],
        handler: ls,
    },
    CommandSpec {
        name: "mkdir",
        usage: "mkdir [-p] path...",
        summary: "Create directories (-p creates parents)",
        value_flags: &['p'],
        handler: mkdir,
    },
    CommandSpec {
        name: "touch",
        usage: "touch file...",
        summary: "Create empty files",
        value_flags: &[],
        handler: touch,
    },
    CommandSpec {
        name: "cat",
        usage: "cat file...",
        summary: "Print file contents",
        value_flags: &[],
        handler: cat,
    },
    CommandSpec {
        name: "rm",
        usage: "rm [-r] path...",
        summary: "Remove files (-r removes directories)",
        value_flags: &['r'],
        handler: rm,
    },
    CommandSpec {
        name: "clear",
        usage: "clear",
        summary: "Clear the terminal",
        value_flags: &[],
        handler: clear,
    },
    CommandSpec {
        name: "help",
        usage: "help",
        summary: "Show available commands",
        value_flags: &[],
        handler: help,
    },
];

pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Operands of a command whose value flag doubles as the first operand,
/// e.g. `mkdir -p a b` operates on `a` and `b`.
fn operands<'a>(command: &'a ParsedCommand, value_flag: char) -> Vec<&'a str> {
    command
        .flag_value(value_flag)
        .into_iter()
        .chain(command.args.iter().map(String::as_str))
        .collect()
}

fn pwd(tree: &mut FileTree, _: &ParsedCommand) -> Result<CommandOutput, CommandError> {
    Ok(CommandOutput::Text(tree.current_path().to_string()))
}

fn cd(tree: &mut FileTree, command: &ParsedCommand) -> Result<CommandOutput, CommandError> {
    let target = command.args.first().map(String::as_str).unwrap_or("/");
    tree.change_directory(target)
        .with_context(|_| FailedSnafu {
            context: format!("cd: {target}"),
        })?;
    Ok(CommandOutput::Silent)
}

fn ls(tree: &mut FileTree, command: &ParsedCommand) -> Result<CommandOutput, CommandError> {
    let target = command
        .flag_value('l')
        .or_else(|| command.args.first().map(String::as_str));
    let nodes = tree
        .list_directory(target)
        .with_context(|_| FailedSnafu {
            context: format!("ls: cannot access '{}'", target.unwrap_or(".")),
        })?;

    if nodes.is_empty() {
        return Ok(CommandOutput::Silent);
    }
    if command.has_flag('l') {
        Ok(CommandOutput::Text(format_long_listing(&nodes)))
    } else {
        Ok(CommandOutput::Text(format_short_listing(&nodes)))
    }
}

fn mkdir(tree: &mut FileTree, command: &ParsedCommand) -> Result<CommandOutput, CommandError> {
    let recursive = command.has_flag('p');
    let targets = operands(command, 'p');
    ensure!(
        !targets.is_empty(),
        MissingOperandSnafu {
            command: "mkdir",
            message: "missing operand"
        }
    );

    for target in targets {
        tree.create_directory(target, recursive)
            .with_context(|_| FailedSnafu {
                context: format!("mkdir: cannot create directory '{target}'"),
            })?;
    }
    Ok(CommandOutput::Silent)
}

fn touch(tree: &mut FileTree, command: &ParsedCommand) -> Result<CommandOutput, CommandError> {
    ensure!(
        !command.args.is_empty(),
        MissingOperandSnafu {
            command: "touch",
            message: "missing file operand"
        }
    );

    for target in &command.args {
        let result = match tree.read_file(target).map(|_| ()) {
            Ok(()) => continue,
            Err(TreeError::NotFound { .. }) => tree.create_file(target, "").map(|_| ()),
            Err(error) => Err(error),
        };
        result.with_context(|_| FailedSnafu {
            context: format!("touch: cannot touch '{target}'"),
        })?;
    }
    Ok(CommandOutput::Silent)
}

fn cat(tree: &mut FileTree, command: &ParsedCommand) -> Result<CommandOutput, CommandError> {
    ensure!(
        !command.args.is_empty(),
        MissingOperandSnafu {
            command: "cat",
            message: "missing file operand"
        }
    );

    let tree: &FileTree = tree;
    let contents = command
        .args
        .iter()
        .map(|target| {
            tree.read_file(target).with_context(|_| FailedSnafu {
                context: format!("cat: {target}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CommandOutput::Text(contents.join("\n")))
}

fn rm(tree: &mut FileTree, command: &ParsedCommand) -> Result<CommandOutput, CommandError> {
    let recursive = command.has_flag('r');
    let targets = operands(command, 'r');
    ensure!(
        !targets.is_empty(),
        MissingOperandSnafu {
            command: "rm",
            message: "missing operand"
        }
    );

    for target in targets {
        let result = if recursive {
            match tree.delete_directory(target, true) {
                Err(TreeError::NotADirectory { .. }) => tree.delete_file(target),
                other => other,
            }
        } else {
            tree.delete_file(target)
        };
        result.with_context(|_| FailedSnafu {
            context: format!("rm: cannot remove '{target}'"),
        })?;
    }
    Ok(CommandOutput::Silent)
}

fn clear(_: &mut FileTree, _: &ParsedCommand) -> Result<CommandOutput, CommandError> {
    Ok(CommandOutput::Clear)
}

fn help(_: &mut FileTree, _: &ParsedCommand) -> Result<CommandOutput, CommandError> {
    let width = COMMANDS
        .iter()
        .map(|spec| spec.usage.len())
        .max()
        .unwrap_or_default();
    let lines: Vec<String> = COMMANDS
        .iter()
        .map(|spec| format!("  {:<width$}  {}", spec.usage, spec.summary))
        .collect();
    Ok(CommandOutput::Text(format!(
        "Available commands:\n{}",
        lines.join("\n")
    )))
}

fn display_name(node: &Node) -> String {
    match node {
        Node::Directory(directory) => format!("{}/", directory.name()),
        Node::File(file) => file.name().to_string(),
    }
}

pub fn format_short_listing(nodes: &[&Node]) -> String {
    nodes
        .iter()
        .map(|node| display_name(node))
        .collect::<Vec<_>>()
        .join("  ")
}

/// One line per node: type and permissions, size, name.
pub fn format_long_listing(nodes: &[&Node]) -> String {
    nodes
        .iter()
        .map(|node| {
            let (mode, size) = match node {
                Node::Directory(_) => ("drwxr-xr-x", DIRECTORY_SIZE),
                Node::File(file) => ("-rw-r--r--", file.size()),
            };
            format!("{mode} {size:>8} {}", display_name(node))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
