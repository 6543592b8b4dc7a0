use snafu::prelude::*;
use tracing::{debug, info};

use crate::config::{Seed, SeedError};
use crate::filesystem::{ExtensionAllowList, FileTree, SnapshotError};
use crate::shell::dispatcher::{CommandError, CommandOutput, Dispatcher};

pub const HOST_CONTEXT: &str = "host";

/// A named tree the user can work in.
#[derive(Debug, Clone)]
pub struct ShellContext {
    name: String,
    tree: FileTree,
}

impl ShellContext {
    pub fn new(name: impl Into<String>, tree: FileTree) -> Self {
        Self {
            name: name.into(),
            tree,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }
}

/// The host context plus a stack of nested ones entered with `enter`.
///
/// Every nested context gets its own tree built from the container seed, so
/// nothing done inside one is visible from another.
#[derive(Debug)]
pub struct Session {
    host: ShellContext,
    nested: Vec<ShellContext>,
    dispatcher: Dispatcher,
    container_seed: Seed,
    allow_list: ExtensionAllowList,
}

impl Session {
    pub fn new(host_tree: FileTree, container_seed: Seed, allow_list: ExtensionAllowList) -> Self {
        Self {
            host: ShellContext::new(HOST_CONTEXT, host_tree),
            nested: Vec::new(),
            dispatcher: Dispatcher::default(),
            container_seed,
            allow_list,
        }
    }

    pub fn host(&self) -> &ShellContext {
        &self.host
    }

    pub fn current(&self) -> &ShellContext {
        self.nested.last().unwrap_or(&self.host)
    }

    /// Names of all open contexts, outermost first.
    pub fn context_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(&self.host)
            .chain(&self.nested)
            .map(ShellContext::name)
    }

    pub fn prompt(&self) -> String {
        let current = self.current();
        format!("{}:{}$ ", current.name, current.tree.current_path())
    }

    pub fn enter(&mut self, name: &str) -> Result<(), SessionError> {
        let tree = self
            .container_seed
            .build_tree(self.allow_list.clone())
            .context(EnterSnafu { name })?;
        self.nested.push(ShellContext::new(name, tree));
        info!("Entered context '{}' (depth {})", name, self.nested.len());
        Ok(())
    }

    /// Pops the innermost context. Returns `false` when already at the host.
    pub fn leave(&mut self) -> bool {
        match self.nested.pop() {
            Some(context) => {
                info!("Left context '{}'", context.name);
                true
            }
            None => false,
        }
    }

    pub fn execute(&mut self, line: &str) -> Result<CommandOutput, SessionError> {
        let command = self.dispatcher.parse(line).context(CommandSnafu)?;
        debug!("Session received '{}' in {}", command.input, self.current().name);

        match command.name.as_str() {
            "enter" => {
                let name = command
                    .args
                    .first()
                    .context(MissingContextNameSnafu)?;
                self.enter(name)?;
                Ok(CommandOutput::Silent)
            }
            "exit" => {
                if self.leave() {
                    Ok(CommandOutput::Silent)
                } else {
                    Ok(CommandOutput::Exit)
                }
            }
            "debug" => self.debug(command.args.first().map(String::as_str)),
            _ => {
                let dispatcher = &self.dispatcher;
                let tree = match self.nested.last_mut() {
                    Some(context) => &mut context.tree,
                    None => &mut self.host.tree,
                };
                dispatcher.dispatch(tree, &command).context(CommandSnafu)
            }
        }
    }

    fn debug(&self, target: Option<&str>) -> Result<CommandOutput, SessionError> {
        let tree = &self.current().tree;
        let text = match target {
            Some("tree") => tree.to_snapshot().to_json().context(InspectSnafu)?,
            Some("fingerprint") => {
                let fingerprint = tree.to_snapshot().fingerprint().context(InspectSnafu)?;
                format!("{fingerprint:016x}")
            }
            Some("contexts") => {
                let depth = self.nested.len();
                self.context_names()
                    .enumerate()
                    .map(|(index, name)| {
                        let marker = if index == depth { "*" } else { " " };
                        format!("{marker} {name}")
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            other => {
                return UnknownDebugTargetSnafu {
                    target: other.unwrap_or_default(),
                }
                .fail();
            }
        };
        Ok(CommandOutput::Text(text))
    }
}

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("{source}"))]
    CommandError { source: CommandError },
    #[snafu(display("enter: missing context name"))]
    MissingContextName,
    #[snafu(display("enter: cannot create context '{name}'"))]
    EnterError { name: String, source: SeedError },
    #[snafu(display("debug: expected one of tree, fingerprint, contexts (got '{target}')"))]
    UnknownDebugTarget { target: String },
    #[snafu(display("debug: failed to inspect the current tree"))]
    InspectError { source: SnapshotError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedProfile;

    fn session() -> Session {
        let allow_list = ExtensionAllowList::default();
        let host = Seed::builtin(SeedProfile::Host)
            .unwrap()
            .build_tree(allow_list.clone())
            .unwrap();
        let container = Seed::builtin(SeedProfile::Debian).unwrap();
        Session::new(host, container, allow_list)
    }

    fn text(session: &mut Session, line: &str) -> String {
        match session.execute(line).unwrap() {
            CommandOutput::Text(text) => text,
            other => panic!("expected text from '{line}', got {other:?}"),
        }
    }

    #[test]
    fn test_starts_at_host() {
        let session = session();

        assert_eq!(session.current().name(), HOST_CONTEXT);
        assert_eq!(session.prompt(), "host:/$ ");
        assert_eq!(session.context_names().collect::<Vec<_>>(), vec!["host"]);
    }

    #[test]
    fn test_enter_and_exit() {
        let mut session = session();

        assert_eq!(session.execute("enter web").unwrap(), CommandOutput::Silent);
        assert_eq!(session.prompt(), "web:/root$ ");
        assert!(text(&mut session, "cat /etc/os-release.yaml").contains("bookworm"));

        assert_eq!(session.execute("exit").unwrap(), CommandOutput::Silent);
        assert_eq!(session.current().name(), HOST_CONTEXT);
        assert_eq!(session.execute("exit").unwrap(), CommandOutput::Exit);
    }

    #[test]
    fn test_contexts_are_isolated() {
        let mut session = session();
        let host_before = session.host().tree().to_snapshot();

        session.execute("enter first").unwrap();
        session.execute("mkdir -p /tmp/cache").unwrap();
        session.execute("touch /tmp/cache/state.json").unwrap();
        let first_fingerprint = text(&mut session, "debug fingerprint");

        session.execute("enter second").unwrap();
        assert!(session.execute("ls /tmp/cache").is_err());
        let second_fingerprint = text(&mut session, "debug fingerprint");
        assert_ne!(first_fingerprint, second_fingerprint);

        session.execute("exit").unwrap();
        assert_eq!(text(&mut session, "ls /tmp/cache"), "state.json");

        session.execute("exit").unwrap();
        assert_eq!(session.host().tree().to_snapshot(), host_before);
    }

    #[test]
    fn test_fresh_contexts_from_same_seed_match() {
        let mut session = session();

        session.execute("enter a").unwrap();
        let first = text(&mut session, "debug tree");
        session.execute("exit").unwrap();
        session.execute("enter b").unwrap();
        let second = text(&mut session, "debug tree");

        assert_eq!(first, second);
    }

    #[test]
    fn test_debug_contexts_marks_current() {
        let mut session = session();
        session.execute("enter web").unwrap();
        session.execute("enter db").unwrap();

        assert_eq!(text(&mut session, "debug contexts"), "  host\n  web\n* db");
    }

    #[test]
    fn test_session_errors() {
        let mut session = session();

        assert_eq!(
            session.execute("enter").unwrap_err().to_string(),
            "enter: missing context name"
        );
        assert_eq!(
            session.execute("debug nodes").unwrap_err().to_string(),
            "debug: expected one of tree, fingerprint, contexts (got 'nodes')"
        );
        assert_eq!(
            session.execute("kubectl apply -f pod.yaml").unwrap_err().to_string(),
            "UnknownCommand: kubectl apply -f pod.yaml"
        );
        assert_eq!(session.current().name(), HOST_CONTEXT);
    }

    #[test]
    fn test_enter_failure_keeps_stack() {
        let allow_list = ExtensionAllowList::new(["json"]);
        let mut session = Session::new(
            FileTree::new(allow_list.clone()),
            Seed::builtin(SeedProfile::Debian).unwrap(),
            allow_list,
        );

        let error = session.execute("enter web").unwrap_err();

        assert!(matches!(error, SessionError::EnterError { .. }));
        assert_eq!(session.current().name(), HOST_CONTEXT);
    }

    #[test]
    fn test_commands_run_against_current_context() {
        let mut session = session();

        session.execute("enter web").unwrap();
        session.execute("cd /etc").unwrap();
        assert_eq!(text(&mut session, "pwd"), "/etc");
        session.execute("exit").unwrap();

        assert_eq!(text(&mut session, "pwd"), "/");
    }
}
