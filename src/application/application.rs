use std::io::{self, BufRead, Write};

use colored::Colorize;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::{RuntimeConfig, SeedSource, StateStore, StateStoreError};
use crate::config::{Seed, SeedError};
use crate::filesystem::{ExtensionAllowList, FileTree};
use crate::shell::{CommandOutput, Session};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let store = app_config.state.as_ref().map(StateStore::new);
        let host_tree = Self::host_tree(&app_config, store.as_ref()).await?;
        let container_seed = Seed::builtin(app_config.container_seed).context(SeedSnafu)?;
        let mut session = Session::new(host_tree, container_seed, app_config.allow_list.clone());

        let color = supports_color::on(supports_color::Stream::Stdout).is_some();
        let stdout = io::stdout();
        let stderr = io::stderr();
        if app_config.commands.is_empty() {
            info!("Starting interactive session");
            let stdin = io::stdin();
            drive(
                &mut session,
                stdin.lock().lines(),
                &mut stdout.lock(),
                &mut stderr.lock(),
                Terminal {
                    interactive: true,
                    color,
                },
            )
            .context(TerminalSnafu)?;
        } else {
            let lines = app_config.commands.iter().cloned().map(Ok::<_, io::Error>);
            drive(
                &mut session,
                lines,
                &mut stdout.lock(),
                &mut stderr.lock(),
                Terminal {
                    interactive: false,
                    color,
                },
            )
            .context(TerminalSnafu)?;
        }

        if let Some(store) = store {
            store
                .save(&session.host().tree().to_snapshot())
                .await
                .context(StateSnafu)?;
        }
        Ok(())
    }

    /// Saved state wins over the seed. A state file that cannot be used is
    /// reported and ignored.
    async fn host_tree(
        app_config: &RuntimeConfig,
        store: Option<&StateStore>,
    ) -> Result<FileTree, ApplicationError> {
        if let Some(store) = store {
            match store.load().await {
                Ok(Some(snapshot)) => {
                    let mut tree = FileTree::new(app_config.allow_list.clone());
                    match tree.load_state(snapshot) {
                        Ok(()) => {
                            info!("Restored host tree from {}", store.path().display());
                            return Ok(tree);
                        }
                        Err(error) => warn!(
                            "Ignoring state in {}: {}",
                            store.path().display(),
                            snafu::Report::from_error(error)
                        ),
                    }
                }
                Ok(None) => {}
                Err(error) => warn!("Ignoring state: {}", snafu::Report::from_error(error)),
            }
        }

        let seed = match &app_config.seed {
            SeedSource::Builtin(profile) => Seed::builtin(*profile),
            SeedSource::File(path) => Seed::from_path(path).await,
        }
        .context(SeedSnafu)?;
        debug!("Building host tree from {:?}", app_config.seed);
        seed_tree(&seed, &app_config.allow_list)
    }
}

fn seed_tree(seed: &Seed, allow_list: &ExtensionAllowList) -> Result<FileTree, ApplicationError> {
    seed.build_tree(allow_list.clone()).context(SeedSnafu)
}

#[derive(Debug, Clone, Copy)]
struct Terminal {
    interactive: bool,
    color: bool,
}

impl Terminal {
    fn prompt(self, prompt: &str) -> String {
        if self.color {
            prompt.bold().to_string()
        } else {
            prompt.to_string()
        }
    }

    fn error(self, message: &str) -> String {
        if self.color {
            message.red().to_string()
        } else {
            message.to_string()
        }
    }
}

/// Feeds `lines` to the session until input runs out or the host context
/// is exited. Command failures are printed and do not stop the loop.
fn drive<I, W, E>(
    session: &mut Session,
    lines: I,
    out: &mut W,
    err: &mut E,
    terminal: Terminal,
) -> io::Result<()>
where
    I: IntoIterator<Item = io::Result<String>>,
    W: Write,
    E: Write,
{
    let mut lines = lines.into_iter();
    loop {
        if terminal.interactive {
            write!(out, "{}", terminal.prompt(&session.prompt()))?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            if terminal.interactive {
                writeln!(out)?;
            }
            return Ok(());
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match session.execute(&line) {
            Ok(CommandOutput::Text(text)) => writeln!(out, "{text}")?,
            Ok(CommandOutput::Silent) => {}
            Ok(CommandOutput::Clear) => {
                write!(out, "{CLEAR_SCREEN}")?;
                out.flush()?;
            }
            Ok(CommandOutput::Exit) => return Ok(()),
            Err(error) => writeln!(err, "{}", terminal.error(&error.to_string()))?,
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while preparing a seed"))]
    SeedError { source: SeedError },
    #[snafu(display("Critical failure encountered while saving state"))]
    StateError { source: StateStoreError },
    #[snafu(display("Lost the terminal"))]
    TerminalError { source: io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedProfile;

    fn session() -> Session {
        let allow_list = ExtensionAllowList::default();
        let host = seed_tree(&Seed::empty(), &allow_list).unwrap();
        Session::new(host, Seed::builtin(SeedProfile::Debian).unwrap(), allow_list)
    }

    fn run_lines(session: &mut Session, lines: &[&str], interactive: bool) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let terminal = Terminal {
            interactive,
            color: false,
        };
        drive(
            session,
            lines.iter().map(|line| Ok::<_, io::Error>(line.to_string())),
            &mut out,
            &mut err,
            terminal,
        )
        .unwrap();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn commands_print_output_and_errors() {
        let mut session = session();

        let (out, err) = run_lines(
            &mut session,
            &["mkdir manifests", "", "mkdir manifests", "ls", "pwd"],
            false,
        );

        assert_eq!(out, "manifests/\n/\n");
        assert_eq!(err, "mkdir: cannot create directory 'manifests': File exists\n");
    }

    #[test]
    fn exit_at_host_stops_reading() {
        let mut session = session();

        let (out, _) = run_lines(&mut session, &["enter box", "exit", "exit", "pwd"], false);

        assert_eq!(out, "");
    }

    #[test]
    fn interactive_mode_prints_prompts() {
        let mut session = session();

        let (out, _) = run_lines(&mut session, &["enter box", "pwd"], true);

        assert_eq!(out, "host:/$ box:/root$ /root\nbox:/root$ \n");
    }

    #[test]
    fn clear_writes_escape_sequence() {
        let mut session = session();

        let (out, _) = run_lines(&mut session, &["clear"], false);

        assert_eq!(out, CLEAR_SCREEN);
    }

    #[test]
    fn read_errors_end_the_loop() {
        let mut session = session();
        let lines = vec![
            Ok("mkdir first".to_string()),
            Err(io::Error::other("stdin closed")),
            Ok("mkdir second".to_string()),
        ];

        let terminal = Terminal {
            interactive: false,
            color: false,
        };

        let result = drive(
            &mut session,
            lines,
            &mut Vec::<u8>::new(),
            &mut Vec::<u8>::new(),
            terminal,
        );

        assert!(result.is_err());
        assert!(session.host().tree().exists("/first"));
        assert!(!session.host().tree().exists("/second"));
    }

    #[compio::test]
    async fn saved_state_wins_over_seed() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.bin"));
        let mut tree = FileTree::default();
        tree.create_directory("kept", false).unwrap();
        store.save(&tree.to_snapshot()).await.unwrap();
        let app_config = RuntimeConfig {
            seed: SeedSource::Builtin(SeedProfile::Host),
            container_seed: SeedProfile::Empty,
            allow_list: ExtensionAllowList::default(),
            state: Some(store.path().to_path_buf()),
            commands: Vec::new(),
        };

        let restored = Application::host_tree(&app_config, Some(&store)).await.unwrap();

        assert!(restored.exists("/kept"));
        assert!(!restored.exists("/manifests"));
    }

    #[compio::test]
    async fn corrupted_state_falls_back_to_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        std::fs::write(&path, b"garbage").unwrap();
        let store = StateStore::new(&path);
        let app_config = RuntimeConfig {
            seed: SeedSource::Builtin(SeedProfile::Host),
            container_seed: SeedProfile::Empty,
            allow_list: ExtensionAllowList::default(),
            state: Some(path.clone()),
            commands: Vec::new(),
        };

        let tree = Application::host_tree(&app_config, Some(&store)).await.unwrap();

        assert!(tree.exists("/manifests/pod.yaml"));
    }

    #[compio::test]
    async fn restored_state_is_checked_against_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.bin"));
        let mut saved = FileTree::default();
        saved.create_file("notes.yaml", "kind: Note").unwrap();
        store.save(&saved.to_snapshot()).await.unwrap();
        let json_only = RuntimeConfig {
            seed: SeedSource::Builtin(SeedProfile::Empty),
            container_seed: SeedProfile::Empty,
            allow_list: ExtensionAllowList::new(["json"]),
            state: Some(store.path().to_path_buf()),
            commands: Vec::new(),
        };
        let with_yaml = RuntimeConfig {
            allow_list: ExtensionAllowList::new(["yaml", "json"]),
            ..json_only.clone()
        };

        let rejected = Application::host_tree(&json_only, Some(&store)).await.unwrap();
        let restored = Application::host_tree(&with_yaml, Some(&store)).await.unwrap();

        assert!(!rejected.exists("/notes.yaml"));
        assert_eq!(restored.read_file("/notes.yaml").unwrap(), "kind: Note");
        assert_eq!(restored.allow_list(), &with_yaml.allow_list);
    }

    #[compio::test]
    async fn run_saves_host_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let app_config = RuntimeConfig {
            seed: SeedSource::Builtin(SeedProfile::Empty),
            container_seed: SeedProfile::Empty,
            allow_list: ExtensionAllowList::default(),
            state: Some(path.clone()),
            commands: vec![
                "mkdir -p apps/web".to_string(),
                "enter scratch".to_string(),
                "mkdir lost".to_string(),
                "exit".to_string(),
                "cd apps".to_string(),
            ],
        };

        Application::run(app_config).await.unwrap();

        let snapshot = StateStore::new(&path).load().await.unwrap().unwrap();
        let tree = FileTree::from_snapshot(snapshot, ExtensionAllowList::default()).unwrap();
        assert_eq!(tree.current_path(), "/apps");
        assert!(tree.exists("/apps/web"));
        assert!(!tree.exists("/lost"));
    }
}
