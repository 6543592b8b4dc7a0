use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use std::{borrow::Cow, path::Path, time::SystemTime};
use tracing::{debug, warn};

use crate::{
    ext::SystemTimeExt,
    filesystem::{
        ExtensionAllowList, FileTree, NodeSnapshot, SnapshotError, TreeSnapshot, extension_of,
        path::{ROOT, join_path},
    },
};

const HOST_SEED: &str = include_str!("seeds/host.yaml");
const DEBIAN_SEED: &str = include_str!("seeds/debian.yaml");

/// Built-in starting layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Default)]
pub enum SeedProfile {
    /// Host machine with example Kubernetes manifests
    #[default]
    Host,
    /// Debian-like container filesystem
    Debian,
    /// Only the root directory
    Empty,
}

/// Initial state of a tree, described in YAML.
///
/// ```yaml
/// currentPath: /manifests
/// tree:
///   manifests:
///     pod.yaml: |
///       apiVersion: v1
///   tmp: {}
/// ```
///
/// A mapping or null value is a directory, a string value is a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    snapshot: TreeSnapshot,
}

impl Seed {
    pub fn builtin(profile: SeedProfile) -> Result<Self, SeedError> {
        debug!("Loading built-in seed {:?}", profile);
        match profile {
            SeedProfile::Host => HOST_SEED.try_into(),
            SeedProfile::Debian => DEBIAN_SEED.try_into(),
            SeedProfile::Empty => Ok(Self::empty()),
        }
    }

    pub fn empty() -> Self {
        Self {
            snapshot: TreeSnapshot {
                current_path: ROOT.to_string(),
                tree: root_snapshot(Vec::new()),
            },
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, SeedError> {
        let file_path = path.display().to_string();
        debug!("Reading seed file {}", file_path);

        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: &file_path,
        })?;
        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: &file_path,
        })?;
        contents.as_str().try_into()
    }

    pub fn snapshot(&self) -> &TreeSnapshot {
        &self.snapshot
    }

    /// Builds a brand new tree from this seed. Every call yields an
    /// independent tree.
    pub fn build_tree(&self, allow_list: ExtensionAllowList) -> Result<FileTree, SeedError> {
        FileTree::from_snapshot(self.snapshot.clone(), allow_list).context(InvalidSeedSnafu)
    }

    fn parse_children(
        parent: &str,
        mapping: &LinkedHashMap<Yaml, Yaml>,
        stamp: u64,
    ) -> Result<Vec<NodeSnapshot>, SeedError> {
        mapping
            .iter()
            .filter_map(|(key, value)| match key.as_str() {
                Some(name) => Some((name, value)),
                None => {
                    warn!("Skipping seed entry with non-string key {:?} in {}", key, parent);
                    None
                }
            })
            .map(|(name, value)| Self::parse_entry(parent, name, value, stamp))
            .collect()
    }

    fn parse_entry(
        parent: &str,
        name: &str,
        value: &Yaml,
        stamp: u64,
    ) -> Result<NodeSnapshot, SeedError> {
        let path = join_path(parent, name);
        match value {
            Yaml::Mapping(children) => Ok(NodeSnapshot::Directory {
                name: name.to_string(),
                children: Self::parse_children(&path, children, stamp)?,
                path,
            }),
            Yaml::Value(Scalar::Null) => Ok(NodeSnapshot::Directory {
                name: name.to_string(),
                path,
                children: Vec::new(),
            }),
            Yaml::Value(Scalar::String(content)) => Ok(NodeSnapshot::File {
                name: name.to_string(),
                path,
                content: content.to_string(),
                extension: extension_of(name).unwrap_or_default().to_string(),
                created_at: stamp,
                modified_at: stamp,
            }),
            _ => UnsupportedEntrySnafu { path }.fail(),
        }
    }
}

impl TryFrom<&str> for Seed {
    type Error = SeedError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let document = documents.first().context(MalformedSeedSnafu)?;
        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        let current_path = match top_level.get(&yaml_key("currentPath")) {
            Some(value) => value.as_str().context(CurrentPathNotStringSnafu)?,
            None => ROOT,
        };

        let empty = LinkedHashMap::new();
        let tree = match top_level.get(&yaml_key("tree")) {
            None | Some(Yaml::Value(Scalar::Null)) => &empty,
            Some(value) => value.as_mapping().context(TreeNotMapSnafu)?,
        };

        let stamp = SystemTime::now().unix_millis();
        let children = Self::parse_children(ROOT, tree, stamp)?;

        Ok(Self {
            snapshot: TreeSnapshot {
                current_path: current_path.to_string(),
                tree: root_snapshot(children),
            },
        })
    }
}

fn yaml_key(key: &str) -> Yaml<'_> {
    Yaml::Value(Scalar::String(Cow::Borrowed(key)))
}

fn root_snapshot(children: Vec<NodeSnapshot>) -> NodeSnapshot {
    NodeSnapshot::Directory {
        name: String::new(),
        path: ROOT.to_string(),
        children,
    }
}

#[derive(Debug, Snafu)]
pub enum SeedError {
    #[snafu(display("Failed to read the seed file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Seed file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the seed file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted seed file"))]
    MalformedSeed,
    #[snafu(display("Top level of seed should be a map"))]
    TopLevelNotMap,
    #[snafu(display("'currentPath' should be a string"))]
    CurrentPathNotString,
    #[snafu(display("'tree' section should be a map"))]
    TreeNotMap,
    #[snafu(display("Seed entry '{}' should be a map, null or a string", path))]
    UnsupportedEntry { path: String },
    #[snafu(display("Seed does not describe a valid tree"))]
    InvalidSeed { source: SnapshotError },
}
