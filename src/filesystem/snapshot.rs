//! Owned, serializable copies of a [`FileTree`].
//!
//! The JSON form is `{ "currentPath": .., "tree": NodeValue }` where
//! directories carry their children as an insertion-ordered map from child
//! name to node. The binary form is bincode compressed with zstd.

use std::hash::Hasher;

use bincode::{Decode, Encode};
use metrohash::MetroHash64;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};
use tracing::debug;

use crate::filesystem::error::{
    AlreadyExistsSnafu, InvalidNameSnafu, MaxDepthExceededSnafu, TreeError,
};
use crate::filesystem::extensions::ExtensionAllowList;
use crate::filesystem::node::{DirectoryNode, FileNode, Node, is_valid_name};
use crate::filesystem::path::{self, ROOT};
use crate::filesystem::tree::{FileTree, MAX_DEPTH};

const COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    pub current_path: String,
    pub tree: NodeSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum NodeSnapshot {
    Directory {
        name: String,
        path: String,
        #[serde(with = "children_map")]
        children: Vec<NodeSnapshot>,
    },
    File {
        name: String,
        path: String,
        content: String,
        extension: String,
        created_at: u64,
        modified_at: u64,
    },
}

impl NodeSnapshot {
    pub fn name(&self) -> &str {
        match self {
            NodeSnapshot::Directory { name, .. } | NodeSnapshot::File { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            NodeSnapshot::Directory { path, .. } | NodeSnapshot::File { path, .. } => path,
        }
    }
}

impl From<&DirectoryNode> for NodeSnapshot {
    fn from(directory: &DirectoryNode) -> Self {
        NodeSnapshot::Directory {
            name: directory.name.clone(),
            path: directory.path.clone(),
            children: directory.children().map(NodeSnapshot::from).collect(),
        }
    }
}

impl From<&FileNode> for NodeSnapshot {
    fn from(file: &FileNode) -> Self {
        NodeSnapshot::File {
            name: file.name.clone(),
            path: file.path.clone(),
            content: file.content.clone(),
            extension: file.extension.clone(),
            created_at: file.created_at,
            modified_at: file.modified_at,
        }
    }
}

impl From<&Node> for NodeSnapshot {
    fn from(node: &Node) -> Self {
        match node {
            Node::Directory(directory) => directory.into(),
            Node::File(file) => file.into(),
        }
    }
}

impl TreeSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).context(JsonSnafu)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).context(JsonSnafu)
    }

    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let bytes = bincode::encode_to_vec(self, bincode::config::standard()).context(EncodeSnafu)?;
        zstd::encode_all(bytes.as_slice(), COMPRESSION_LEVEL).context(CompressionSnafu)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let raw = zstd::decode_all(bytes).context(CompressionSnafu)?;
        let (snapshot, _) =
            bincode::decode_from_slice(&raw, bincode::config::standard()).context(DecodeSnafu)?;
        Ok(snapshot)
    }

    /// Stable 64-bit hash of the snapshot contents.
    pub fn fingerprint(&self) -> Result<u64, SnapshotError> {
        let bytes = bincode::encode_to_vec(self, bincode::config::standard()).context(EncodeSnafu)?;
        let mut hasher = MetroHash64::default();
        hasher.write(&bytes);
        Ok(hasher.finish())
    }
}

impl FileTree {
    pub fn to_snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            current_path: self.current_path.clone(),
            tree: (&self.root).into(),
        }
    }

    /// Rebuilds a tree from `snapshot`, checking every tree invariant on the
    /// way.
    pub fn from_snapshot(
        snapshot: TreeSnapshot,
        allow_list: ExtensionAllowList,
    ) -> Result<Self, SnapshotError> {
        let NodeSnapshot::Directory {
            name,
            path: root_path,
            children,
        } = snapshot.tree
        else {
            return RootNotDirectorySnafu.fail();
        };
        ensure!(
            name.is_empty() && root_path == ROOT,
            InvalidRootSnafu {
                name,
                path: root_path
            }
        );

        let mut root = DirectoryNode::new("", ROOT);
        restore_children(&mut root, children, &allow_list)?;

        let mut tree = FileTree {
            root,
            current_path: ROOT.to_string(),
            allow_list,
        };
        let current_path = path::normalize_path(&snapshot.current_path);
        tree.directory(&current_path)
            .context(InvalidCurrentPathSnafu {
                path: &current_path,
            })?;
        tree.current_path = current_path;

        debug!("Restored tree at {}", tree.current_path);
        Ok(tree)
    }

    /// Replaces the whole state with `snapshot`. On failure the tree is left
    /// untouched.
    pub fn load_state(&mut self, snapshot: TreeSnapshot) -> Result<(), SnapshotError> {
        *self = Self::from_snapshot(snapshot, self.allow_list.clone())?;
        Ok(())
    }
}

fn restore_children(
    directory: &mut DirectoryNode,
    children: Vec<NodeSnapshot>,
    allow_list: &ExtensionAllowList,
) -> Result<(), SnapshotError> {
    for child in children {
        let expected = path::join_path(&directory.path, child.name());
        validate_child(directory, &child, &expected).context(InvalidNodeSnafu { path: &expected })?;
        ensure!(
            child.path() == expected,
            InconsistentPathSnafu {
                expected: &expected,
                found: child.path()
            }
        );

        let node = match child {
            NodeSnapshot::Directory {
                name,
                path,
                children,
            } => {
                let mut restored = DirectoryNode::new(name, path);
                restore_children(&mut restored, children, allow_list)?;
                Node::Directory(restored)
            }
            NodeSnapshot::File {
                name,
                path,
                content,
                extension,
                created_at,
                modified_at,
            } => {
                let file = FileNode::with_timestamps(
                    name,
                    path,
                    content,
                    allow_list,
                    created_at,
                    modified_at,
                )
                .context(InvalidNodeSnafu { path: &expected })?;
                ensure!(
                    file.extension() == extension,
                    MismatchedExtensionSnafu {
                        path: &expected,
                        recorded: extension
                    }
                );
                Node::File(file)
            }
        };
        directory.children.insert(node.name().to_string(), node);
    }
    Ok(())
}

fn validate_child(
    parent: &DirectoryNode,
    child: &NodeSnapshot,
    child_path: &str,
) -> Result<(), TreeError> {
    ensure!(
        is_valid_name(child.name()),
        InvalidNameSnafu { name: child.name() }
    );
    ensure!(
        !parent.children.contains_key(child.name()),
        AlreadyExistsSnafu { path: child_path }
    );
    ensure!(
        path::depth(child_path) <= MAX_DEPTH,
        MaxDepthExceededSnafu {
            path: child_path,
            max: MAX_DEPTH
        }
    );
    Ok(())
}

mod children_map {
    use std::fmt;

    use serde::de::{self, MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    use super::NodeSnapshot;

    pub fn serialize<S: Serializer>(
        children: &[NodeSnapshot],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(children.iter().map(|child| (child.name(), child)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<NodeSnapshot>, D::Error> {
        deserializer.deserialize_map(ChildrenVisitor)
    }

    struct ChildrenVisitor;

    impl<'de> Visitor<'de> for ChildrenVisitor {
        type Value = Vec<NodeSnapshot>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map from child name to node")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut children = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, child)) = map.next_entry::<String, NodeSnapshot>()? {
                if key != child.name() {
                    return Err(de::Error::custom(format!(
                        "child key '{}' does not match node name '{}'",
                        key,
                        child.name()
                    )));
                }
                children.push(child);
            }
            Ok(children)
        }
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotError {
    #[snafu(display("Snapshot root must be a directory"))]
    RootNotDirectory,
    #[snafu(display("Snapshot root must be named '' at '/', found '{}' at '{}'", name, path))]
    InvalidRoot { name: String, path: String },
    #[snafu(display("Invalid node '{}' in snapshot", path))]
    InvalidNode { path: String, source: TreeError },
    #[snafu(display("Node path '{}' does not match its location '{}'", found, expected))]
    InconsistentPath { expected: String, found: String },
    #[snafu(display("Recorded extension '{}' does not match file '{}'", recorded, path))]
    MismatchedExtension { path: String, recorded: String },
    #[snafu(display("Snapshot current path '{}' is not a directory", path))]
    InvalidCurrentPath { path: String, source: TreeError },
    #[snafu(display("Failed to convert snapshot to or from JSON"))]
    JsonError { source: serde_json::Error },
    #[snafu(display("Failed to encode snapshot"))]
    EncodeError {
        source: bincode::error::EncodeError,
    },
    #[snafu(display("Failed to decode snapshot"))]
    DecodeError {
        source: bincode::error::DecodeError,
    },
    #[snafu(display("Failed to (de)compress snapshot"))]
    CompressionError { source: std::io::Error },
}
