//! In-memory filesystem tree.
//!
//! A [`FileTree`] owns a root directory and a working directory cursor.
//! Directories own their children by value, so cloning or snapshotting a
//! tree never shares nodes with the original.

mod error;
mod extensions;
mod node;
pub mod path;
mod snapshot;
mod tree;

pub use error::TreeError;
pub use extensions::{DEFAULT_EXTENSIONS, ExtensionAllowList, extension_of};
pub use node::{DirectoryNode, FileNode, Node, is_valid_name};
pub use snapshot::{NodeSnapshot, SnapshotError, TreeSnapshot};
pub use tree::{FileTree, MAX_DEPTH};
