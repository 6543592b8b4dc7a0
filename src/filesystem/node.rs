use derive_more::IsVariant;
use hashlink::LinkedHashMap;
use snafu::OptionExt;
use std::time::SystemTime;

use crate::ext::SystemTimeExt;
use crate::filesystem::error::{TreeError, UnsupportedExtensionSnafu};
use crate::filesystem::extensions::{ExtensionAllowList, extension_of};

/// A single entry of the tree.
#[derive(Debug, Clone, PartialEq, Eq, IsVariant)]
pub enum Node {
    Directory(DirectoryNode),
    File(FileNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Directory(directory) => &directory.name,
            Node::File(file) => &file.name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Node::Directory(directory) => &directory.path,
            Node::File(file) => &file.path,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            Node::Directory(directory) => Some(directory),
            Node::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub(super) name: String,
    pub(super) path: String,
    pub(super) children: LinkedHashMap<String, Node>,
}

impl DirectoryNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            children: LinkedHashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub(super) name: String,
    pub(super) path: String,
    pub(super) content: String,
    pub(super) extension: String,
    pub(super) created_at: u64,
    pub(super) modified_at: u64,
}

impl FileNode {
    /// Creates a file stamped with the current time.
    ///
    /// Fails when the extension of `name` is missing or not part of
    /// `allow_list`.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<String>,
        allow_list: &ExtensionAllowList,
    ) -> Result<Self, TreeError> {
        let now = SystemTime::now().unix_millis();
        Self::with_timestamps(name, path, content, allow_list, now, now)
    }

    pub(super) fn with_timestamps(
        name: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<String>,
        allow_list: &ExtensionAllowList,
        created_at: u64,
        modified_at: u64,
    ) -> Result<Self, TreeError> {
        let name = name.into();
        let extension = allowed_extension(&name, allow_list)?;

        Ok(Self {
            name,
            path: path.into(),
            content: content.into(),
            extension,
            created_at,
            modified_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn modified_at(&self) -> u64 {
        self.modified_at
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub(super) fn replace_content(&mut self, content: String) {
        self.content = content;
        self.modified_at = SystemTime::now().unix_millis().max(self.modified_at);
    }
}

fn allowed_extension(name: &str, allow_list: &ExtensionAllowList) -> Result<String, TreeError> {
    let extension = extension_of(name).context(UnsupportedExtensionSnafu {
        name,
        extension: "",
        supported: allow_list.describe(),
    })?;

    if !allow_list.allows(extension) {
        return UnsupportedExtensionSnafu {
            name,
            extension,
            supported: allow_list.describe(),
        }
        .fail();
    }

    Ok(extension.to_string())
}

/// Names may only contain ASCII letters, digits, `-`, `_` and `.`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[test]
    fn test_file_node_records_extension_and_timestamps() {
        let file = FileNode::new(
            "pod.yaml",
            "/pod.yaml",
            "apiVersion: v1",
            &ExtensionAllowList::default(),
        )
        .expect("yaml files are allowed");

        assert_eq!(file.extension(), "yaml");
        assert_eq!(file.content(), "apiVersion: v1");
        assert_eq!(file.created_at(), file.modified_at());
        assert!(file.created_at() > 0);
    }

    #[rstest]
    #[case("readme.txt")]
    #[case("Makefile")]
    #[case(".yaml")]
    #[case("pod.")]
    fn test_file_node_rejects_unsupported_extension(#[case] name: &str) {
        let result = FileNode::new(name, "/x", "", &ExtensionAllowList::default());
        assert!(matches!(
            result,
            Err(TreeError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn test_replace_content_bumps_modified_time_only() {
        let mut file = FileNode::with_timestamps(
            "svc.json",
            "/svc.json",
            "{}",
            &ExtensionAllowList::default(),
            10,
            10,
        )
        .expect("json files are allowed");

        file.replace_content("{\"kind\": \"Service\"}".into());

        assert_eq!(file.created_at(), 10);
        assert!(file.modified_at() >= 10);
        assert_eq!(file.content(), "{\"kind\": \"Service\"}");
    }

    #[rstest]
    #[case("manifests", true)]
    #[case("pod.yaml", true)]
    #[case("my-dir_2", true)]
    #[case("", false)]
    #[case(".", false)]
    #[case("..", false)]
    #[case("with space", false)]
    #[case("glob*", false)]
    #[case("what?", false)]
    #[case("a/b", false)]
    #[case("pipe|", false)]
    #[case("<in>", false)]
    fn test_is_valid_name(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_valid_name(name), expected);
    }

    #[test]
    fn test_node_accessors() {
        let directory = Node::Directory(DirectoryNode::new("manifests", "/manifests"));
        assert!(directory.is_directory());
        assert!(!directory.is_file());
        assert_eq!(directory.name(), "manifests");
        assert_eq!(directory.path(), "/manifests");
        assert!(directory.as_file().is_none());
        assert!(directory.as_directory().is_some_and(DirectoryNode::is_empty));
    }
}
