use snafu::{OptionExt, ensure};
use tracing::debug;

use crate::filesystem::error::{
    AlreadyExistsSnafu, CannotDeleteRootSnafu, InvalidNameSnafu, MaxDepthExceededSnafu,
    NotADirectorySnafu, NotAFileSnafu, NotEmptySnafu, NotFoundSnafu, TreeError,
};
use crate::filesystem::extensions::ExtensionAllowList;
use crate::filesystem::node::{DirectoryNode, FileNode, Node, is_valid_name};
use crate::filesystem::path::{self, ROOT};

/// Maximum number of path segments below the root.
pub const MAX_DEPTH: usize = 3;

/// An in-memory directory tree with a working directory cursor.
///
/// Every mutating operation validates the whole request before touching
/// the tree, so a failed call leaves the tree exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTree {
    pub(super) root: DirectoryNode,
    pub(super) current_path: String,
    pub(super) allow_list: ExtensionAllowList,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new(ExtensionAllowList::default())
    }
}

impl FileTree {
    pub fn new(allow_list: ExtensionAllowList) -> Self {
        Self {
            root: DirectoryNode::new("", ROOT),
            current_path: ROOT.to_string(),
            allow_list,
        }
    }

    pub fn root(&self) -> &DirectoryNode {
        &self.root
    }

    pub fn allow_list(&self) -> &ExtensionAllowList {
        &self.allow_list
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Resolves `input` against the current path.
    pub fn resolve(&self, input: &str) -> String {
        path::resolve_path(&self.current_path, input)
    }

    pub fn exists(&self, input: &str) -> bool {
        let target = self.resolve(input);
        match path::file_name(&target) {
            None => true,
            Some(name) => self
                .directory(&path::parent_path(&target))
                .is_ok_and(|parent| parent.children.contains_key(name)),
        }
    }

    pub fn change_directory(&mut self, input: &str) -> Result<&str, TreeError> {
        let target = self.resolve(input);
        self.directory(&target)?;

        debug!("Changing directory from {} to {}", self.current_path, target);
        self.current_path = target;
        Ok(&self.current_path)
    }

    /// Children of the directory at `input` (or the current directory) in
    /// insertion order.
    pub fn list_directory(&self, input: Option<&str>) -> Result<Vec<&Node>, TreeError> {
        let target = self.resolve(input.unwrap_or("."));
        Ok(self.directory(&target)?.children().collect())
    }

    /// Creates the directory at `input` and returns its absolute path.
    ///
    /// With `recursive` every missing ancestor is created as well and an
    /// already existing directory is not an error. Missing ancestors without
    /// `recursive` fail with `NotFound` for the first missing one.
    pub fn create_directory(&mut self, input: &str, recursive: bool) -> Result<String, TreeError> {
        let target = self.resolve(input);
        ensure!(!path::is_root(&target), AlreadyExistsSnafu { path: &target });

        let segments: Vec<&str> = path::segments(&target).collect();
        for segment in &segments {
            ensure!(is_valid_name(segment), InvalidNameSnafu { name: *segment });
        }
        ensure!(
            segments.len() <= MAX_DEPTH,
            MaxDepthExceededSnafu {
                path: &target,
                max: MAX_DEPTH
            }
        );

        let mut parent = &self.root;
        for (index, segment) in segments.iter().enumerate() {
            let is_target = index + 1 == segments.len();
            let child_path = path::join_path(&parent.path, segment);
            match parent.children.get(*segment) {
                Some(Node::Directory(_)) if is_target && recursive => {
                    debug!("Directory {} already exists", target);
                    return Ok(target);
                }
                Some(Node::Directory(directory)) if !is_target => parent = directory,
                Some(Node::File(_)) if !is_target => {
                    return NotADirectorySnafu { path: child_path }.fail();
                }
                Some(_) => return AlreadyExistsSnafu { path: child_path }.fail(),
                None if !is_target && !recursive => {
                    return NotFoundSnafu { path: child_path }.fail();
                }
                None => break,
            }
        }

        self.insert_directory_chain(&segments)?;
        debug!("Created directory {}", target);
        Ok(target)
    }

    /// Creates a file at `input`; the parent directory must already exist.
    pub fn create_file(&mut self, input: &str, content: &str) -> Result<FileNode, TreeError> {
        let target = self.resolve(input);
        let name = path::file_name(&target).context(InvalidNameSnafu { name: input })?;
        ensure!(is_valid_name(name), InvalidNameSnafu { name });

        let file = FileNode::new(name, &target, content, &self.allow_list)?;
        ensure!(
            path::depth(&target) <= MAX_DEPTH,
            MaxDepthExceededSnafu {
                path: &target,
                max: MAX_DEPTH
            }
        );

        let parent = self.directory_mut(&path::parent_path(&target))?;
        ensure!(
            !parent.children.contains_key(name),
            AlreadyExistsSnafu { path: &target }
        );
        parent.children.insert(name.to_string(), Node::File(file.clone()));

        debug!("Created file {}", target);
        Ok(file)
    }

    pub fn read_file(&self, input: &str) -> Result<&str, TreeError> {
        let target = self.resolve(input);
        Ok(self.file(&target)?.content())
    }

    pub fn write_file(&mut self, input: &str, content: &str) -> Result<(), TreeError> {
        let target = self.resolve(input);
        self.file_mut(&target)?.replace_content(content.to_string());
        debug!("Wrote {} bytes to {}", content.len(), target);
        Ok(())
    }

    pub fn delete_file(&mut self, input: &str) -> Result<(), TreeError> {
        let target = self.resolve(input);
        let name = path::file_name(&target).context(NotAFileSnafu { path: ROOT })?;

        let parent = self.directory_mut(&path::parent_path(&target))?;
        match parent.children.get(name) {
            Some(Node::File(_)) => {}
            Some(Node::Directory(_)) => return NotAFileSnafu { path: &target }.fail(),
            None => return NotFoundSnafu { path: &target }.fail(),
        }
        parent.children.remove(name);

        debug!("Deleted file {}", target);
        Ok(())
    }

    /// Removes the directory at `input`.
    ///
    /// A recursive delete detaches the whole subtree at once. When the
    /// current path lies inside the removed subtree it moves to the removed
    /// directory's parent.
    pub fn delete_directory(&mut self, input: &str, recursive: bool) -> Result<(), TreeError> {
        let target = self.resolve(input);
        let name = path::file_name(&target).context(CannotDeleteRootSnafu)?;
        let parent_path = path::parent_path(&target);

        let parent = self.directory_mut(&parent_path)?;
        match parent.children.get(name) {
            Some(Node::Directory(directory)) => ensure!(
                recursive || directory.is_empty(),
                NotEmptySnafu { path: &target }
            ),
            Some(Node::File(_)) => return NotADirectorySnafu { path: &target }.fail(),
            None => return NotFoundSnafu { path: &target }.fail(),
        }
        parent.children.remove(name);

        if path::is_within(&self.current_path, &target) {
            debug!(
                "Current path {} was removed, moving to {}",
                self.current_path, parent_path
            );
            self.current_path = parent_path;
        }

        debug!("Deleted directory {} (recursive: {})", target, recursive);
        Ok(())
    }

    fn insert_directory_chain(&mut self, segments: &[&str]) -> Result<(), TreeError> {
        let mut directory = &mut self.root;
        for segment in segments {
            let child_path = path::join_path(&directory.path, segment);
            let child = directory
                .children
                .entry(segment.to_string())
                .or_insert_with(|| Node::Directory(DirectoryNode::new(*segment, child_path.clone())));
            directory = match child {
                Node::Directory(child) => child,
                Node::File(_) => return NotADirectorySnafu { path: child_path }.fail(),
            };
        }
        Ok(())
    }

    pub(super) fn directory(&self, target: &str) -> Result<&DirectoryNode, TreeError> {
        let mut directory = &self.root;
        for segment in path::segments(target) {
            let child_path = path::join_path(&directory.path, segment);
            directory = match directory.children.get(segment) {
                Some(Node::Directory(child)) => child,
                Some(Node::File(_)) => return NotADirectorySnafu { path: child_path }.fail(),
                None => return NotFoundSnafu { path: child_path }.fail(),
            };
        }
        Ok(directory)
    }

    fn directory_mut(&mut self, target: &str) -> Result<&mut DirectoryNode, TreeError> {
        let mut directory = &mut self.root;
        for segment in path::segments(target) {
            let child_path = path::join_path(&directory.path, segment);
            directory = match directory.children.get_mut(segment) {
                Some(Node::Directory(child)) => child,
                Some(Node::File(_)) => return NotADirectorySnafu { path: child_path }.fail(),
                None => return NotFoundSnafu { path: child_path }.fail(),
            };
        }
        Ok(directory)
    }

    fn file(&self, target: &str) -> Result<&FileNode, TreeError> {
        let name = path::file_name(target).context(NotAFileSnafu { path: ROOT })?;
        match self.directory(&path::parent_path(target))?.children.get(name) {
            Some(Node::File(file)) => Ok(file),
            Some(Node::Directory(_)) => NotAFileSnafu { path: target }.fail(),
            None => NotFoundSnafu { path: target }.fail(),
        }
    }

    fn file_mut(&mut self, target: &str) -> Result<&mut FileNode, TreeError> {
        let name = path::file_name(target).context(NotAFileSnafu { path: ROOT })?;
        match self
            .directory_mut(&path::parent_path(target))?
            .children
            .get_mut(name)
        {
            Some(Node::File(file)) => Ok(file),
            Some(Node::Directory(_)) => NotAFileSnafu { path: target }.fail(),
            None => NotFoundSnafu { path: target }.fail(),
        }
    }
}
