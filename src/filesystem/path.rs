//! Pure string helpers for absolute, `/`-separated tree paths.
//!
//! Every path handed out by these functions is normalized: it starts with
//! `/`, has no empty, `.` or `..` segments and no trailing separator
//! (except the root itself).

pub const ROOT: &str = "/";
pub const SEPARATOR: char = '/';

/// Resolves `input` against `base`.
///
/// Absolute inputs ignore `base`. `..` never climbs above the root.
pub fn resolve_path(base: &str, input: &str) -> String {
    let mut components: Vec<&str> = if input.starts_with(SEPARATOR) {
        Vec::new()
    } else {
        segments(base).collect()
    };

    for component in input.split(SEPARATOR) {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            name => components.push(name),
        }
    }

    from_segments(components)
}

pub fn normalize_path(path: &str) -> String {
    resolve_path(ROOT, path)
}

/// Number of segments below the root; the root itself has depth 0.
pub fn depth(path: &str) -> usize {
    segments(path).count()
}

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

pub fn join_path(parent: &str, name: &str) -> String {
    if parent == ROOT || parent.is_empty() {
        format!("{SEPARATOR}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Parent of a normalized path. The root is its own parent.
pub fn parent_path(path: &str) -> String {
    let mut components: Vec<&str> = segments(path).collect();
    components.pop();
    from_segments(components)
}

/// Last segment of a normalized path, `None` for the root.
pub fn file_name(path: &str) -> Option<&str> {
    segments(path).last()
}

pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// True when `path` equals `ancestor` or lies somewhere below it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if is_root(ancestor) {
        return true;
    }
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
}

fn from_segments<'a>(components: impl IntoIterator<Item = &'a str>) -> String {
    let mut path = String::new();
    for component in components {
        path.push(SEPARATOR);
        path.push_str(component);
    }
    if path.is_empty() {
        path.push(SEPARATOR);
    }
    path
}
