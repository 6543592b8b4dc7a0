use derive_more::Deref;

pub const DEFAULT_EXTENSIONS: [&str; 4] = ["yaml", "yml", "json", "kyaml"];

/// Set of file extensions a tree accepts, stored without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct ExtensionAllowList {
    extensions: Vec<String>,
}

impl ExtensionAllowList {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for extension in extensions {
            let extension = extension.as_ref().trim().trim_start_matches('.');
            if extension.is_empty() {
                continue;
            }
            let extension = extension.to_ascii_lowercase();
            if !normalized.contains(&extension) {
                normalized.push(extension);
            }
        }
        Self {
            extensions: normalized,
        }
    }

    pub fn allows(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    /// Human readable form, e.g. `.yaml, .json`.
    pub fn describe(&self) -> String {
        self.extensions
            .iter()
            .map(|extension| format!(".{extension}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ExtensionAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

/// Extension of a file name: the text after the last dot.
///
/// Names without a dot, names ending in a dot and dot-files such as
/// `.yaml` have no extension.
pub fn extension_of(name: &str) -> Option<&str> {
    let (stem, extension) = name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("pod.yaml", Some("yaml"))]
    #[case("archive.tar.json", Some("json"))]
    #[case("Makefile", None)]
    #[case(".yaml", None)]
    #[case("trailing.", None)]
    #[case("", None)]
    fn test_extension_of(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(extension_of(name), expected);
    }

    #[test]
    fn test_default_allow_list() {
        let allow_list = ExtensionAllowList::default();
        assert!(allow_list.allows("yaml"));
        assert!(allow_list.allows("kyaml"));
        assert!(allow_list.allows("JSON"));
        assert!(!allow_list.allows("txt"));
        assert_eq!(allow_list.describe(), ".yaml, .yml, .json, .kyaml");
    }

    #[test]
    fn test_custom_allow_list_normalizes_entries() {
        let allow_list = ExtensionAllowList::new([".TXT", "md", " ", "txt"]);
        assert_eq!(allow_list.len(), 2);
        assert!(allow_list.allows("txt"));
        assert!(allow_list.allows("md"));
        assert!(!allow_list.allows("yaml"));
    }
}
