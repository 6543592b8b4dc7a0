use snafu::Snafu;

/// Failure of a single tree operation.
///
/// The display text is the bare reason in conventional shell phrasing; the
/// shell layer prefixes it with the command and operand.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TreeError {
    #[snafu(display("No such file or directory"))]
    NotFound { path: String },
    #[snafu(display("Not a directory"))]
    NotADirectory { path: String },
    #[snafu(display("Is a directory"))]
    NotAFile { path: String },
    #[snafu(display("File exists"))]
    AlreadyExists { path: String },
    #[snafu(display(
        "Invalid name '{}': only letters, digits, '-', '_' and '.' are allowed",
        name
    ))]
    InvalidName { name: String },
    #[snafu(display(
        "Unsupported file extension '{}' (supported: {})",
        extension,
        supported
    ))]
    UnsupportedExtension {
        name: String,
        extension: String,
        supported: String,
    },
    #[snafu(display("Maximum directory depth of {} exceeded", max))]
    MaxDepthExceeded { path: String, max: usize },
    #[snafu(display("Directory not empty"))]
    NotEmpty { path: String },
    #[snafu(display("Cannot remove the root directory"))]
    CannotDeleteRoot,
}
