pub mod paths;
pub mod snippet_file;

pub use paths::{OsFamily, PlatformContext};
pub use snippet_file::SnippetFile;
