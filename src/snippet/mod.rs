pub mod importer;
pub mod model;

pub use importer::SnippetImporter;
pub use model::Snippet;
