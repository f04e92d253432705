//! JSON with comments: a tolerant parser that reports every structural
//! error with its byte offset, and minimal text edits that leave the rest of
//! a document (comments, layout) untouched.

pub mod edit;
pub mod parser;
pub mod scanner;

pub use edit::{apply_edits, modify, EditError, FormattingOptions};
pub use parser::{parse, ParseError, ParseOptions};
