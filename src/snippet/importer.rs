use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex as FileLock, OwnedMutexGuard};

use super::model::Snippet;
use crate::host::Host;
use crate::jsonc::{self, EditError, FormattingOptions, ParseError, ParseOptions};
use crate::store::{PlatformContext, SnippetFile};

/// What was written, after renaming and defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedSnippet {
    pub snippet: Snippet,
    pub path: PathBuf,
    /// The requested name, when it was already taken.
    pub renamed_from: Option<String>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid snippet: {0}")]
    Invalid(String),
    #[error("Could not create {language} snippet file: {reason}")]
    Bootstrap { language: String, reason: String },
    #[error("Could not read {language} snippet file: {reason}")]
    Read { language: String, reason: String },
    #[error("{}", parse_failure_message(.language, .errors))]
    Parse {
        language: String,
        errors: Vec<ParseError>,
    },
    #[error("Could not add snippet to {language} snippet file: {source}")]
    Edit {
        language: String,
        #[source]
        source: EditError,
    },
    #[error("Could not write {language} snippet file: {reason}")]
    Write { language: String, reason: String },
}

fn parse_failure_message(language: &str, errors: &[ParseError]) -> String {
    let items: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!(
        "Error{} on parsing current {language} snippet file: {}",
        if errors.len() > 1 { "s" } else { "" },
        items.join(", ")
    )
}

/// Layout used for inserted entries, matching the editor's own snippet files.
fn snippet_formatting() -> FormattingOptions {
    FormattingOptions {
        tab_size: 2,
        insert_spaces: false,
        eol: None,
    }
}

/// One async lock per snippet file so concurrent adds cannot lose updates.
/// Entries are never evicted; there is at most one per language file.
#[derive(Default)]
struct FileLocks {
    locks: Mutex<HashMap<PathBuf, Arc<FileLock<()>>>>,
}

impl FileLocks {
    async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

/// Adds snippets to the editor's per-language snippet files.
pub struct SnippetImporter<H> {
    host: H,
    platform: PlatformContext,
    locks: FileLocks,
}

impl<H: Host> SnippetImporter<H> {
    pub fn new(host: H, platform: PlatformContext) -> Self {
        Self {
            host,
            platform,
            locks: FileLocks::default(),
        }
    }

    pub fn platform(&self) -> &PlatformContext {
        &self.platform
    }

    pub fn snippet_file(&self, language: &str) -> PathBuf {
        self.platform.snippet_file(language)
    }

    /// Add `snippet` to its language's snippet file.
    ///
    /// The outcome is both returned and shown through the host: an info
    /// notification on success, an error notification otherwise. On any
    /// failure the file is left as it was (apart from being created empty).
    pub async fn add_snippet(&self, snippet: Snippet) -> Result<AddedSnippet, ImportError> {
        let result = self.import(snippet).await;
        match &result {
            Ok(added) => {
                tracing::info!(
                    "Added snippet '{}' to {}",
                    added.snippet.name,
                    added.path.display()
                );
                self.host.notify_info(&format!(
                    "Snippet {} added to {} snippets",
                    added.snippet.name, added.snippet.language
                ));
            }
            Err(e) => {
                tracing::warn!("Snippet not added: {e}");
                self.host.notify_error(&e.to_string());
            }
        }
        result
    }

    async fn import(&self, snippet: Snippet) -> Result<AddedSnippet, ImportError> {
        snippet
            .validate()
            .map_err(|e| ImportError::Invalid(format!("{e:#}")))?;

        let language = snippet.language.clone();
        let file = SnippetFile::new(self.platform.snippet_file(&language));
        let _guard = self.locks.acquire(file.path()).await;

        file.ensure_exists()
            .await
            .map_err(|e| ImportError::Bootstrap {
                language: language.clone(),
                reason: format!("{e:#}"),
            })?;
        let text = file.read().await.map_err(|e| ImportError::Read {
            language: language.clone(),
            reason: format!("{e:#}"),
        })?;

        let (snippets, errors) = jsonc::parse(&text, ParseOptions::default());
        if !errors.is_empty() {
            return Err(ImportError::Parse { language, errors });
        }

        let taken = snippets
            .as_ref()
            .and_then(Value::as_object)
            .is_some_and(|members| members.contains_key(&snippet.name));
        let (snippet, renamed_from) = if taken {
            self.host.notify_error(&format!(
                "A snippet {} already exists - so adding a unique id",
                snippet.name
            ));
            let requested = snippet.name.clone();
            let snippet = snippet.with_unique_name();
            tracing::debug!("Renamed snippet '{}' to '{}'", requested, snippet.name);
            (snippet, Some(requested))
        } else {
            (snippet, None)
        };
        let snippet = snippet.normalized();

        let edit_error = |source: EditError| ImportError::Edit {
            language: language.clone(),
            source,
        };
        let entry = serde_json::to_value(snippet.entry()).map_err(|e| edit_error(e.into()))?;
        let edits = jsonc::modify(
            &text,
            &[snippet.name.as_str()],
            &entry,
            &snippet_formatting(),
        )
        .map_err(edit_error)?;
        let updated = jsonc::apply_edits(&text, &edits);

        file.write(&updated).await.map_err(|e| ImportError::Write {
            language: language.clone(),
            reason: format!("{e:#}"),
        })?;

        Ok(AddedSnippet {
            path: file.path().to_path_buf(),
            snippet,
            renamed_from,
        })
    }
}
