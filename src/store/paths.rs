use std::path::PathBuf;

use anyhow::{bail, Result};

/// Display-name marker of the Insiders build of the editor.
const INSIDERS: &str = "Code - Insiders";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Darwin,
    Linux,
    Windows,
    Other,
}

impl OsFamily {
    /// The family this binary was built for.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Self::Darwin,
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }

    /// Map an `os.type()`-style name (`Darwin`, `Linux`, `Windows_NT`).
    pub fn from_os_type(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "darwin" => Self::Darwin,
            "linux" => Self::Linux,
            "windows_nt" | "windows" => Self::Windows,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorVariant {
    Stable,
    Insiders,
}

impl EditorVariant {
    pub fn from_editor_name(name: &str) -> Self {
        if name.contains(INSIDERS) {
            Self::Insiders
        } else {
            Self::Stable
        }
    }

    /// Directory name under the platform's config root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Stable => "Code",
            Self::Insiders => INSIDERS,
        }
    }
}

/// Everything path resolution depends on, captured once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformContext {
    pub os: OsFamily,
    pub home_dir: String,
    pub appdata_dir: String,
    pub editor: EditorVariant,
}

impl PlatformContext {
    /// Build the context for the running process: `HOME` and `APPDATA`
    /// from the environment, falling back to the platform's known dirs.
    pub fn detect(os: OsFamily, editor_name: &str) -> Result<Self> {
        let home_dir = env_dir("HOME", dirs::home_dir);
        let appdata_dir = env_dir("APPDATA", dirs::config_dir);

        let base = match os {
            OsFamily::Windows => &appdata_dir,
            _ => &home_dir,
        };
        if base.is_none() {
            bail!("Could not determine the editor's user settings directory");
        }

        Ok(Self {
            os,
            home_dir: home_dir.unwrap_or_default(),
            appdata_dir: appdata_dir.unwrap_or_default(),
            editor: EditorVariant::from_editor_name(editor_name),
        })
    }

    fn separator(&self) -> char {
        match self.os {
            OsFamily::Windows => '\\',
            _ => '/',
        }
    }

    /// The editor's `User` directory, with a trailing separator.
    pub fn user_dir(&self) -> String {
        let editor = self.editor.dir_name();
        match self.os {
            OsFamily::Darwin => format!(
                "{}/Library/Application Support/{editor}/User/",
                self.home_dir
            ),
            OsFamily::Windows => format!("{}\\{editor}\\User\\", self.appdata_dir),
            OsFamily::Linux | OsFamily::Other => {
                format!("{}/.config/{editor}/User/", self.home_dir)
            }
        }
    }

    /// Snippet file for `language`, e.g. `~/.config/Code/User/snippets/rust.json`.
    pub fn snippet_file(&self, language: &str) -> PathBuf {
        PathBuf::from(format!(
            "{}snippets{}{language}.json",
            self.user_dir(),
            self.separator()
        ))
    }
}

fn env_dir(var: &str, fallback: fn() -> Option<PathBuf>) -> Option<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| fallback().map(|p| p.to_string_lossy().to_string()))
}
