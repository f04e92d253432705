/// Capabilities the surrounding editor provides to the importer.
///
/// Notifications are fire-and-forget: nothing waits for the user to see them.
pub trait Host: Send + Sync {
    fn notify_info(&self, text: &str);
    fn notify_error(&self, text: &str);
    /// Display name of the running editor, e.g. `Visual Studio Code - Insiders`.
    fn current_editor_name(&self) -> &str;
}

/// Host for command-line use: messages go to stderr.
pub struct ConsoleHost {
    editor_name: String,
}

impl ConsoleHost {
    pub fn new(editor_name: impl Into<String>) -> Self {
        Self {
            editor_name: editor_name.into(),
        }
    }
}

impl Host for ConsoleHost {
    fn notify_info(&self, text: &str) {
        eprintln!("{text}");
    }

    fn notify_error(&self, text: &str) {
        eprintln!("error: {text}");
    }

    fn current_editor_name(&self) -> &str {
        &self.editor_name
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::Host;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Notice {
        Info(String),
        Error(String),
    }

    /// Records notifications instead of showing them.
    pub struct RecordingHost {
        editor_name: String,
        notices: Mutex<Vec<Notice>>,
    }

    impl RecordingHost {
        pub fn new(editor_name: &str) -> Self {
            Self {
                editor_name: editor_name.into(),
                notices: Mutex::new(Vec::new()),
            }
        }

        pub fn notices(&self) -> Vec<Notice> {
            self.notices.lock().unwrap().clone()
        }

        pub fn errors(&self) -> Vec<String> {
            self.notices()
                .into_iter()
                .filter_map(|n| match n {
                    Notice::Error(text) => Some(text),
                    Notice::Info(_) => None,
                })
                .collect()
        }
    }

    impl Host for RecordingHost {
        fn notify_info(&self, text: &str) {
            self.notices.lock().unwrap().push(Notice::Info(text.into()));
        }

        fn notify_error(&self, text: &str) {
            self.notices.lock().unwrap().push(Notice::Error(text.into()));
        }

        fn current_editor_name(&self) -> &str {
            &self.editor_name
        }
    }
}
