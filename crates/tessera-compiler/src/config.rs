//! Compilation options.

/// Options for a single compilation run.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Contract the artifact is built for
    pub(crate) entry: String,
    /// Output file prefix; defaults to the entry name
    pub(crate) basename: Option<String>,
    /// Keep procedure comments in the output
    pub(crate) debug: bool,
    /// Value of the `#pragma version` line
    pub(crate) pragma_version: String,
}

impl CompileOptions {
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            basename: None,
            debug: false,
            pragma_version: "0.4.6".to_owned(),
        }
    }

    /// Set the output file prefix.
    pub fn basename(mut self, value: impl Into<String>) -> Self {
        self.basename = Some(value.into());
        self
    }

    /// Set whether generated procedures keep their comments.
    pub fn debug(mut self, value: bool) -> Self {
        self.debug = value;
        self
    }

    pub fn pragma_version(mut self, value: impl Into<String>) -> Self {
        self.pragma_version = value.into();
        self
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub(crate) fn file_prefix(&self) -> &str {
        self.basename.as_deref().unwrap_or(&self.entry)
    }
}
