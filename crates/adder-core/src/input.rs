// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Source buffers.

/// A named chunk of source text, either a file or a REPL line.
#[derive(Debug, Clone)]
pub struct Input {
    name: String,
    text: String,
}

impl Input {
    /// Create an input from a name and its text.
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// The display name of this input, usually a file path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}
