//! Session files and snippet palette (in-memory only)

use std::collections::BTreeMap;

use serde::Serialize;

pub const DEFAULT_FILE: &str = "untitled.js";

/// Default snippets offered in every session
const DEFAULT_SNIPPETS: &[(&str, &str)] = &[
    ("Console Log", "console.log()"),
    ("Function", "function $1($2) {\n\t$3\n}"),
    ("Arrow Function", "const $1 = ($2) => {\n\t$3\n}"),
    ("For Loop", "for (let i = 0; i < $1; i++) {\n\t$2\n}"),
    ("If Statement", "if ($1) {\n\t$2\n}"),
    ("Try Catch", "try {\n\t$1\n} catch (error) {\n\t$2\n}"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub active: bool,
}

/// File name -> content, plus which file the editor shows
#[derive(Debug, Clone)]
pub struct FileStore {
    files: BTreeMap<String, String>,
    current: String,
}

impl FileStore {
    pub fn new(initial_content: impl Into<String>) -> Self {
        let mut files = BTreeMap::new();
        files.insert(DEFAULT_FILE.to_string(), initial_content.into());
        Self {
            files,
            current: DEFAULT_FILE.to_string(),
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Store `content` under the current file
    pub fn save_current(&mut self, content: impl Into<String>) {
        self.files.insert(self.current.clone(), content.into());
    }

    /// Create (or truncate) `name` and make it current
    pub fn create(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.files.insert(name.clone(), String::new());
        self.current = name;
    }

    /// Add a file with content and make it current
    pub fn upload(&mut self, name: impl Into<String>, content: impl Into<String>) {
        let name = name.into();
        self.files.insert(name.clone(), content.into());
        self.current = name;
    }

    /// Make `name` current; returns its content, or None if it does not exist
    pub fn open(&mut self, name: &str) -> Option<&str> {
        let content = self.files.get(name)?;
        self.current = name.to_string();
        Some(content.as_str())
    }

    /// Point the editor at `name` without creating it
    pub fn set_current(&mut self, name: impl Into<String>) {
        self.current = name.into();
    }

    /// First `untitled-N.<extension>` name not taken yet
    pub fn next_untitled(&self, extension: &str) -> String {
        (1..)
            .map(|n| format!("untitled-{}.{}", n, extension))
            .find(|name| !self.files.contains_key(name))
            .unwrap_or_else(|| format!("untitled.{}", extension))
    }

    pub fn list(&self) -> Vec<FileEntry> {
        self.files
            .keys()
            .map(|name| FileEntry {
                name: name.clone(),
                active: *name == self.current,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct SnippetPalette {
    snippets: BTreeMap<String, String>,
}

impl SnippetPalette {
    pub fn add(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.snippets.insert(name.into(), content.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.snippets.get(name).map(String::as_str)
    }

    pub fn list(&self) -> Vec<Snippet> {
        self.snippets
            .iter()
            .map(|(name, content)| Snippet {
                name: name.clone(),
                content: content.clone(),
            })
            .collect()
    }
}

impl Default for SnippetPalette {
    fn default() -> Self {
        let snippets = DEFAULT_SNIPPETS
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();
        Self { snippets }
    }
}
