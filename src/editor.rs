//! In-memory editor document
//!
//! Holds the text the playground runs, a 1-based cursor, and the diagnostics
//! markers reported for the document.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub severity: Severity,
    pub start_line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct EditorBuffer {
    text: String,
    cursor: Position,
    markers: Vec<Marker>,
    tab_size: usize,
}

impl EditorBuffer {
    pub fn new(text: impl Into<String>, tab_size: usize) -> Self {
        Self {
            text: text.into(),
            cursor: Position::default(),
            markers: Vec::new(),
            tab_size,
        }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    /// Replace the whole document; the cursor returns to the start
    pub fn set_value(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = Position::default();
        self.markers.clear();
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Move the cursor, clamped to the document
    pub fn set_cursor(&mut self, position: Position) {
        let line_count = self.text.split('\n').count();
        let line = position.line.clamp(1, line_count);
        let line_len = self
            .text
            .split('\n')
            .nth(line - 1)
            .map(|l| l.chars().count())
            .unwrap_or(0);
        let column = position.column.clamp(1, line_len + 1);
        self.cursor = Position { line, column };
    }

    /// Insert `text` at the cursor and move the cursor past it
    pub fn insert_at_cursor(&mut self, text: &str) {
        let offset = self.byte_offset(self.cursor);
        self.text.insert_str(offset, text);

        let mut cursor = self.cursor;
        match text.rsplit_once('\n') {
            Some((head, tail)) => {
                cursor.line += head.matches('\n').count() + 1;
                cursor.column = tail.chars().count() + 1;
            }
            None => cursor.column += text.chars().count(),
        }
        self.cursor = cursor;
    }

    fn byte_offset(&self, position: Position) -> usize {
        let mut offset = 0;
        for (idx, line) in self.text.split('\n').enumerate() {
            if idx + 1 == position.line {
                let column_offset = line
                    .char_indices()
                    .nth(position.column - 1)
                    .map(|(i, _)| i)
                    .unwrap_or(line.len());
                return offset + column_offset;
            }
            offset += line.len() + 1;
        }
        self.text.len()
    }

    /// Size of the document in bytes
    pub fn byte_size(&self) -> usize {
        self.text.len()
    }

    /// Normalize the document: tabs become spaces, trailing whitespace is
    /// stripped and the document ends with exactly one newline.
    pub fn format(&mut self) {
        let indent = " ".repeat(self.tab_size);
        let mut lines: Vec<String> = self
            .text
            .lines()
            .map(|line| line.replace('\t', &indent).trim_end().to_string())
            .collect();

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        let mut formatted = lines.join("\n");
        if !formatted.is_empty() {
            formatted.push('\n');
        }

        let cursor = self.cursor;
        self.text = formatted;
        self.set_cursor(cursor);
    }

    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        self.markers = markers;
    }

    /// Problems list built from the current markers
    pub fn problems(&self) -> Vec<Problem> {
        self.markers
            .iter()
            .map(|marker| Problem {
                severity: marker.severity,
                text: format!("Line {}: {}", marker.start_line, marker.message),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_at_cursor() {
        let mut editor = EditorBuffer::new("let x = ;\nfoo()", 4);
        editor.set_cursor(Position { line: 1, column: 9 });
        editor.insert_at_cursor("42");

        assert_eq!(editor.value(), "let x = 42;\nfoo()");
        assert_eq!(editor.cursor(), Position { line: 1, column: 11 });
    }

    #[test]
    fn test_multiline_insert_moves_cursor() {
        let mut editor = EditorBuffer::new("a\nb", 4);
        editor.set_cursor(Position { line: 2, column: 2 });
        editor.insert_at_cursor("\nif (x) {\n\ty();\n}");

        assert_eq!(editor.value(), "a\nb\nif (x) {\n\ty();\n}");
        assert_eq!(editor.cursor(), Position { line: 5, column: 2 });
    }

    #[test]
    fn test_insert_handles_multibyte_text() {
        let mut editor = EditorBuffer::new("héllo", 4);
        editor.set_cursor(Position { line: 1, column: 3 });
        editor.insert_at_cursor("X");

        assert_eq!(editor.value(), "héXllo");
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut editor = EditorBuffer::new("ab\nc", 4);
        editor.set_cursor(Position {
            line: 10,
            column: 10,
        });
        assert_eq!(editor.cursor(), Position { line: 2, column: 2 });

        editor.set_cursor(Position { line: 0, column: 0 });
        assert_eq!(editor.cursor(), Position { line: 1, column: 1 });
    }

    #[test]
    fn test_set_value_resets_cursor() {
        let mut editor = EditorBuffer::new("abc", 4);
        editor.set_cursor(Position { line: 1, column: 3 });
        editor.set_value("");

        assert_eq!(editor.cursor(), Position::default());
        editor.insert_at_cursor("x");
        assert_eq!(editor.value(), "x");
    }

    #[test]
    fn test_format() {
        let mut editor = EditorBuffer::new("function f() {\n\treturn 1;   \n}\n\n\n", 4);
        editor.format();

        assert_eq!(editor.value(), "function f() {\n    return 1;\n}\n");
    }

    #[test]
    fn test_format_empty_document() {
        let mut editor = EditorBuffer::new("\n\n  \n", 2);
        editor.format();
        assert_eq!(editor.value(), "");
    }

    #[test]
    fn test_byte_size() {
        let editor = EditorBuffer::new("é", 4);
        assert_eq!(editor.byte_size(), 2);
    }

    #[test]
    fn test_problems() {
        let mut editor = EditorBuffer::new("x", 4);
        assert!(editor.problems().is_empty());

        editor.set_markers(vec![Marker {
            severity: Severity::Error,
            start_line: 3,
            message: "';' expected.".into(),
        }]);

        assert_eq!(
            editor.problems(),
            vec![Problem {
                severity: Severity::Error,
                text: "Line 3: ';' expected.".into(),
            }]
        );
    }
}
