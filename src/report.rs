//! Markdown summaries written next to the generated decks.
//!
//! Every case drops a `README.md` documenting the parameters it was built
//! from, so a deck checked into a repository stays self-describing.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::errors::GenerateError;

/// A titled table of parameter rows.
#[derive(Clone, Debug)]
pub struct SummarySection {
    heading: String,
    rows: Vec<(String, String)>,
}

impl SummarySection {
    /// Start an empty section.
    #[must_use]
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            rows: Vec::new(),
        }
    }

    /// Append a parameter row.
    #[must_use]
    pub fn row(mut self, parameter: impl Into<String>, value: impl ToString) -> Self {
        self.rows.push((parameter.into(), value.to_string()));
        self
    }
}

/// The summary document of one generated case.
#[derive(Clone, Debug)]
pub struct Summary {
    title: String,
    description: String,
    sections: Vec<SummarySection>,
}

impl Summary {
    /// Start a summary with a title and a one paragraph description.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            sections: Vec::new(),
        }
    }

    /// Append a parameter section.
    #[must_use]
    pub fn section(mut self, section: SummarySection) -> Self {
        self.sections.push(section);
        self
    }

    /// Render the summary as markdown, timestamp line included.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}", self.title);
        out.push('\n');
        out.push_str(&self.description);
        out.push('\n');
        for section in &self.sections {
            out.push('\n');
            let _ = writeln!(out, "## {}", section.heading);
            out.push('\n');
            out.push_str("| Parameter | Value |\n");
            out.push_str("|:--|:--|\n");
            for (parameter, value) in &section.rows {
                let _ = writeln!(out, "| {parameter} | {value} |");
            }
        }
        out.push('\n');
        let _ = writeln!(
            out,
            "Last updated: {}",
            Local::now().format("%B %d, %Y at %I:%M%p")
        );
        out
    }

    /// Write the summary to `target`; a directory target gets a `README.md`
    /// inside it.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Io`] when the file cannot be written.
    pub fn write(&self, target: &Path) -> Result<PathBuf, GenerateError> {
        let path = if target.is_dir() {
            target.join("README.md")
        } else {
            target.to_path_buf()
        };
        fs::write(&path, self.to_markdown()).map_err(|source| GenerateError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Summary {
        Summary::new("Bending beam", "A cantilever loaded by an end shear force.")
            .section(
                SummarySection::new("Geometry")
                    .row("Length", 20.0)
                    .row("Height", 2),
            )
            .section(SummarySection::new("Material").row("Young's modulus", 1.0e7))
    }

    #[test]
    fn markdown_contains_title_tables_and_timestamp() {
        let markdown = sample().to_markdown();
        assert!(markdown.starts_with("# Bending beam\n"));
        assert!(markdown.contains("A cantilever loaded by an end shear force."));
        assert!(markdown.contains("## Geometry"));
        assert!(markdown.contains("| Parameter | Value |"));
        assert!(markdown.contains("|:--|:--|"));
        assert!(markdown.contains("| Length | 20 |"));
        assert!(markdown.contains("| Young's modulus | 10000000 |"));
        assert!(markdown.contains("\nLast updated: "));
    }

    #[test]
    fn directory_targets_get_a_readme() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = sample().write(dir.path()).expect("writes");
        assert_eq!(path, dir.path().join("README.md"));
        let contents = std::fs::read_to_string(path).expect("readable");
        assert!(contents.contains("## Material"));
    }
}
