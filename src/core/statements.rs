//! Statement sources.

use crate::models::phase::Phase;
use crate::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Produces the ordered statements of a phase.
pub trait StatementSource {
    fn statements(&self, phase: &Phase) -> Result<Vec<String>>;
}

/// Reads each phase's SQL file, relative to a base directory.
#[derive(Debug, Clone)]
pub struct SqlFileSource {
    base_dir: PathBuf,
}

impl SqlFileSource {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path_for(&self, phase: &Phase) -> PathBuf {
        if phase.sql_file.is_absolute() {
            phase.sql_file.clone()
        } else {
            self.base_dir.join(&phase.sql_file)
        }
    }
}

impl StatementSource for SqlFileSource {
    fn statements(&self, phase: &Phase) -> Result<Vec<String>> {
        let path = self.path_for(phase);
        let statements = read_sql_file(&path)?;
        tracing::debug!("Read {} statements from {:?}", statements.len(), path);
        Ok(statements)
    }
}

/// Read a SQL file and split it into statements.
pub fn read_sql_file(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    Ok(split_statements(&text))
}

/// Split on lines holding nothing but `;`. Blank pieces are dropped.
pub fn split_statements(text: &str) -> Vec<String> {
    // Only the terminator line splits, so `;` inside a statement is kept.
    static TERMINATOR: OnceLock<Regex> = OnceLock::new();
    TERMINATOR
        .get_or_init(|| Regex::new(r"(?m)^\s*;\s*$").expect("terminator pattern is valid"))
        .split(text)
        .filter(|piece| !piece.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_terminator_lines() {
        let text = "select /*+ label(a) */ 1;\n;\nselect /*+ label(b) */ 'x;y'\n  ;  \n\n";
        let statements = split_statements(text);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("label(a)"));
        assert!(statements[1].contains("'x;y'"));
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_statements("\n;\n").is_empty());
    }
}
