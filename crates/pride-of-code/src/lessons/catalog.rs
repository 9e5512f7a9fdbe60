//! Lesson catalogs: TOML files of `[[lesson]]` tables.
//!
//! ```toml
//! [[lesson]]
//! id = "week4_box"
//! title = "Boxes"
//! starter = "band.form_line(brass, 10, 10, 40, 10)\n"
//! points = 40
//! rule = { kind = "line", section = "brass", x1 = 10, y1 = 10, x2 = 40, y2 = 10 }
//! ```

use super::{DEFAULT_LESSON_BAND_SIZE, Lesson, LessonRegistry, Rule};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid lesson '{id}': {reason}")]
    Invalid { id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub starter: String,
    #[serde(default = "default_band_size")]
    pub band_size: usize,
    #[serde(default)]
    pub points: Option<f64>,
    #[serde(default)]
    pub rule: Option<Rule>,
}

fn default_band_size() -> usize {
    DEFAULT_LESSON_BAND_SIZE
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "lesson")]
    lessons: Vec<CatalogEntry>,
}

impl CatalogEntry {
    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::Invalid {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.band_size == 0 {
            return Err(invalid("band_size must be at least 1"));
        }
        if self.points.is_some_and(|points| !(points.is_finite() && points >= 0.0)) {
            return Err(invalid("points must be a non-negative number"));
        }
        Ok(())
    }

    pub fn into_lesson(self) -> Lesson {
        let mut lesson = Lesson::new(self.id, self.title, self.starter).with_band_size(self.band_size);
        lesson.points = self.points;
        match self.rule {
            Some(rule) => lesson.with_validator(rule),
            None => lesson,
        }
    }
}

pub fn parse_catalog(content: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
    let file: CatalogFile = toml::from_str(content)?;
    for entry in &file.lessons {
        entry.validate()?;
    }
    Ok(file.lessons)
}

pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    let content = fs::read_to_string(path)?;
    parse_catalog(&content)
}

impl LessonRegistry {
    /// Registers every lesson of the catalog at `path`. Returns how many were read.
    pub fn load_catalog(&mut self, path: &Path) -> Result<usize, CatalogError> {
        let entries = load_catalog(path)?;
        let count = entries.len();
        for entry in entries {
            if let Some(replaced) = self.insert(entry.into_lesson()) {
                debug!(lesson = replaced.id, "catalog replaced lesson");
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::Section;
    use crate::lessons::{BindingKind, DEFAULT_TOLERANCE};
    use std::io::Write;

    const CATALOG: &str = r#"
[[lesson]]
id = "week4_box"
title = "Boxes"
starter = "band.form_line(brass, 10, 10, 40, 10)\n"
points = 40
rule = { kind = "line", section = "brass", x1 = 10, y1 = 10, x2 = 40, y2 = 10 }

[[lesson]]
id = "week1"
title = "Lists (remixed)"
band_size = 8

[lesson.rule]
kind = "all_of"
rules = [
    { kind = "sequence_length", name = "brass_section", min_len = 2 },
    { kind = "binding", name = "leader", expected = "member" },
]
"#;

    #[test]
    fn parses_entries_with_defaults() {
        let entries = parse_catalog(
            r#"
[[lesson]]
id = "free"
title = "Free play"
"#,
        )
        .unwrap();
        assert_eq!(
            entries,
            vec![CatalogEntry {
                id: "free".to_string(),
                title: "Free play".to_string(),
                starter: String::new(),
                band_size: 16,
                points: None,
                rule: None,
            }]
        );
    }

    #[test]
    fn parses_rules() {
        let entries = parse_catalog(CATALOG).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].points, Some(40.0));
        assert_eq!(entries[0].starter, "band.form_line(brass, 10, 10, 40, 10)\n");
        assert_eq!(
            entries[0].rule,
            Some(Rule::Line {
                section: Some(Section::Brass),
                x1: 10.0,
                y1: 10.0,
                x2: 40.0,
                y2: 10.0,
                tolerance: DEFAULT_TOLERANCE,
            })
        );
        assert_eq!(entries[1].band_size, 8);
        assert_eq!(
            entries[1].rule,
            Some(Rule::AllOf {
                rules: vec![
                    Rule::SequenceLength {
                        name: "brass_section".to_string(),
                        min_len: 2,
                    },
                    Rule::Binding {
                        name: "leader".to_string(),
                        expected: BindingKind::Member,
                    },
                ],
            })
        );
    }

    #[test]
    fn rejects_bad_entries() {
        let error = parse_catalog("[[lesson]]\nid = \"x\"\ntitle = \"X\"\nband_size = 0\n").unwrap_err();
        assert_eq!(error.to_string(), "Invalid lesson 'x': band_size must be at least 1");
        assert!(matches!(
            parse_catalog("[[lesson]]\ntitle = \"no id\"\n"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn loads_into_a_registry() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[lesson]]
id = "week1"
title = "Lists (remixed)"
band_size = 8
rule = {{ kind = "sequence_length", name = "brass_section", min_len = 2 }}

[[lesson]]
id = "week4_box"
title = "Boxes"
"#
        )
        .unwrap();
        let mut registry = LessonRegistry::with_builtin_lessons();
        assert_eq!(registry.load_catalog(file.path()).unwrap(), 2);
        assert_eq!(registry.len(), 6);
        let week1 = registry.get("week1").unwrap();
        assert_eq!((week1.title.as_str(), week1.band_size), ("Lists (remixed)", 8));
        assert!(registry.get("week4_box").unwrap().validator().is_none());
    }
}
