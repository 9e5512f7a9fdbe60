use super::{DEFAULT_TOLERANCE, Rule, ScriptState, Validator, Verdict};
use crate::band::Section;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::error;

pub const DEFAULT_LESSON_BAND_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LessonError {
    #[error("unknown lesson '{0}'")]
    UnknownLesson(String),
    #[error("lesson '{0}' has no validator")]
    MissingValidator(String),
}

/// A registered lesson. Immutable once it is in a registry.
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub starter_script: String,
    pub band_size: usize,
    /// `None` earns the configured base points.
    pub points: Option<f64>,
    validator: Option<Box<dyn Validator>>,
}

impl Lesson {
    pub fn new(id: impl Into<String>, title: impl Into<String>, starter_script: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            starter_script: starter_script.into(),
            band_size: DEFAULT_LESSON_BAND_SIZE,
            points: None,
            validator: None,
        }
    }

    pub fn with_band_size(mut self, band_size: usize) -> Self {
        self.band_size = band_size;
        self
    }

    pub fn with_points(mut self, points: f64) -> Self {
        self.points = Some(points);
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn validator(&self) -> Option<&dyn Validator> {
        self.validator.as_deref()
    }

    pub fn summary(&self) -> LessonSummary {
        LessonSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            band_size: self.band_size,
            points: self.points,
            has_validator: self.validator.is_some(),
        }
    }
}

impl fmt::Debug for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Lesson")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("band_size", &self.band_size)
            .field("points", &self.points)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

/// What the presentation layer lists in a lesson picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
    pub band_size: usize,
    pub points: Option<f64>,
    pub has_validator: bool,
}

/// Lessons by id, in registration order.
#[derive(Debug, Default)]
pub struct LessonRegistry {
    lessons: IndexMap<String, Lesson>,
}

impl LessonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in course.
    pub fn with_builtin_lessons() -> Self {
        let mut registry = Self::new();
        for lesson in builtin_lessons() {
            registry.insert(lesson);
        }
        registry
    }

    pub fn register(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        starter_script: impl Into<String>,
        validator: impl Validator + 'static,
    ) {
        self.insert(Lesson::new(id, title, starter_script).with_validator(validator));
    }

    /// Adds `lesson`, replacing and returning any lesson with the same id.
    /// A replacement keeps the original's position.
    pub fn insert(&mut self, lesson: Lesson) -> Option<Lesson> {
        self.lessons.insert(lesson.id.clone(), lesson)
    }

    pub fn get(&self, id: &str) -> Result<&Lesson, LessonError> {
        self.lessons
            .get(id)
            .ok_or_else(|| LessonError::UnknownLesson(id.to_string()))
    }

    pub fn check(&self, id: &str, state: &ScriptState<'_>) -> Result<Verdict, LessonError> {
        let lesson = self.get(id)?;
        let validator = lesson
            .validator()
            .ok_or_else(|| LessonError::MissingValidator(id.to_string()))?;
        Ok(validator.validate(state))
    }

    /// [`Self::check`] flattened into a verdict the learner can read.
    pub fn validate(&self, id: &str, state: &ScriptState<'_>) -> Verdict {
        match self.check(id, state) {
            Ok(verdict) => verdict,
            Err(LessonError::UnknownLesson(_)) => Verdict::fail("Unknown level"),
            Err(LessonError::MissingValidator(_)) => {
                error!(lesson = id, "registered lesson has no validator");
                Verdict::fail("No validator")
            }
        }
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.lessons.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

fn builtin_lessons() -> Vec<Lesson> {
    vec![
        Lesson::new(
            "week1",
            "Week 1 - Lists",
            "# Make a list called brass_section with at least three brass players.\n\
             brass_section = []\n",
        )
        .with_validator(Rule::SequenceLength {
            name: "brass_section".to_string(),
            min_len: 3,
        }),
        Lesson::new(
            "week1_lesson1",
            "Variables & Movement",
            "# Store the first member in a variable and march them to midfield.\n\
             member = members[0]\n\
             band.move_to(member, 0, 0)\n",
        )
        .with_validator(Rule::MemberNear {
            member: 0,
            x: 50.0,
            y: 25.0,
            tolerance: DEFAULT_TOLERANCE,
        }),
        Lesson::new(
            "week2_circle",
            "Circles",
            "# Arrange the brass section in a circle around the 50 yard line.\n\
             band.form_circle(brass, 50, 26, 1)\n",
        )
        .with_validator(Rule::Circle {
            section: Some(Section::Brass),
            cx: 50.0,
            cy: 26.0,
            radius: 10.0,
            tolerance: DEFAULT_TOLERANCE,
        }),
        Lesson::new(
            "week2_line",
            "Lines",
            "# Line the woodwinds up from (20, 20) to (80, 20).\n\
             band.form_line(woodwind, 20, 30, 80, 30)\n",
        )
        .with_validator(Rule::Line {
            section: Some(Section::Woodwind),
            x1: 20.0,
            y1: 20.0,
            x2: 80.0,
            y2: 20.0,
            tolerance: DEFAULT_TOLERANCE,
        }),
        Lesson::new(
            "week3_loops",
            "Loops",
            "# Use a for loop to march every guard member 5 steps forward.\n\
             for member in guard:\n    pass\n",
        )
        .with_validator(Rule::Region {
            section: Some(Section::Guard),
            min_x: 0.0,
            max_x: 100.0,
            min_y: 4.5,
            max_y: 5.5,
        }),
    ]
}
