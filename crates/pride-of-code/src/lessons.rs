//! Lessons and the validators that grade them.
//!
//! A validator only ever sees a [`ScriptState`]: the bindings and the band a
//! finished script left behind. It never runs code itself.

mod validator;
pub use validator::{BindingKind, DEFAULT_TOLERANCE, Rule, ScriptState, Validator, Verdict};

mod registry;
pub use registry::{DEFAULT_LESSON_BAND_SIZE, Lesson, LessonError, LessonRegistry, LessonSummary};

mod catalog;
pub use catalog::{CatalogEntry, CatalogError, load_catalog, parse_catalog};
