//! Pride of Code: learners write small formation scripts that drive a
//! marching band around a football field.
//!
//! The crate runs those scripts in a sandbox ([`executor`]), grades the band
//! they leave behind ([`lessons`]) and keeps score ([`scoring`]). [`session`]
//! ties the three together the way the game's editor screen uses them.

pub mod band;
pub mod config;
pub mod executor;
pub mod interpreter;
pub mod lessons;
pub mod parser;
pub mod scoring;
pub mod session;

pub use band::{BandMember, Facing, MemberId, MemberSnapshot, Roster, RosterError, Section};
pub use config::{Config, ConfigError, load_config};
pub use executor::{ExecutionResult, Executor, Failure};
pub use lessons::{Lesson, LessonError, LessonRegistry, Rule, ScriptState, Validator, Verdict};
pub use scoring::{ScoreSnapshot, ScoreTracker};
pub use session::{Attempt, Session};

/// Runs `f`, first moving to a fresh stack segment if less than 64 KiB is
/// left. The recursive walks over scripts go through here, like chumsky's
/// `recursive` parsers do.
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(64 * 1024, 1024 * 1024, f)
}
