//! Lesson completion: run, grade, score.

use crate::config::Config;
use crate::executor::{ExecutionResult, Executor};
use crate::lessons::{LessonError, LessonRegistry, Verdict};
use crate::scoring::{ScoreSnapshot, ScoreTracker};
use serde::Serialize;
use tracing::{error, info, info_span};

/// The outcome of one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub lesson: Option<String>,
    pub result: ExecutionResult,
    pub verdict: Option<Verdict>,
    /// Points this attempt earned. Zero unless the lesson passed.
    pub awarded: f64,
    pub score: ScoreSnapshot,
}

impl Attempt {
    pub fn passed(&self) -> bool {
        self.verdict.as_ref().is_some_and(|verdict| verdict.passed)
    }
}

pub struct Session {
    executor: Executor,
    lessons: LessonRegistry,
    score: ScoreTracker,
    base_points: f64,
}

impl Session {
    pub fn new(config: &Config, lessons: LessonRegistry) -> Self {
        Self {
            executor: Executor::from_config(config),
            lessons,
            score: ScoreTracker::new(config.scoring),
            base_points: config.scoring.base_points,
        }
    }

    /// Runs `script`, then grades it when `lesson_id` is given. Without a
    /// lesson the run is free play and the score is left alone.
    pub fn attempt(&mut self, script: &str, lesson_id: Option<&str>) -> Attempt {
        let span = info_span!("attempt", lesson = lesson_id.unwrap_or("-"));
        let _entered = span.enter();

        let Some(lesson_id) = lesson_id else {
            let band_size = self.executor.default_band_size();
            let result = self.executor.execute(script, band_size);
            return self.finish(None, result, None, 0.0);
        };

        let lesson = match self.lessons.get(lesson_id) {
            Ok(lesson) => lesson,
            Err(error) => {
                info!(%error, "attempt at unknown lesson");
                let band_size = self.executor.default_band_size();
                let result = self.executor.execute(script, band_size);
                self.score.reset_streak();
                let verdict = Verdict::fail("Unknown level");
                let result = if result.success {
                    result.into_validation_failure(verdict.message.clone())
                } else {
                    result
                };
                return self.finish(Some(lesson_id), result, Some(verdict), 0.0);
            }
        };
        let points = lesson.points.unwrap_or(self.base_points);
        let (band_size, title) = (lesson.band_size, lesson.title.clone());

        let result = self.executor.execute(script, band_size);
        if !result.success {
            self.score.reset_streak();
            return self.finish(Some(lesson_id), result, None, 0.0);
        }

        match self.lessons.check(lesson_id, &self.executor.state()) {
            Ok(verdict) if verdict.passed => {
                let awarded = self.score.add_points(points, title);
                self.finish(Some(lesson_id), result, Some(verdict), awarded)
            }
            Ok(verdict) => {
                self.score.reset_streak();
                let result = result.into_validation_failure(verdict.message.clone());
                self.finish(Some(lesson_id), result, Some(verdict), 0.0)
            }
            Err(error @ LessonError::MissingValidator(_)) => {
                error!(%error, "cannot grade attempt");
                self.finish(Some(lesson_id), result, Some(Verdict::fail("No validator")), 0.0)
            }
            Err(error @ LessonError::UnknownLesson(_)) => {
                error!(%error, "lesson vanished during attempt");
                let result = result.into_validation_failure("Unknown level");
                self.finish(Some(lesson_id), result, Some(Verdict::fail("Unknown level")), 0.0)
            }
        }
    }

    fn finish(
        &self,
        lesson: Option<&str>,
        result: ExecutionResult,
        verdict: Option<Verdict>,
        awarded: f64,
    ) -> Attempt {
        Attempt {
            lesson: lesson.map(str::to_string),
            result,
            verdict,
            awarded,
            score: self.score.snapshot(),
        }
    }

    pub fn starter_script(&self, lesson_id: &str) -> Result<&str, LessonError> {
        self.lessons
            .get(lesson_id)
            .map(|lesson| lesson.starter_script.as_str())
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut Executor {
        &mut self.executor
    }

    pub fn lessons(&self) -> &LessonRegistry {
        &self.lessons
    }

    pub fn score(&self) -> &ScoreTracker {
        &self.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Failure;
    use crate::lessons::Lesson;

    fn session() -> Session {
        let mut lessons = LessonRegistry::with_builtin_lessons();
        lessons.insert(Lesson::new("draft", "Draft", "pass"));
        Session::new(&Config::default(), lessons)
    }

    const WEEK1: &str = "brass_section = [brass[0], brass[1], brass[2]]";

    #[test]
    fn passing_attempts_score_with_streak() {
        let mut session = session();
        let first = session.attempt(WEEK1, Some("week1"));
        assert!(first.passed());
        assert_eq!(first.awarded, 25.0);
        let second = session.attempt(
            "band.form_circle(brass, 50, 26, 10)",
            Some("week2_circle"),
        );
        assert!(second.passed());
        assert!(second.awarded > first.awarded);
        assert_eq!(second.score.streak, 2);
    }

    #[test]
    fn failures_break_the_streak() {
        let mut session = session();
        session.attempt(WEEK1, Some("week1"));
        let rejected = session.attempt("brass_section = []", Some("week1"));
        assert!(!rejected.passed());
        assert!(matches!(rejected.result.failure, Some(Failure::Validation { .. })));
        assert_eq!(rejected.score.streak, 0);
        assert_eq!(rejected.score.total, 25.0);

        session.attempt(WEEK1, Some("week1"));
        let crashed = session.attempt("1 / 0", Some("week1"));
        assert!(crashed.result.is_runtime_error());
        assert_eq!(crashed.verdict, None);
        assert_eq!(crashed.score.streak, 0);
    }

    #[test]
    fn unknown_lessons_fail_without_crashing() {
        let mut session = session();
        let attempt = session.attempt("pass", Some("week99"));
        assert_eq!(attempt.verdict, Some(Verdict::fail("Unknown level")));
        assert!(!attempt.result.success);
        assert_eq!(
            attempt.result.failure,
            Some(Failure::Validation {
                message: "Unknown level".to_string()
            })
        );

        let crashed = session.attempt("1 / 0", Some("week99"));
        assert!(crashed.result.is_runtime_error());
        assert_eq!(crashed.verdict, Some(Verdict::fail("Unknown level")));
    }

    #[test]
    fn missing_validator_leaves_score_alone() {
        let mut session = session();
        session.attempt(WEEK1, Some("week1"));
        let attempt = session.attempt("pass", Some("draft"));
        assert_eq!(attempt.verdict, Some(Verdict::fail("No validator")));
        assert_eq!(attempt.score.streak, 1);
        assert_eq!(attempt.awarded, 0.0);
    }

    #[test]
    fn free_play_never_scores() {
        let mut session = session();
        session.attempt(WEEK1, Some("week1"));
        let attempt = session.attempt("1 / 0", None);
        assert!(!attempt.result.success);
        assert_eq!(attempt.score.streak, 1);
        assert_eq!(attempt.verdict, None);
    }

    #[test]
    fn lessons_without_points_earn_base_points() {
        let mut config = Config::default();
        config.scoring.base_points = 40.0;
        let mut lessons = LessonRegistry::with_builtin_lessons();
        lessons.insert(
            Lesson::new("bonus", "Bonus", "")
                .with_points(5.0)
                .with_validator(crate::lessons::Rule::SequenceLength {
                    name: "xs".to_string(),
                    min_len: 0,
                }),
        );
        let mut session = Session::new(&config, lessons);
        assert_eq!(session.attempt(WEEK1, Some("week1")).awarded, 40.0);
        let bonus = session.attempt("xs = []", Some("bonus"));
        assert!((bonus.awarded - 5.5).abs() < 1e-9);
    }

    #[test]
    fn lessons_use_their_band_size() {
        let mut lessons = LessonRegistry::new();
        lessons.insert(Lesson::new("quartet", "Quartet", "").with_band_size(4));
        let mut session = Session::new(&Config::default(), lessons);
        session.attempt("pass", Some("quartet"));
        assert_eq!(session.executor().get_band_members().len(), 4);
        assert_eq!(session.starter_script("quartet"), Ok(""));
        assert!(session.starter_script("nope").is_err());
    }
}
