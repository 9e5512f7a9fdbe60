//! The sandbox boundary: every script run ends in an [`ExecutionResult`],
//! whatever the script does.

use crate::band::{MemberSnapshot, Roster};
use crate::config::{Config, ExecutorConfig, FieldConfig};
use crate::interpreter::{ErrorKind, Interpreter, Limits, Namespace, OutputBuffer, RuntimeError};
use crate::lessons::ScriptState;
use crate::parser::{SyntaxError, parse_script};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use ulid::Ulid;

mod report;
pub use report::{SCRIPT_NAME, line_number, render_report};

/// Why a run did not succeed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum Failure {
    InvalidConfiguration {
        message: String,
    },
    Syntax {
        message: String,
        line: Option<usize>,
        report: String,
    },
    Runtime {
        error: ErrorKind,
        message: String,
        line: Option<usize>,
        report: String,
    },
    Validation {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub run_id: Ulid,
    pub success: bool,
    /// Everything the script printed, up to the failure point if it failed.
    pub output: String,
    pub failure: Option<Failure>,
}

impl ExecutionResult {
    fn succeeded(run_id: Ulid, output: String) -> Self {
        Self {
            run_id,
            success: true,
            output,
            failure: None,
        }
    }

    fn failed(run_id: Ulid, output: String, failure: Failure) -> Self {
        Self {
            run_id,
            success: false,
            output,
            failure: Some(failure),
        }
    }

    /// Marks a run that executed fine but whose final state a lesson rejected.
    pub fn into_validation_failure(self, message: impl Into<String>) -> Self {
        Self {
            success: false,
            failure: Some(Failure::Validation {
                message: message.into(),
            }),
            ..self
        }
    }

    pub fn is_syntax_error(&self) -> bool {
        matches!(self.failure, Some(Failure::Syntax { .. }))
    }

    pub fn is_runtime_error(&self) -> bool {
        matches!(self.failure, Some(Failure::Runtime { .. }))
    }

    /// The text shown to the learner: the output on success, otherwise the
    /// output so far followed by what went wrong.
    pub fn diagnostic(&self) -> String {
        let Some(failure) = &self.failure else {
            return self.output.clone();
        };
        let problem = match failure {
            Failure::InvalidConfiguration { message } => format!("invalid configuration: {message}"),
            Failure::Syntax {
                message,
                line: Some(line),
                ..
            } => format!("syntax error on line {line}: {message}"),
            Failure::Syntax { message, .. } => format!("syntax error: {message}"),
            Failure::Runtime {
                error,
                message,
                line: Some(line),
                ..
            } => format!("{error} on line {line}: {message}"),
            Failure::Runtime { error, message, .. } => format!("{error}: {message}"),
            Failure::Validation { message } => format!("validation failed: {message}"),
        };
        format!("{}{problem}", self.output)
    }
}

/// Owns the roster and runs scripts against it, one at a time.
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecutorConfig,
    roster: Roster,
    namespace: Namespace,
    output: OutputBuffer,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(FieldConfig::default(), ExecutorConfig::default())
    }
}

impl Executor {
    pub fn new(field: FieldConfig, config: ExecutorConfig) -> Self {
        Self {
            roster: Roster::new(field, config.max_band_size),
            namespace: Namespace::default(),
            output: OutputBuffer::new(config.max_output_bytes),
            config,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.field, config.executor)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn default_band_size(&self) -> usize {
        self.config.default_band_size
    }

    /// Builds a fresh band of `band_size` members and runs `script` against it.
    pub fn execute(&mut self, script: &str, band_size: usize) -> ExecutionResult {
        let run_id = Ulid::new();
        let span = info_span!("execute", %run_id, band_size, script_bytes = script.len());
        let _entered = span.enter();

        self.output = OutputBuffer::new(self.config.max_output_bytes);
        self.namespace.clear();
        if let Err(error) = self.roster.create(band_size) {
            warn!(%error, "rejected band size");
            self.roster.clear();
            return ExecutionResult::failed(
                run_id,
                String::new(),
                Failure::InvalidConfiguration {
                    message: error.to_string(),
                },
            );
        }
        self.namespace = Namespace::for_roster(&self.roster);

        if script.len() > self.config.max_script_bytes {
            debug!(limit = self.config.max_script_bytes, "script too long");
            return ExecutionResult::failed(
                run_id,
                String::new(),
                Failure::Syntax {
                    message: format!(
                        "script is {} bytes long, the limit is {}",
                        script.len(),
                        self.config.max_script_bytes
                    ),
                    line: None,
                    report: String::new(),
                },
            );
        }

        let statements = match parse_script(script) {
            Ok(statements) => statements,
            Err(errors) => {
                debug!(errors = errors.len(), "script did not parse");
                return ExecutionResult::failed(run_id, String::new(), syntax_failure(script, &errors));
            }
        };

        let mut interpreter = Interpreter::new(
            &mut self.roster,
            &mut self.namespace,
            &mut self.output,
            Limits::from(&self.config),
        );
        let outcome = interpreter.run(&statements);
        let steps = interpreter.steps();
        let output = self.output.as_str().to_string();
        match outcome {
            Ok(()) => {
                info!(steps, truncated = self.output.is_truncated(), "script finished");
                ExecutionResult::succeeded(run_id, output)
            }
            Err(error) => {
                info!(steps, %error, "script raised");
                ExecutionResult::failed(run_id, output, runtime_failure(script, &error))
            }
        }
    }

    /// Drops the band, the bindings and the output without running anything.
    pub fn reset(&mut self) {
        self.roster.clear();
        self.namespace.clear();
        self.output.clear();
    }

    pub fn get_band_members(&self) -> Vec<MemberSnapshot> {
        self.roster.snapshots()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn output(&self) -> &str {
        self.output.as_str()
    }

    /// State after the last run, for lesson validators.
    pub fn state(&self) -> ScriptState<'_> {
        ScriptState {
            namespace: &self.namespace,
            roster: &self.roster,
        }
    }

    /// Per-frame update from the presentation layer.
    pub fn advance_animation(&mut self, dt: f64) {
        self.roster.advance_animation(dt);
    }
}

fn syntax_failure(script: &str, errors: &[SyntaxError]) -> Failure {
    let Some(first) = errors.first() else {
        return Failure::Syntax {
            message: "invalid syntax".to_string(),
            line: None,
            report: String::new(),
        };
    };
    let report = errors
        .iter()
        .map(|error| render_report(script, error.span.clone(), &error.message, &error.label))
        .collect::<Vec<_>>()
        .join("\n");
    Failure::Syntax {
        message: first.message.clone(),
        line: Some(line_number(script, first.span.start)),
        report,
    }
}

fn runtime_failure(script: &str, error: &RuntimeError) -> Failure {
    let (line, report) = match &error.span {
        Some(span) => (
            Some(line_number(script, span.start)),
            render_report(script, span.clone(), &error.to_string(), error.kind.name()),
        ),
        None => (None, String::new()),
    };
    Failure::Runtime {
        error: error.kind,
        message: error.message.clone(),
        line,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execute(script: &str) -> (Executor, ExecutionResult) {
        let mut executor = Executor::default();
        let result = executor.execute(script, 16);
        (executor, result)
    }

    #[test]
    fn successful_run_keeps_output_and_state() {
        let (executor, result) = execute("print('hi')\nband.move_to(members[0], 50, 26)");
        assert!(result.success);
        assert_eq!(result.output, "hi\n");
        assert_eq!(result.diagnostic(), "hi\n");
        let first = executor.get_band_members()[0];
        assert_eq!((first.x, first.y), (50.0, 26.0));
        assert_eq!(executor.output(), "hi\n");
    }

    #[test]
    fn syntax_errors_name_a_line() {
        let (_, result) = execute("x = 1\nthis is invalid");
        assert!(!result.success);
        assert!(result.is_syntax_error());
        let Some(Failure::Syntax { line, report, .. }) = &result.failure else {
            panic!("expected a syntax failure");
        };
        assert_eq!(*line, Some(2));
        assert!(report.contains("this is invalid"));
        assert!(result.diagnostic().starts_with("syntax error on line 2"));
    }

    #[test]
    fn runtime_errors_keep_output_so_far() {
        let (_, result) = execute("print('warming up')\nmembers[len(members)]");
        assert!(result.is_runtime_error());
        assert_eq!(result.output, "warming up\n");
        let Some(Failure::Runtime { error, line, .. }) = &result.failure else {
            panic!("expected a runtime failure");
        };
        assert_eq!(*error, ErrorKind::IndexError);
        assert_eq!(*line, Some(2));
        assert!(result.diagnostic().starts_with("warming up\nIndexError on line 2"));
    }

    #[test]
    fn empty_script_succeeds() {
        let (executor, result) = execute("");
        assert!(result.success);
        assert_eq!(result.output, "");
        assert_eq!(executor.roster().len(), 16);
    }

    #[test]
    fn invalid_band_size_is_a_failure_result() {
        let mut executor = Executor::default();
        let result = executor.execute("print(1)", 0);
        assert!(matches!(result.failure, Some(Failure::InvalidConfiguration { .. })));
        assert!(executor.get_band_members().is_empty());
        let result = executor.execute("print(1)", 10_000);
        assert!(matches!(result.failure, Some(Failure::InvalidConfiguration { .. })));
    }

    #[test]
    fn oversized_scripts_are_not_parsed() {
        let config = ExecutorConfig {
            max_script_bytes: 8,
            ..ExecutorConfig::default()
        };
        let mut executor = Executor::new(FieldConfig::default(), config);
        let result = executor.execute("print('far too long')", 16);
        assert!(result.is_syntax_error());
    }

    #[test]
    fn every_run_starts_from_a_fresh_band() {
        let mut executor = Executor::default();
        executor.execute("band.move_to(0, 90, 50)\nleftover = 1", 16);
        let result = executor.execute("print(members[0].x)", 8);
        assert_eq!(result.output, "10.0\n");
        assert_eq!(executor.roster().len(), 8);
        assert!(!executor.namespace().contains("leftover"));
    }

    #[test]
    fn reset_drops_everything() {
        let (mut executor, _) = execute("print('x')");
        executor.reset();
        assert!(executor.get_band_members().is_empty());
        assert!(executor.namespace().is_empty());
        assert_eq!(executor.output(), "");
    }

    #[test]
    fn validation_failure_keeps_output() {
        let (_, result) = execute("print('done')");
        let result = result.into_validation_failure("not yet");
        assert!(!result.success);
        assert_eq!(result.diagnostic(), "done\nvalidation failed: not yet");
    }

    #[test]
    fn result_serializes_with_a_tagged_failure() {
        let (_, result) = execute("1 / 0");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["failure"]["failure"], "runtime");
        assert_eq!(json["failure"]["error"], "ZeroDivisionError");
    }
}
