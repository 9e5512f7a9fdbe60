use clap::{Args, Parser as ClapParser, Subcommand};
use pride_of_code::executor::{Failure, render_report};
use pride_of_code::parser::parse_script;
use pride_of_code::{Attempt, Config, LessonRegistry, Session, load_config};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(ClapParser)]
#[command(name = "pride")]
#[command(about = "Run and grade Pride of Code formation scripts")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Extra lesson catalog (TOML), registered after the built-in lessons
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script file
    Run {
        /// Path to the script
        file: PathBuf,
        #[command(flatten)]
        options: RunOptions,
    },
    /// Run inline script code
    Eval {
        /// The code to run
        code: String,
        #[command(flatten)]
        options: RunOptions,
    },
    /// Check if a script parses correctly
    Check {
        /// Path to the script
        file: PathBuf,
    },
    /// List the available lessons
    Lessons {
        #[arg(long)]
        json: bool,
    },
    /// Print a lesson's starter script
    Starter {
        /// Lesson id
        id: String,
    },
    /// Submit every script of a course file in order
    Play {
        /// Course file: scripts each introduced by a `## lesson: <id>` line
        course: PathBuf,
    },
}

#[derive(Args)]
struct RunOptions {
    /// Grade the run against this lesson
    #[arg(long)]
    lesson: Option<String>,
    /// Band size for free play (a lesson brings its own)
    #[arg(long)]
    band_size: Option<usize>,
    /// Print the attempt as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = match open_session(cli.config.as_deref(), cli.catalog.as_deref()) {
        Ok(session) => session,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run { file, options } => match fs::read_to_string(&file) {
            Ok(code) => {
                eprintln!("Running: {}", file.display());
                run_script(&mut session, &code, &options)
            }
            Err(e) => {
                eprintln!("Error reading file: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Eval { code, options } => run_script(&mut session, &code, &options),
        Commands::Check { file } => match fs::read_to_string(&file) {
            Ok(code) => check_code(&code, &file),
            Err(e) => {
                eprintln!("Error reading file: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Lessons { json } => list_lessons(session.lessons(), json),
        Commands::Starter { id } => match session.starter_script(&id) {
            Ok(starter) => {
                print!("{starter}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        },
        Commands::Play { course } => match fs::read_to_string(&course) {
            Ok(content) => play_course(&mut session, &content),
            Err(e) => {
                eprintln!("Error reading {}: {}", course.display(), e);
                ExitCode::FAILURE
            }
        },
    }
}

fn open_session(config_path: Option<&Path>, catalog_path: Option<&Path>) -> Result<Session, String> {
    let config = match config_path {
        Some(path) => load_config(path).map_err(|e| format!("Error loading {}: {}", path.display(), e))?,
        None => Config::default(),
    };
    let mut lessons = LessonRegistry::with_builtin_lessons();
    if let Some(path) = catalog_path {
        let count = lessons
            .load_catalog(path)
            .map_err(|e| format!("Error loading {}: {}", path.display(), e))?;
        debug!(count, catalog = %path.display(), "loaded lesson catalog");
    }
    Ok(Session::new(&config, lessons))
}

fn run_script(session: &mut Session, code: &str, options: &RunOptions) -> ExitCode {
    let attempt = match (&options.lesson, options.band_size) {
        (None, Some(band_size)) => {
            let result = session.executor_mut().execute(code, band_size);
            Attempt {
                lesson: None,
                result,
                verdict: None,
                awarded: 0.0,
                score: session.score().snapshot(),
            }
        }
        (lesson, _) => session.attempt(code, lesson.as_deref()),
    };

    if options.json {
        match serde_json::to_string_pretty(&attempt) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error encoding result: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_attempt(&attempt);
    }

    let success = attempt.result.success && attempt.verdict.as_ref().is_none_or(|verdict| verdict.passed);
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_attempt(attempt: &Attempt) {
    print!("{}", attempt.result.output);
    match &attempt.result.failure {
        Some(Failure::Syntax { report, .. } | Failure::Runtime { report, .. }) if !report.is_empty() => {
            eprint!("{report}");
        }
        Some(failure) if !matches!(failure, Failure::Validation { .. }) => {
            let diagnostic = attempt.result.diagnostic();
            let problem = diagnostic
                .strip_prefix(attempt.result.output.as_str())
                .unwrap_or(&diagnostic);
            eprintln!("{problem}");
        }
        _ => {}
    }
    if let Some(verdict) = &attempt.verdict {
        let status = if verdict.passed { "PASS" } else { "FAIL" };
        println!("[{status}] {}", verdict.message);
    }
    if attempt.awarded > 0.0 {
        println!(
            "+{} points (total {}, streak {})",
            attempt.awarded, attempt.score.total, attempt.score.streak
        );
    }
}

fn check_code(code: &str, file: &Path) -> ExitCode {
    match parse_script(code) {
        Ok(statements) => {
            println!("{}: OK ({} statements)", file.display(), statements.len());
            ExitCode::SUCCESS
        }
        Err(errors) => {
            for error in errors {
                eprint!(
                    "{}",
                    render_report(code, error.span.clone(), &error.message, &error.label)
                );
            }
            ExitCode::FAILURE
        }
    }
}

fn list_lessons(lessons: &LessonRegistry, json: bool) -> ExitCode {
    let summaries: Vec<_> = lessons.lessons().map(|lesson| lesson.summary()).collect();
    if json {
        return match serde_json::to_string_pretty(&summaries) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error encoding lessons: {}", e);
                ExitCode::FAILURE
            }
        };
    }
    for summary in summaries {
        let graded = if summary.has_validator { "" } else { " (ungraded)" };
        let points = match summary.points {
            Some(points) => format!("{points} points"),
            None => "base points".to_string(),
        };
        println!(
            "{:<16} {} [{} members, {points}]{graded}",
            summary.id, summary.title, summary.band_size
        );
    }
    ExitCode::SUCCESS
}

/// A course script for one lesson.
struct CourseEntry<'a> {
    lesson: &'a str,
    code: String,
}

/// Splits a course file on `## lesson: <id>` lines. Anything before the first
/// marker is ignored.
fn parse_course(content: &str) -> Vec<CourseEntry<'_>> {
    let mut entries = Vec::new();
    let mut current: Option<CourseEntry> = None;
    for line in content.lines() {
        if let Some(lesson) = line.strip_prefix("## lesson:") {
            entries.extend(current.take());
            current = Some(CourseEntry {
                lesson: lesson.trim(),
                code: String::new(),
            });
        } else if let Some(entry) = current.as_mut() {
            entry.code.push_str(line);
            entry.code.push('\n');
        }
    }
    entries.extend(current);
    entries
}

fn play_course(session: &mut Session, content: &str) -> ExitCode {
    let entries = parse_course(content);
    let mut passed = 0;
    let mut failed = 0;

    for entry in &entries {
        let attempt = session.attempt(&entry.code, Some(entry.lesson));
        if attempt.passed() {
            passed += 1;
            eprintln!("✓ {}: +{} points", entry.lesson, attempt.awarded);
        } else {
            failed += 1;
            let message = match &attempt.verdict {
                Some(verdict) => verdict.message.clone(),
                None => attempt.result.diagnostic(),
            };
            eprintln!("✗ {}: {}", entry.lesson, message.trim_end());
        }
    }

    let score = session.score().snapshot();
    eprintln!(
        "\n{} lessons: {} passed, {} failed",
        entries.len(),
        passed,
        failed
    );
    println!(
        "score {} (streak {}, best streak {})",
        score.total, score.streak, score.best_streak
    );
    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
