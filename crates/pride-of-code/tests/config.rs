//! Configuration files change executor limits and scoring.

use pride_of_code::config::{ConfigError, load_config};
use pride_of_code::interpreter::ErrorKind;
use pride_of_code::executor::Failure;
use pride_of_code::{Executor, LessonRegistry, Session};
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn limits_come_from_the_file() {
    let file = write_config(
        r#"
[executor]
max_steps = 50
default_band_size = 8
"#,
    );
    let config = load_config(file.path()).unwrap();
    let mut executor = Executor::from_config(&config);
    assert_eq!(executor.default_band_size(), 8);
    let result = executor.execute("for i in range(100):\n    pass", 8);
    assert!(matches!(
        result.failure,
        Some(Failure::Runtime {
            error: ErrorKind::StepLimitExceeded,
            ..
        })
    ));
}

#[test]
fn scoring_comes_from_the_file() {
    let file = write_config("[scoring]\nstreak_step = 1.0\nmax_multiplier = 3.0\n");
    let config = load_config(file.path()).unwrap();
    let mut session = Session::new(&config, LessonRegistry::with_builtin_lessons());
    let script = "brass_section = [1, 2, 3]";
    let awards: Vec<f64> = (0..4)
        .map(|_| session.attempt(script, Some("week1")).awarded)
        .collect();
    assert_eq!(awards, vec![25.0, 50.0, 75.0, 75.0]);
}

#[test]
fn invalid_files_are_reported() {
    let file = write_config("[scoring]\nmax_multiplier = 0.5\n");
    assert!(matches!(load_config(file.path()), Err(ConfigError::Invalid(_))));
    let file = write_config("[executor\n");
    assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    assert!(matches!(
        load_config(std::path::Path::new("/definitely/not/here.toml")),
        Err(ConfigError::Io(_))
    ));
}
