//! Lesson grading and scoring through a session.

use pride_of_code::config::Config;
use pride_of_code::interpreter::{Namespace, Value};
use pride_of_code::lessons::{Lesson, LessonRegistry, Rule, ScriptState, Validator};
use pride_of_code::{Roster, ScoreTracker, Session, Verdict};

#[test]
fn length_check_accepts_three_and_rejects_two() {
    let rule = Rule::SequenceLength {
        name: "brass_section".to_string(),
        min_len: 3,
    };
    let roster = Roster::new(Default::default(), 16);
    let mut namespace = Namespace::default();

    namespace.set("brass_section", Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    let verdict = rule.validate(&ScriptState {
        namespace: &namespace,
        roster: &roster,
    });
    assert_eq!(verdict.into_pair(), (true, "Good job - found brass_section".to_string()));

    namespace.set("brass_section", Value::list(vec![Value::Int(1), Value::Int(2)]));
    let verdict = rule.validate(&ScriptState {
        namespace: &namespace,
        roster: &roster,
    });
    assert_eq!(
        verdict.into_pair(),
        (false, "Please create list named brass_section with at least 3 items".to_string())
    );
}

#[test]
fn scoring_streaks() {
    let mut score = ScoreTracker::default();
    let awards: Vec<f64> = (0..3).map(|_| score.add_points(25.0, "Correct formation")).collect();
    assert!(awards[0] <= awards[1] && awards[1] <= awards[2]);
    score.reset_streak();
    assert_eq!(score.add_points(25.0, "Correct formation"), awards[0]);
}

#[test]
fn builtin_course_can_be_completed() {
    let mut session = Session::new(&Config::default(), LessonRegistry::with_builtin_lessons());
    let solutions = [
        ("week1", "brass_section = []\nfor m in brass:\n    brass_section.append(m)\n"),
        ("week1_lesson1", "member = members[0]\nband.move_to(member, 50, 25)\n"),
        ("week2_circle", "band.form_circle(brass, 50, 26, 10)\n"),
        ("week2_line", "band.form_line(woodwind, 20, 20, 80, 20)\n"),
        ("week3_loops", "for member in guard:\n    band.move_forward(member, 5)\n"),
    ];
    let mut previous = 0.0;
    for (lesson, script) in solutions {
        let attempt = session.attempt(script, Some(lesson));
        assert!(attempt.passed(), "{lesson}: {:?}", attempt.verdict);
        assert!(attempt.awarded >= previous);
        previous = attempt.awarded;
    }
    assert_eq!(session.score().streak(), 5);
}

#[test]
fn starter_scripts_run_but_do_not_pass() {
    let registry = LessonRegistry::with_builtin_lessons();
    let ids: Vec<String> = registry.ids().map(str::to_string).collect();
    let mut session = Session::new(&Config::default(), registry);
    for id in ids {
        let starter = session.starter_script(&id).unwrap().to_string();
        let attempt = session.attempt(&starter, Some(&id));
        assert!(!attempt.passed(), "{id} passes with its starter script");
        assert!(
            !attempt.result.is_syntax_error() && !attempt.result.is_runtime_error(),
            "{id}: {}",
            attempt.result.diagnostic()
        );
    }
    assert_eq!(session.score().total(), 0.0);
}

fn nothing_bound(state: &ScriptState<'_>) -> Verdict {
    if state.namespace.user_names().next().is_none() {
        Verdict::pass("nothing bound")
    } else {
        Verdict::fail("keep the namespace clean")
    }
}

#[test]
fn custom_validators_plug_in() {
    let mut registry = LessonRegistry::new();
    registry.insert(
        Lesson::new("quiet", "Silence", "")
            .with_points(10.0)
            .with_validator(nothing_bound),
    );
    let mut session = Session::new(&Config::default(), registry);
    assert_eq!(session.attempt("band.move_to(0, 1, 1)", Some("quiet")).awarded, 10.0);
    assert!(!session.attempt("x = 1", Some("quiet")).passed());
}
