use crate::band::{BandMember, MemberId, Roster, Section};
use crate::interpreter::{Namespace, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positions count as "on target" within this many yards unless a rule says otherwise.
pub const DEFAULT_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
}

impl Verdict {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }

    pub fn into_pair(self) -> (bool, String) {
        (self.passed, self.message)
    }
}

/// What a script left behind: its bindings and the band.
#[derive(Debug, Clone, Copy)]
pub struct ScriptState<'run> {
    pub namespace: &'run Namespace,
    pub roster: &'run Roster,
}

/// Grades the state a script left behind. Implementations must not depend on
/// anything but `state`.
pub trait Validator {
    fn validate(&self, state: &ScriptState<'_>) -> Verdict;
}

impl<F> Validator for F
where
    F: Fn(&ScriptState<'_>) -> Verdict,
{
    fn validate(&self, state: &ScriptState<'_>) -> Verdict {
        self(state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Any,
    Bool,
    Int,
    Float,
    Number,
    Text,
    List,
    Member,
}

impl BindingKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::Int => matches!(value, Value::Int(_)),
            Self::Float => matches!(value, Value::Float(_)),
            Self::Number => matches!(value, Value::Int(_) | Value::Float(_)),
            Self::Text => matches!(value, Value::Text(_)),
            Self::List => matches!(value, Value::List(_)),
            Self::Member => matches!(value, Value::Member(_)),
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "value",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Number => "number",
            Self::Text => "str",
            Self::List => "list",
            Self::Member => "member",
        })
    }
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

/// Built-in lesson rules. `section: None` checks the whole band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    /// A list bound to `name` with at least `min_len` items.
    SequenceLength { name: String, min_len: usize },
    Binding { name: String, expected: BindingKind },
    MemberNear {
        member: MemberId,
        x: f64,
        y: f64,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    Circle {
        #[serde(default)]
        section: Option<Section>,
        cx: f64,
        cy: f64,
        radius: f64,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    Line {
        #[serde(default)]
        section: Option<Section>,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    Region {
        #[serde(default)]
        section: Option<Section>,
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
    },
    AllOf { rules: Vec<Rule> },
}

impl Validator for Rule {
    fn validate(&self, state: &ScriptState<'_>) -> Verdict {
        match self {
            Self::SequenceLength { name, min_len } => match state.namespace.get(name) {
                Some(Value::List(items)) if items.borrow().len() >= *min_len => {
                    Verdict::pass(format!("Good job - found {name}"))
                }
                _ => Verdict::fail(format!(
                    "Please create list named {name} with at least {min_len} items"
                )),
            },
            Self::Binding { name, expected } => match state.namespace.get(name) {
                Some(value) if expected.matches(value) => Verdict::pass(format!("Good job - found {name}")),
                Some(value) => Verdict::fail(format!(
                    "{name} should be a {expected}, but it is a {}",
                    value.type_name()
                )),
                None => Verdict::fail(format!("Please create a {expected} named {name}")),
            },
            Self::MemberNear {
                member,
                x,
                y,
                tolerance,
            } => {
                let Some(found) = state.roster.member(*member) else {
                    return Verdict::fail(format!("The band has no member {member}"));
                };
                if distance((found.x, found.y), (*x, *y)) <= *tolerance {
                    Verdict::pass(format!("Member {member} reached ({x}, {y})"))
                } else {
                    Verdict::fail(format!(
                        "Member {member} is at ({:.1}, {:.1}), move it to ({x}, {y})",
                        found.x, found.y
                    ))
                }
            }
            Self::Circle {
                section,
                cx,
                cy,
                radius,
                tolerance,
            } => check_members(state.roster, *section, "formed a circle", |member| {
                let off = (distance((member.x, member.y), (*cx, *cy)) - radius).abs();
                (off <= *tolerance).then_some(()).ok_or_else(|| {
                    format!("should stand {radius} yards from ({cx}, {cy})")
                })
            }),
            Self::Line {
                section,
                x1,
                y1,
                x2,
                y2,
                tolerance,
            } => check_members(state.roster, *section, "formed a line", |member| {
                let off = distance_to_segment((member.x, member.y), (*x1, *y1), (*x2, *y2));
                (off <= *tolerance)
                    .then_some(())
                    .ok_or_else(|| format!("should stand on the line from ({x1}, {y1}) to ({x2}, {y2})"))
            }),
            Self::Region {
                section,
                min_x,
                max_x,
                min_y,
                max_y,
            } => check_members(state.roster, *section, "reached the target area", |member| {
                let inside = (*min_x..=*max_x).contains(&member.x) && (*min_y..=*max_y).contains(&member.y);
                inside.then_some(()).ok_or_else(|| {
                    format!("should stand between x {min_x}..{max_x} and y {min_y}..{max_y}")
                })
            }),
            Self::AllOf { rules } => {
                let mut messages = Vec::with_capacity(rules.len());
                for rule in rules {
                    let verdict = rule.validate(state);
                    if !verdict.passed {
                        return verdict;
                    }
                    messages.push(verdict.message);
                }
                Verdict::pass(messages.join("; "))
            }
        }
    }
}

fn check_members(
    roster: &Roster,
    section: Option<Section>,
    achievement: &str,
    check: impl Fn(&BandMember) -> Result<(), String>,
) -> Verdict {
    let members: Vec<&BandMember> = match section {
        Some(section) => roster
            .section(section)
            .iter()
            .filter_map(|&id| roster.member(id))
            .collect(),
        None => roster.members().iter().collect(),
    };
    let group = section.map_or("band", Section::name);
    if members.is_empty() {
        return Verdict::fail(format!("There is no {group} to check"));
    }
    for member in members {
        if let Err(problem) = check(member) {
            return Verdict::fail(format!(
                "{group} member {} is at ({:.1}, {:.1}) but {problem}",
                member.id, member.x, member.y
            ));
        }
    }
    Verdict::pass(format!("Good job - the {group} {achievement}"))
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn distance_to_segment(point: (f64, f64), start: (f64, f64), end: (f64, f64)) -> f64 {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return distance(point, start);
    }
    let t = (((point.0 - start.0) * dx + (point.1 - start.1) * dy) / length_squared).clamp(0.0, 1.0);
    distance(point, (start.0 + t * dx, start.1 + t * dy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;

    fn roster() -> Roster {
        let mut roster = Roster::new(FieldConfig::default(), 64);
        roster.create(16).unwrap();
        roster
    }

    fn list(len: usize) -> Value {
        Value::list((0..len as i64).map(Value::Int).collect())
    }

    fn brass_section() -> Rule {
        Rule::SequenceLength {
            name: "brass_section".to_string(),
            min_len: 3,
        }
    }

    #[test]
    fn sequence_length_needs_enough_items() {
        let roster = roster();
        let rule = brass_section();
        let mut namespace = Namespace::for_roster(&roster);

        namespace.set("brass_section", list(3));
        let state = ScriptState { namespace: &namespace, roster: &roster };
        assert_eq!(
            rule.validate(&state).into_pair(),
            (true, "Good job - found brass_section".to_string())
        );

        namespace.set("brass_section", list(2));
        let state = ScriptState { namespace: &namespace, roster: &roster };
        assert_eq!(
            rule.validate(&state).into_pair(),
            (false, "Please create list named brass_section with at least 3 items".to_string())
        );

        namespace.set("brass_section", Value::text("abc"));
        let state = ScriptState { namespace: &namespace, roster: &roster };
        assert!(!rule.validate(&state).passed);
    }

    #[test]
    fn binding_checks_kind() {
        let roster = roster();
        let mut namespace = Namespace::default();
        let rule = Rule::Binding {
            name: "speed".to_string(),
            expected: BindingKind::Number,
        };
        let state = ScriptState { namespace: &namespace, roster: &roster };
        assert_eq!(rule.validate(&state).message, "Please create a number named speed");
        namespace.set("speed", Value::text("fast"));
        let state = ScriptState { namespace: &namespace, roster: &roster };
        assert_eq!(rule.validate(&state).message, "speed should be a number, but it is a str");
        namespace.set("speed", Value::Float(2.5));
        let state = ScriptState { namespace: &namespace, roster: &roster };
        assert!(rule.validate(&state).passed);
    }

    #[test]
    fn geometric_rules_follow_the_roster() {
        let mut roster = roster();
        let namespace = Namespace::default();
        let circle = Rule::Circle {
            section: Some(Section::Brass),
            cx: 50.0,
            cy: 26.0,
            radius: 10.0,
            tolerance: DEFAULT_TOLERANCE,
        };
        let line = Rule::Line {
            section: Some(Section::Woodwind),
            x1: 20.0,
            y1: 20.0,
            x2: 80.0,
            y2: 20.0,
            tolerance: DEFAULT_TOLERANCE,
        };
        {
            let state = ScriptState { namespace: &namespace, roster: &roster };
            assert!(!circle.validate(&state).passed);
            assert!(!line.validate(&state).passed);
        }
        let brass = roster.section(Section::Brass).to_vec();
        roster.form_circle(&brass, 50.0, 26.0, 10.0);
        let woodwind = roster.section(Section::Woodwind).to_vec();
        roster.form_line(&woodwind, 20.0, 20.0, 80.0, 20.0);
        let state = ScriptState { namespace: &namespace, roster: &roster };
        assert!(circle.validate(&state).passed);
        assert!(line.validate(&state).passed);
        let both = Rule::AllOf {
            rules: vec![circle, line],
        };
        assert!(both.validate(&state).passed);
    }

    #[test]
    fn member_near_and_region() {
        let mut roster = roster();
        roster.move_to(0, 50.0, 25.2);
        let namespace = Namespace::default();
        let state = ScriptState { namespace: &namespace, roster: &roster };
        let near = Rule::MemberNear {
            member: 0,
            x: 50.0,
            y: 25.0,
            tolerance: DEFAULT_TOLERANCE,
        };
        assert!(near.validate(&state).passed);
        let missing = Rule::MemberNear {
            member: 40,
            x: 0.0,
            y: 0.0,
            tolerance: DEFAULT_TOLERANCE,
        };
        assert_eq!(missing.validate(&state).message, "The band has no member 40");
        let region = Rule::Region {
            section: Some(Section::Guard),
            min_x: 0.0,
            max_x: 100.0,
            min_y: 9.5,
            max_y: 10.5,
        };
        assert!(region.validate(&state).passed);
    }

    #[test]
    fn closures_are_validators() {
        let roster = roster();
        let namespace = Namespace::default();
        let state = ScriptState { namespace: &namespace, roster: &roster };
        fn band_of_sixteen(state: &ScriptState<'_>) -> Verdict {
            if state.roster.len() == 16 {
                Verdict::pass("sixteen")
            } else {
                Verdict::fail("wrong size")
            }
        }
        assert!(band_of_sixteen.validate(&state).passed);
    }

    #[test]
    fn rules_read_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            rule: Rule,
        }
        let wrapper: Wrapper = toml::from_str(
            r#"rule = { kind = "circle", section = "brass", cx = 50, cy = 26, radius = 10 }"#,
        )
        .unwrap();
        assert_eq!(
            wrapper.rule,
            Rule::Circle {
                section: Some(Section::Brass),
                cx: 50.0,
                cy: 26.0,
                radius: 10.0,
                tolerance: DEFAULT_TOLERANCE,
            }
        );
    }
}
