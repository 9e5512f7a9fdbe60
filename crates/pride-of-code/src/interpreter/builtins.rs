//! Built-in functions every script can call. None of them reach outside the
//! interpreter: `print` writes into the captured output.

use super::value::{BoundedText, arithmetic, order};
use super::{ErrorKind, Limits, OutputBuffer, RuntimeError, Value};
use crate::parser::ArithmeticOperator;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt::Write as _;

/// Evaluated call arguments. Most calls take four or fewer.
pub type Arguments = SmallVec<[Value; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Len,
    Range,
    Abs,
    Min,
    Max,
    Round,
    Sum,
    Str,
    Int,
    Float,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Print,
        Builtin::Len,
        Builtin::Range,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::Round,
        Builtin::Sum,
        Builtin::Str,
        Builtin::Int,
        Builtin::Float,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Len => "len",
            Self::Range => "range",
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Round => "round",
            Self::Sum => "sum",
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn call(
        self,
        arguments: Arguments,
        output: &mut OutputBuffer,
        limits: &Limits,
    ) -> Result<Value, RuntimeError> {
        match self {
            Self::Print => {
                // One byte past the room left is enough for the buffer to cut it off.
                let mut line = BoundedText::new(output.remaining().saturating_add(1));
                let _ = arguments.iter().enumerate().try_for_each(|(index, argument)| {
                    if index > 0 {
                        line.write_str(" ")?;
                    }
                    argument.write_to(&mut line)
                });
                output.write(line.as_str());
                output.write("\n");
                Ok(Value::None)
            }
            Self::Len => {
                let [value] = exactly(self, arguments)?;
                let len = match &value {
                    Value::Text(text) => text.chars().count(),
                    Value::List(items) => items.borrow().len(),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        )));
                    }
                };
                i64::try_from(len)
                    .map(Value::Int)
                    .map_err(|_| RuntimeError::overflow())
            }
            Self::Range => range(arguments, limits.max_collection_len),
            Self::Abs => {
                let [value] = exactly(self, arguments)?;
                match value {
                    Value::Int(x) => x.checked_abs().map(Value::Int).ok_or_else(RuntimeError::overflow),
                    Value::Float(x) => Ok(Value::Float(x.abs())),
                    other => Err(RuntimeError::type_error(format!(
                        "bad operand type for abs(): '{}'",
                        other.type_name()
                    ))),
                }
            }
            Self::Min => extreme(self, arguments, Ordering::Less),
            Self::Max => extreme(self, arguments, Ordering::Greater),
            Self::Round => round(arguments),
            Self::Sum => {
                check_arity(self, &arguments, 1, 2)?;
                let mut arguments = arguments.into_iter();
                let items = match arguments.next() {
                    Some(Value::List(items)) => items.borrow().clone(),
                    Some(other) => {
                        return Err(RuntimeError::type_error(format!(
                            "'{}' object is not iterable",
                            other.type_name()
                        )));
                    }
                    None => Vec::new(),
                };
                let start = arguments.next().unwrap_or(Value::Int(0));
                items.iter().try_fold(start, |total, item| {
                    arithmetic(ArithmeticOperator::Add, &total, item, limits.max_collection_len)
                })
            }
            Self::Str => {
                check_arity(self, &arguments, 0, 1)?;
                let text = match arguments.first() {
                    Some(value) => value.to_text_within(limits.max_collection_len)?,
                    None => String::new(),
                };
                Ok(Value::text(text))
            }
            Self::Int => {
                check_arity(self, &arguments, 0, 1)?;
                match arguments.into_iter().next() {
                    None => Ok(Value::Int(0)),
                    Some(value) => to_int(&value),
                }
            }
            Self::Float => {
                check_arity(self, &arguments, 0, 1)?;
                match arguments.into_iter().next() {
                    None => Ok(Value::Float(0.0)),
                    Some(value) => to_float(&value),
                }
            }
        }
    }
}

fn check_arity(
    builtin: Builtin,
    arguments: &[Value],
    min: usize,
    max: usize,
) -> Result<(), RuntimeError> {
    let given = arguments.len();
    if (min..=max).contains(&given) {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {min}")
    } else if given < min {
        format!("at least {min}")
    } else {
        format!("at most {max}")
    };
    Err(RuntimeError::type_error(format!(
        "{}() takes {expected} argument{} ({given} given)",
        builtin.name(),
        if min == max && min == 1 { "" } else { "s" }
    )))
}

fn exactly<const N: usize>(builtin: Builtin, arguments: Arguments) -> Result<[Value; N], RuntimeError> {
    check_arity(builtin, &arguments, N, N)?;
    arguments
        .into_iter()
        .collect::<Vec<_>>()
        .try_into()
        .map_err(|_| RuntimeError::type_error(format!("{}() got the wrong arguments", builtin.name())))
}

fn integer_argument(builtin: Builtin, value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(integer) => Ok(*integer),
        other => Err(RuntimeError::type_error(format!(
            "{}() expects integers, got '{}'",
            builtin.name(),
            other.type_name()
        ))),
    }
}

fn range(arguments: Arguments, max_len: usize) -> Result<Value, RuntimeError> {
    check_arity(Builtin::Range, &arguments, 1, 3)?;
    let integers = arguments
        .iter()
        .map(|argument| integer_argument(Builtin::Range, argument))
        .collect::<Result<SmallVec<[i64; 3]>, _>>()?;
    let (start, stop, step) = match integers.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step, ..] => (*start, *stop, *step),
        [] => (0, 0, 1),
    };
    if step == 0 {
        return Err(RuntimeError::value_error("range() arg 3 must not be zero"));
    }
    let span = i128::from(stop) - i128::from(start);
    let step_wide = i128::from(step);
    let len = if (span > 0 && step > 0) || (span < 0 && step < 0) {
        (span.abs() + step_wide.abs() - 1) / step_wide.abs()
    } else {
        0
    };
    if len > max_len as i128 {
        return Err(RuntimeError::value_error(format!(
            "range() of {len} items exceeds the limit of {max_len}"
        )));
    }
    let items = (0..len)
        .map(|index| Value::Int((i128::from(start) + index * step_wide) as i64))
        .collect();
    Ok(Value::list(items))
}

fn extreme(builtin: Builtin, arguments: Arguments, wanted: Ordering) -> Result<Value, RuntimeError> {
    let candidates = match arguments.as_slice() {
        [] => {
            return Err(RuntimeError::type_error(format!(
                "{}() expected at least 1 argument, got 0",
                builtin.name()
            )));
        }
        [Value::List(items)] => items.borrow().clone(),
        [other] => {
            return Err(RuntimeError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            )));
        }
        many => many.to_vec(),
    };
    let symbol = if wanted == Ordering::Less { "<" } else { ">" };
    let mut candidates = candidates.into_iter();
    let Some(mut best) = candidates.next() else {
        return Err(RuntimeError::value_error(format!(
            "{}() arg is an empty sequence",
            builtin.name()
        )));
    };
    for candidate in candidates {
        if order(&candidate, &best, symbol)? == wanted {
            best = candidate;
        }
    }
    Ok(best)
}

fn round(arguments: Arguments) -> Result<Value, RuntimeError> {
    check_arity(Builtin::Round, &arguments, 1, 2)?;
    let digits = match arguments.get(1) {
        None | Some(Value::None) => None,
        Some(value) => Some(integer_argument(Builtin::Round, value)?),
    };
    match (arguments.first().unwrap_or(&Value::None), digits) {
        (Value::Int(x), _) => Ok(Value::Int(*x)),
        (Value::Float(x), None) => float_to_int(x.round_ties_even()),
        (Value::Float(x), Some(digits)) => {
            let digits = i32::try_from(digits.clamp(-308, 308)).unwrap_or_default();
            let scale = 10f64.powi(digits);
            let rounded = (x * scale).round_ties_even() / scale;
            Ok(Value::Float(if rounded.is_finite() { rounded } else { *x }))
        }
        (other, _) => Err(RuntimeError::type_error(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

fn float_to_int(value: f64) -> Result<Value, RuntimeError> {
    if value.is_nan() {
        return Err(RuntimeError::value_error("cannot convert float NaN to integer"));
    }
    if !value.is_finite() || value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return Err(RuntimeError::new(
            ErrorKind::OverflowError,
            "cannot convert float to integer: out of range",
        ));
    }
    Ok(Value::Int(value as i64))
}

fn to_int(value: &Value) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(x) => Ok(Value::Int(*x)),
        Value::Bool(x) => Ok(Value::Int(i64::from(*x))),
        Value::Float(x) => float_to_int(x.trunc()),
        Value::Text(text) => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            RuntimeError::value_error(format!(
                "invalid literal for int() with base 10: {}",
                value.repr()
            ))
        }),
        other => Err(RuntimeError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(value: &Value) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(x) => Ok(Value::Float(*x as f64)),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Bool(x) => Ok(Value::Float(if *x { 1.0 } else { 0.0 })),
        Value::Text(text) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            RuntimeError::value_error(format!(
                "could not convert string to float: {}",
                value.repr()
            ))
        }),
        other => Err(RuntimeError::type_error(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn call(builtin: Builtin, arguments: Arguments) -> Result<Value, RuntimeError> {
        let mut output = OutputBuffer::new(1024);
        builtin.call(arguments, &mut output, &Limits::default())
    }

    #[test]
    fn print_joins_arguments_with_spaces() {
        let mut output = OutputBuffer::new(1024);
        Builtin::Print
            .call(
                smallvec![Value::text("x ="), Value::Float(50.0), Value::None],
                &mut output,
                &Limits::default(),
            )
            .unwrap();
        Builtin::Print
            .call(smallvec![], &mut output, &Limits::default())
            .unwrap();
        assert_eq!(output.as_str(), "x = 50.0 None\n\n");
    }

    #[test]
    fn len_of_lists_and_texts() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(call(Builtin::Len, smallvec![list]).unwrap(), Value::Int(3));
        assert_eq!(call(Builtin::Len, smallvec![Value::text("héllo")]).unwrap(), Value::Int(5));
        assert_eq!(
            call(Builtin::Len, smallvec![Value::Int(3)]).unwrap_err().kind,
            ErrorKind::TypeError
        );
        assert_eq!(
            call(Builtin::Len, smallvec![]).unwrap_err().kind,
            ErrorKind::TypeError
        );
    }

    #[test]
    fn range_forms() {
        let render = |arguments: Arguments| call(Builtin::Range, arguments).unwrap().to_string();
        assert_eq!(render(smallvec![Value::Int(4)]), "[0, 1, 2, 3]");
        assert_eq!(render(smallvec![Value::Int(2), Value::Int(5)]), "[2, 3, 4]");
        assert_eq!(
            render(smallvec![Value::Int(10), Value::Int(0), Value::Int(-3)]),
            "[10, 7, 4, 1]"
        );
        assert_eq!(render(smallvec![Value::Int(-2)]), "[]");
    }

    #[test]
    fn range_is_capped_and_rejects_zero_step() {
        let error = call(Builtin::Range, smallvec![Value::Int(1_000_000)]).unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValueError);
        let error = call(Builtin::Range, smallvec![Value::Int(0), Value::Int(3), Value::Int(0)])
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValueError);
        let error = call(Builtin::Range, smallvec![Value::Float(3.0)]).unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeError);
    }

    #[test]
    fn min_max_over_lists_and_arguments() {
        let list = Value::list(vec![Value::Int(3), Value::Float(1.5), Value::Int(7)]);
        assert_eq!(call(Builtin::Min, smallvec![list.clone()]).unwrap(), Value::Float(1.5));
        assert_eq!(call(Builtin::Max, smallvec![list]).unwrap(), Value::Int(7));
        assert_eq!(
            call(Builtin::Max, smallvec![Value::Int(2), Value::Int(9)]).unwrap(),
            Value::Int(9)
        );
        let empty = Value::list(Vec::new());
        assert_eq!(
            call(Builtin::Min, smallvec![empty]).unwrap_err().kind,
            ErrorKind::ValueError
        );
    }

    #[test]
    fn round_uses_bankers_rounding() {
        assert_eq!(call(Builtin::Round, smallvec![Value::Float(2.5)]).unwrap(), Value::Int(2));
        assert_eq!(call(Builtin::Round, smallvec![Value::Float(3.5)]).unwrap(), Value::Int(4));
        assert_eq!(
            call(Builtin::Round, smallvec![Value::Float(1.234), Value::Int(2)]).unwrap(),
            Value::Float(1.23)
        );
    }

    #[test]
    fn sum_and_conversions() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Float(0.5)]);
        assert_eq!(call(Builtin::Sum, smallvec![list]).unwrap(), Value::Float(3.5));
        assert_eq!(call(Builtin::Int, smallvec![Value::Float(-2.7)]).unwrap(), Value::Int(-2));
        assert_eq!(call(Builtin::Int, smallvec![Value::text(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(
            call(Builtin::Int, smallvec![Value::text("abc")]).unwrap_err().kind,
            ErrorKind::ValueError
        );
        assert_eq!(call(Builtin::Float, smallvec![Value::text("2.5")]).unwrap(), Value::Float(2.5));
        assert_eq!(call(Builtin::Str, smallvec![Value::Float(26.0)]).unwrap(), Value::text("26.0"));
    }

    #[test]
    fn every_builtin_is_found_by_name() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::from_name("open"), None);
        assert_eq!(Builtin::from_name("eval"), None);
    }
}
