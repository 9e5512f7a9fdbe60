use super::{Builtin, ErrorKind, RuntimeError};
use crate::band::MemberId;
use crate::parser::{ArithmeticOperator, Comparator};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Rc<str>),
    /// Lists are shared: `a = b` makes both names see the same items.
    List(Rc<RefCell<Vec<Value>>>),
    /// Handle to a roster member. Attributes are read from the roster.
    Member(MemberId),
    /// The `band` controller.
    Band,
    Builtin(Builtin),
    Method(Method),
}

#[derive(Clone)]
pub enum Method {
    Band(BandMethod),
    List {
        list: Rc<RefCell<Vec<Value>>>,
        method: ListMethod,
    },
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Band(method) => method.name(),
            Self::List { method, .. } => method.name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandMethod {
    MoveTo,
    MoveForward,
    FormCircle,
    FormLine,
    GetSection,
    Face,
}

impl BandMethod {
    pub const ALL: [BandMethod; 6] = [
        BandMethod::MoveTo,
        BandMethod::MoveForward,
        BandMethod::FormCircle,
        BandMethod::FormLine,
        BandMethod::GetSection,
        BandMethod::Face,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::MoveTo => "move_to",
            Self::MoveForward => "move_forward",
            Self::FormCircle => "form_circle",
            Self::FormLine => "form_line",
            Self::GetSection => "get_section",
            Self::Face => "face",
        }
    }

    pub fn parameters(self) -> &'static [&'static str] {
        match self {
            Self::MoveTo => &["member", "x", "y"],
            Self::MoveForward => &["member", "steps"],
            Self::FormCircle => &["members", "cx", "cy", "radius"],
            Self::FormLine => &["members", "x1", "y1", "x2", "y2"],
            Self::GetSection => &["name"],
            Self::Face => &["member", "direction"],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMethod {
    Append,
    Pop,
}

impl ListMethod {
    pub fn name(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Pop => "pop",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "append" => Some(Self::Append),
            "pop" => Some(Self::Pop),
            _ => None,
        }
    }
}

impl Value {
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Self::Text(text.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "str",
            Self::List(_) => "list",
            Self::Member(_) => "member",
            Self::Band => "band",
            Self::Builtin(_) => "builtin_function",
            Self::Method(_) => "method",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(value) => *value,
            Self::Int(value) => *value != 0,
            Self::Float(value) => *value != 0.0,
            Self::Text(text) => !text.is_empty(),
            Self::List(items) => !items.borrow().is_empty(),
            Self::Member(_) | Self::Band | Self::Builtin(_) | Self::Method(_) => true,
        }
    }

    /// Numeric view used by arithmetic and by `band` parameters.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Like `repr(value)`: texts are quoted.
    pub fn repr(&self) -> String {
        match self {
            Self::Text(text) => quote(text),
            other => other.to_string(),
        }
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for character in text.chars() {
        match character {
            '\'' => quoted.push_str("\\'"),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Lists nested deeper than this print as `[...]` and compare unequal, which
/// also stops lists that contain themselves.
const MAX_RENDER_DEPTH: usize = 32;

/// List elements a single `==`, `!=` or `in` may visit.
pub const MAX_COMPARED_ITEMS: usize = 1_000_000;

const MAX_DEBUG_BYTES: usize = 4096;

/// A `fmt::Write` sink holding at most `limit` bytes. The write that would
/// pass the limit keeps what fits and fails, which ends a rendering early.
#[derive(Debug, Clone, Default)]
pub struct BoundedText {
    text: String,
    limit: usize,
    overflowed: bool,
}

impl BoundedText {
    pub fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            overflowed: false,
        }
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Write for BoundedText {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        if self.overflowed {
            return Err(fmt::Error);
        }
        let room = self.limit.saturating_sub(self.text.len());
        if text.len() <= room {
            self.text.push_str(text);
            return Ok(());
        }
        let mut cut = room;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&text[..cut]);
        self.overflowed = true;
        Err(fmt::Error)
    }
}

impl Value {
    /// Writes `str(value)` into `out`, stopping at the first failed write.
    pub fn write_to(&self, out: &mut impl fmt::Write) -> fmt::Result {
        self.render(out, 0)
    }

    /// `str(value)`, refused once it passes `limit` bytes.
    pub fn to_text_within(&self, limit: usize) -> Result<String, RuntimeError> {
        let mut text = BoundedText::new(limit);
        match self.write_to(&mut text) {
            Ok(()) => Ok(text.into_string()),
            Err(_) => Err(RuntimeError::value_error(format!(
                "string would exceed the limit of {limit} characters"
            ))),
        }
    }

    /// `self == other`, failing once the comparison has visited `budget` list
    /// elements. The budget can be shared by several comparisons.
    pub fn equals_within(&self, other: &Self, budget: &mut usize) -> Result<bool, RuntimeError> {
        self.equals(other, 0, budget).ok_or_else(|| {
            RuntimeError::value_error(format!(
                "comparison would visit more than {MAX_COMPARED_ITEMS} list items"
            ))
        })
    }

    fn render<W: fmt::Write>(&self, f: &mut W, depth: usize) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&format_float(*value)),
            Self::Text(text) => f.write_str(text),
            Self::List(_) if depth >= MAX_RENDER_DEPTH => f.write_str("[...]"),
            Self::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.borrow().iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Self::Text(text) => f.write_str(&quote(text))?,
                        other => other.render(f, depth + 1)?,
                    }
                }
                f.write_str("]")
            }
            Self::Member(id) => write!(f, "<member {id}>"),
            Self::Band => f.write_str("<band>"),
            Self::Builtin(builtin) => write!(f, "<built-in function {}>", builtin.name()),
            Self::Method(method) => write!(f, "<method {}>", method.name()),
        }
    }

    /// `None` once `budget` runs out.
    fn equals(&self, other: &Self, depth: usize, budget: &mut usize) -> Option<bool> {
        match (self, other) {
            (Self::None, Self::None) | (Self::Band, Self::Band) => Some(true),
            (Self::Bool(a), Self::Bool(b)) => Some(a == b),
            (Self::Int(a), Self::Int(b)) => Some(a == b),
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                Some(self.as_number() == other.as_number())
            }
            (Self::Text(a), Self::Text(b)) => Some(a == b),
            (Self::List(a), Self::List(b)) if Rc::ptr_eq(a, b) => Some(true),
            (Self::List(_), Self::List(_)) if depth >= MAX_RENDER_DEPTH => Some(false),
            (Self::List(a), Self::List(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return Some(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    *budget = budget.checked_sub(1)?;
                    if !x.equals(y, depth + 1, budget)? {
                        return Some(false);
                    }
                }
                Some(true)
            }
            (Self::Member(a), Self::Member(b)) => Some(a == b),
            (Self::Builtin(a), Self::Builtin(b)) => Some(a == b),
            _ => Some(false),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.render(f, 0)
    }
}

// Long values are cut off with `...`.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut text = BoundedText::new(MAX_DEBUG_BYTES);
        let _ = match self {
            Self::Text(value) => fmt::Write::write_str(&mut text, &quote(value)),
            other => other.write_to(&mut text),
        };
        f.write_str(text.as_str())?;
        if text.overflowed() {
            f.write_str("...")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<method {}>", self.name())
    }
}

impl PartialEq for Value {
    /// Comparisons too large to finish count as unequal.
    fn eq(&self, other: &Self) -> bool {
        let mut budget = MAX_COMPARED_ITEMS;
        self.equals(other, 0, &mut budget).unwrap_or(false)
    }
}

fn unsupported_operands(symbol: &str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand type(s) for {symbol}: '{}' and '{}'",
        a.type_name(),
        b.type_name()
    ))
}

fn repeat<T: Clone>(items: &[T], times: i64, max_len: usize) -> Result<Vec<T>, RuntimeError> {
    if items.is_empty() || times <= 0 {
        return Ok(Vec::new());
    }
    let times = usize::try_from(times).map_err(|_| RuntimeError::overflow())?;
    let len = items
        .len()
        .checked_mul(times)
        .filter(|len| *len <= max_len)
        .ok_or_else(|| {
            RuntimeError::value_error(format!("result would exceed the limit of {max_len} items"))
        })?;
    let mut repeated = Vec::with_capacity(len);
    for _ in 0..times {
        repeated.extend_from_slice(items);
    }
    Ok(repeated)
}

/// `a <operator> b`. `max_len` caps list and text results.
pub fn arithmetic(
    operator: ArithmeticOperator,
    a: &Value,
    b: &Value,
    max_len: usize,
) -> Result<Value, RuntimeError> {
    use ArithmeticOperator::*;
    match (operator, a, b) {
        (_, Value::Int(x), Value::Int(y)) => integer_arithmetic(operator, *x, *y),
        (_, Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (x, y) = (a.as_number().unwrap_or_default(), b.as_number().unwrap_or_default());
            float_arithmetic(operator, x, y).map(Value::Float)
        }
        (Add, Value::Text(x), Value::Text(y)) => {
            if x.len() + y.len() > max_len {
                return Err(RuntimeError::value_error(format!(
                    "result would exceed the limit of {max_len} characters"
                )));
            }
            Ok(Value::text(format!("{x}{y}")))
        }
        (Add, Value::List(x), Value::List(y)) => {
            let mut items = x.borrow().clone();
            items.extend(y.borrow().iter().cloned());
            if items.len() > max_len {
                return Err(RuntimeError::value_error(format!(
                    "result would exceed the limit of {max_len} items"
                )));
            }
            Ok(Value::list(items))
        }
        (Multiply, Value::Text(text), Value::Int(times))
        | (Multiply, Value::Int(times), Value::Text(text)) => {
            let characters: Vec<char> = text.chars().collect();
            let repeated = repeat(&characters, *times, max_len)?;
            Ok(Value::text(repeated.into_iter().collect::<String>()))
        }
        (Multiply, Value::List(items), Value::Int(times))
        | (Multiply, Value::Int(times), Value::List(items)) => {
            let items = items.borrow();
            Ok(Value::list(repeat(&items, *times, max_len)?))
        }
        _ => Err(unsupported_operands(operator.symbol(), a, b)),
    }
}

fn integer_arithmetic(operator: ArithmeticOperator, x: i64, y: i64) -> Result<Value, RuntimeError> {
    use ArithmeticOperator::*;
    let result = match operator {
        Add => x.checked_add(y),
        Subtract => x.checked_sub(y),
        Multiply => x.checked_mul(y),
        Divide => {
            if y == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            return Ok(Value::Float(x as f64 / y as f64));
        }
        FloorDivide => {
            if y == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            x.checked_div(y).map(|quotient| {
                if x % y != 0 && (x < 0) != (y < 0) {
                    quotient - 1
                } else {
                    quotient
                }
            })
        }
        Modulo => {
            if y == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            x.checked_rem(y).map(|remainder| {
                if remainder != 0 && (remainder < 0) != (y < 0) {
                    remainder + y
                } else {
                    remainder
                }
            })
        }
    };
    result.map(Value::Int).ok_or_else(RuntimeError::overflow)
}

fn float_arithmetic(operator: ArithmeticOperator, x: f64, y: f64) -> Result<f64, RuntimeError> {
    use ArithmeticOperator::*;
    match operator {
        Add => Ok(x + y),
        Subtract => Ok(x - y),
        Multiply => Ok(x * y),
        Divide | FloorDivide | Modulo if y == 0.0 => Err(RuntimeError::division_by_zero()),
        Divide => Ok(x / y),
        FloorDivide => Ok((x / y).floor()),
        Modulo => Ok(x - y * (x / y).floor()),
    }
}

pub fn negate(value: &Value) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(x) => x.checked_neg().map(Value::Int).ok_or_else(RuntimeError::overflow),
        Value::Float(x) => Ok(Value::Float(-x)),
        other => Err(RuntimeError::type_error(format!(
            "bad operand type for unary -: '{}'",
            other.type_name()
        ))),
    }
}

/// Ordering used by `<`, `min`, `max`. Only numbers with numbers and texts
/// with texts compare.
pub fn order(a: &Value, b: &Value, symbol: &str) -> Result<Ordering, RuntimeError> {
    let ordering = match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => a
            .as_number()
            .zip(b.as_number())
            .and_then(|(x, y)| x.partial_cmp(&y)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        _ => {
            return Err(RuntimeError::type_error(format!(
                "'{symbol}' not supported between instances of '{}' and '{}'",
                a.type_name(),
                b.type_name()
            )));
        }
    };
    // Only NaN lands here; `compare` answers false for it before ordering.
    Ok(ordering.unwrap_or(Ordering::Equal))
}

pub fn compare(comparator: Comparator, a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    let is_nan = |value: &Value| matches!(value, Value::Float(x) if x.is_nan());
    match comparator {
        Comparator::Equal | Comparator::NotEqual => {
            let mut budget = MAX_COMPARED_ITEMS;
            let equal = a.equals_within(b, &mut budget)?;
            Ok(equal == matches!(comparator, Comparator::Equal))
        }
        Comparator::In => contains(b, a),
        _ if is_nan(a) || is_nan(b) => {
            order(a, b, comparator.symbol())?;
            Ok(false)
        }
        Comparator::Less => Ok(order(a, b, "<")?.is_lt()),
        Comparator::LessOrEqual => Ok(order(a, b, "<=")?.is_le()),
        Comparator::Greater => Ok(order(a, b, ">")?.is_gt()),
        Comparator::GreaterOrEqual => Ok(order(a, b, ">=")?.is_ge()),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, RuntimeError> {
    match (container, item) {
        (Value::List(items), _) => {
            let mut budget = MAX_COMPARED_ITEMS;
            for element in items.borrow().iter() {
                if element.equals_within(item, &mut budget)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        (Value::Text(text), Value::Text(needle)) => Ok(text.contains(&**needle)),
        (Value::Text(_), other) => Err(RuntimeError::type_error(format!(
            "'in <string>' requires string as left operand, not {}",
            other.type_name()
        ))),
        (other, _) => Err(RuntimeError::new(
            ErrorKind::TypeError,
            format!("argument of type '{}' is not iterable", other.type_name()),
        )),
    }
}

/// Resolves a possibly negative index against `len`.
pub fn resolve_index(index: &Value, len: usize, what: &str) -> Result<usize, RuntimeError> {
    let Value::Int(index) = index else {
        return Err(RuntimeError::type_error(format!(
            "{what} indices must be integers, not '{}'",
            index.type_name()
        )));
    };
    let len = i64::try_from(len).map_err(|_| RuntimeError::overflow())?;
    let resolved = if *index < 0 { index + len } else { *index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).map_err(|_| RuntimeError::overflow())
    } else {
        Err(RuntimeError::index_error(format!("{what} index out of range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 10_000;

    fn shared_lists(width: usize) -> (Value, Value) {
        let inner = Value::list(vec![Value::Int(0); width]);
        let outer = Value::list(vec![inner.clone(); width]);
        (inner, outer)
    }

    #[test]
    fn bounded_text_keeps_what_fits() {
        use std::fmt::Write as _;
        let mut text = BoundedText::new(5);
        assert!(write!(text, "ab").is_ok());
        assert!(write!(text, "cdéf").is_err());
        assert!(text.overflowed());
        assert_eq!(text.as_str(), "abcd");
        assert!(write!(text, "g").is_err());
        assert_eq!(text.into_string(), "abcd");
    }

    #[test]
    fn large_values_render_within_limits() {
        let (_, outer) = shared_lists(1000);
        assert!(outer.to_text_within(100).is_err());
        assert_eq!(Value::Int(7).to_text_within(1).map_err(|e| e.kind), Ok("7".to_string()));
        let debug = format!("{outer:?}");
        assert!(debug.len() <= MAX_DEBUG_BYTES + 3);
        assert!(debug.ends_with("..."));
    }

    #[test]
    fn comparisons_share_a_budget() {
        let (inner, outer) = shared_lists(100);
        let copy = Value::list(vec![Value::list(vec![Value::Int(0); 100]); 100]);
        let mut budget = MAX_COMPARED_ITEMS;
        assert_eq!(outer.equals_within(&copy, &mut budget).map_err(|e| e.kind), Ok(true));
        assert_eq!(budget, MAX_COMPARED_ITEMS - 100 - 100 * 100);
        let mut budget = 50;
        let error = outer.equals_within(&copy, &mut budget).map(|_| ()).unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValueError);
        assert_eq!(outer, outer.clone());
        let mut budget = 0;
        assert_eq!(outer.equals_within(&outer, &mut budget).map_err(|e| e.kind), Ok(true));
        assert_eq!(inner.equals_within(&Value::Int(0), &mut budget).map_err(|e| e.kind), Ok(false));
    }

    #[test]
    fn display_matches_python() {
        assert_eq!(Value::Float(50.0).to_string(), "50.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::None.to_string(), "None");
        let list = Value::list(vec![Value::Int(1), Value::text("a'b"), Value::None]);
        assert_eq!(list.to_string(), r"[1, 'a\'b', None]");
    }

    #[test]
    fn self_containing_list_is_rendered_and_compared() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert!(list.to_string().contains("[...]"));
        assert_eq!(list, list.clone());
        let other = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &other {
            items.borrow_mut().push(other.clone());
        }
        assert_ne!(list, other);
    }

    #[test]
    fn integer_arithmetic_follows_python_rounding() {
        use ArithmeticOperator::*;
        let int = |operator, x, y| arithmetic(operator, &Value::Int(x), &Value::Int(y), MAX);
        assert_eq!(int(FloorDivide, 7, 2).unwrap(), Value::Int(3));
        assert_eq!(int(FloorDivide, -7, 2).unwrap(), Value::Int(-4));
        assert_eq!(int(Modulo, -7, 3).unwrap(), Value::Int(2));
        assert_eq!(int(Modulo, 7, -3).unwrap(), Value::Int(-2));
        assert_eq!(int(Divide, 7, 2).unwrap(), Value::Float(3.5));
        assert_eq!(
            int(Divide, 1, 0).unwrap_err().kind,
            ErrorKind::ZeroDivisionError
        );
        assert_eq!(
            int(Add, i64::MAX, 1).unwrap_err().kind,
            ErrorKind::OverflowError
        );
    }

    #[test]
    fn mixed_numbers_become_floats() {
        let sum = arithmetic(
            ArithmeticOperator::Add,
            &Value::Int(1),
            &Value::Float(0.5),
            MAX,
        )
        .unwrap();
        assert_eq!(sum, Value::Float(1.5));
        assert_eq!(Value::Int(2), Value::Float(2.0));
    }

    #[test]
    fn repetition_is_capped() {
        let list = Value::list(vec![Value::Int(0)]);
        let repeated = arithmetic(ArithmeticOperator::Multiply, &list, &Value::Int(3), MAX).unwrap();
        assert_eq!(repeated.to_string(), "[0, 0, 0]");
        let error = arithmetic(ArithmeticOperator::Multiply, &list, &Value::Int(20_000), MAX)
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValueError);
        let empty = arithmetic(ArithmeticOperator::Multiply, &Value::text("ab"), &Value::Int(-1), MAX)
            .unwrap();
        assert_eq!(empty, Value::text(""));
    }

    #[test]
    fn mismatched_operands_are_type_errors() {
        let error = arithmetic(
            ArithmeticOperator::Add,
            &Value::Int(1),
            &Value::text("a"),
            MAX,
        )
        .unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeError);
        assert!(compare(Comparator::Less, &Value::Int(1), &Value::text("a")).is_err());
    }

    #[test]
    fn membership() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert!(compare(Comparator::In, &Value::Float(2.0), &list).unwrap());
        assert!(compare(Comparator::In, &Value::text("ras"), &Value::text("brass")).unwrap());
        assert!(compare(Comparator::In, &Value::Int(1), &Value::Int(1)).is_err());
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        assert_eq!(resolve_index(&Value::Int(-1), 4, "list").unwrap(), 3);
        assert_eq!(
            resolve_index(&Value::Int(4), 4, "list").unwrap_err().kind,
            ErrorKind::IndexError
        );
        assert_eq!(
            resolve_index(&Value::text("0"), 4, "list").unwrap_err().kind,
            ErrorKind::TypeError
        );
    }
}
