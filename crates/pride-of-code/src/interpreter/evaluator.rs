use super::builtins::{Arguments, Builtin};
use super::value::{
    BandMethod, ListMethod, Method, Value, arithmetic, compare, negate, resolve_index,
};
use super::{ErrorKind, Limits, Namespace, OutputBuffer, RuntimeError};
use crate::band::{Facing, MemberId, Roster};
use crate::parser::{
    ArithmeticOperator, Branch, Expression, FormatPart, Literal, LogicalOperator, Span, Spanned,
    Statement,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

enum Flow {
    Normal,
    Break,
    Continue,
}

/// Runs parsed statements against one roster, namespace and output buffer.
pub struct Interpreter<'run> {
    roster: &'run mut Roster,
    namespace: &'run mut Namespace,
    output: &'run mut OutputBuffer,
    limits: Limits,
    steps: u64,
    loop_depth: usize,
}

impl<'run> Interpreter<'run> {
    pub fn new(
        roster: &'run mut Roster,
        namespace: &'run mut Namespace,
        output: &'run mut OutputBuffer,
        limits: Limits,
    ) -> Self {
        Self {
            roster,
            namespace,
            output,
            limits,
            steps: 0,
            loop_depth: 0,
        }
    }

    /// Statements and loop iterations executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn run(&mut self, statements: &[Spanned<Statement<'_>>]) -> Result<(), RuntimeError> {
        self.execute_block(statements).map(|_| ())
    }

    fn step(&mut self, span: Span) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(RuntimeError::new(
                ErrorKind::StepLimitExceeded,
                format!("script took more than {} steps", self.limits.max_steps),
            )
            .at(span.into_range()));
        }
        Ok(())
    }

    fn execute_block(&mut self, statements: &[Spanned<Statement<'_>>]) -> Result<Flow, RuntimeError> {
        for statement in statements {
            match self.execute(statement)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute(&mut self, statement: &Spanned<Statement<'_>>) -> Result<Flow, RuntimeError> {
        self.step(statement.span)?;
        let span = statement.span.into_range();
        crate::with_stack(|| self.execute_node(&statement.node))
            .map_err(|error| error.at(span))
    }

    fn execute_node(&mut self, statement: &Statement<'_>) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::Expression(expression) => {
                self.evaluate(expression)?;
            }
            Statement::Assignment { target, value } => {
                let value = self.evaluate(value)?;
                self.assign(target, value)?;
            }
            Statement::AugmentedAssignment {
                target,
                operator,
                value,
            } => self.augmented_assign(target, *operator, value)?,
            Statement::If {
                branches,
                otherwise,
            } => {
                for Branch { condition, body } in branches {
                    if self.evaluate(condition)?.is_truthy() {
                        return self.execute_block(body);
                    }
                }
                if let Some(body) = otherwise {
                    return self.execute_block(body);
                }
            }
            Statement::For {
                variable,
                iterable,
                body,
            } => {
                let items = self.iterate(iterable)?;
                self.loop_depth += 1;
                let result = self.run_for(variable, items, body);
                self.loop_depth -= 1;
                result?;
            }
            Statement::While { condition, body } => {
                self.loop_depth += 1;
                let result = self.run_while(condition, body);
                self.loop_depth -= 1;
                result?;
            }
            Statement::Pass => {}
            Statement::Break | Statement::Continue if self.loop_depth == 0 => {
                let keyword = if matches!(statement, Statement::Break) {
                    "break"
                } else {
                    "continue"
                };
                return Err(RuntimeError::new(
                    ErrorKind::SyntaxError,
                    format!("'{keyword}' outside loop"),
                ));
            }
            Statement::Break => return Ok(Flow::Break),
            Statement::Continue => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    fn run_for(
        &mut self,
        variable: &Spanned<&str>,
        items: Vec<Value>,
        body: &[Spanned<Statement<'_>>],
    ) -> Result<(), RuntimeError> {
        for item in items {
            self.step(variable.span)?;
            self.namespace.set(variable.node, item);
            if let Flow::Break = self.execute_block(body)? {
                break;
            }
        }
        Ok(())
    }

    fn run_while(
        &mut self,
        condition: &Spanned<Expression<'_>>,
        body: &[Spanned<Statement<'_>>],
    ) -> Result<(), RuntimeError> {
        loop {
            self.step(condition.span)?;
            if !self.evaluate(condition)?.is_truthy() {
                return Ok(());
            }
            if let Flow::Break = self.execute_block(body)? {
                return Ok(());
            }
        }
    }

    fn iterate(&mut self, iterable: &Spanned<Expression<'_>>) -> Result<Vec<Value>, RuntimeError> {
        match self.evaluate(iterable)? {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Text(text) => Ok(text
                .chars()
                .map(|character| Value::text(character.to_string()))
                .collect()),
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))
            .at(iterable.span.into_range())),
        }
    }

    fn evaluate(&mut self, expression: &Spanned<Expression<'_>>) -> Result<Value, RuntimeError> {
        let span = expression.span.into_range();
        crate::with_stack(|| self.evaluate_node(&expression.node))
            .map_err(|error| error.at(span))
    }

    fn evaluate_node(&mut self, expression: &Expression<'_>) -> Result<Value, RuntimeError> {
        match expression {
            Expression::Literal(literal) => Ok(match literal {
                Literal::Integer(integer) => Value::Int(*integer),
                Literal::Float(float) => Value::Float(*float),
                Literal::Text(text) => Value::text(&**text),
                Literal::Bool(boolean) => Value::Bool(*boolean),
                Literal::None => Value::None,
            }),
            Expression::FormatText { parts } => self.format_text(parts),
            Expression::Name(name) => self.lookup(name),
            Expression::List { items } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item)?);
                }
                Ok(Value::list(values))
            }
            Expression::Attribute { object, name } => {
                let object = self.evaluate(object)?;
                self.attribute(&object, name.node)
                    .map_err(|error| error.at(name.span.into_range()))
            }
            Expression::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                item(&object, &index)
            }
            Expression::Call { callee, arguments } => {
                let callee = self.evaluate(callee)?;
                let mut values = Arguments::new();
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }
                self.call(callee, values)
            }
            Expression::Negate { operand } => negate(&self.evaluate(operand)?),
            Expression::Not { operand } => Ok(Value::Bool(!self.evaluate(operand)?.is_truthy())),
            Expression::ArithmeticOperator {
                operator,
                operand_a,
                operand_b,
            } => {
                let a = self.evaluate(operand_a)?;
                let b = self.evaluate(operand_b)?;
                arithmetic(*operator, &a, &b, self.limits.max_collection_len)
            }
            Expression::Comparator {
                comparator,
                operand_a,
                operand_b,
            } => {
                let a = self.evaluate(operand_a)?;
                let b = self.evaluate(operand_b)?;
                compare(*comparator, &a, &b).map(Value::Bool)
            }
            Expression::Logical {
                operator,
                operand_a,
                operand_b,
            } => {
                let a = self.evaluate(operand_a)?;
                match (operator, a.is_truthy()) {
                    (LogicalOperator::And, false) | (LogicalOperator::Or, true) => Ok(a),
                    _ => self.evaluate(operand_b),
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.namespace.get(name) {
            return Ok(value.clone());
        }
        Builtin::from_name(name).map(Value::Builtin).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::NameError,
                format!("name '{name}' is not defined"),
            )
        })
    }

    fn format_text(&mut self, parts: &[FormatPart<'_>]) -> Result<Value, RuntimeError> {
        let mut text = String::new();
        for part in parts {
            match part {
                FormatPart::Text(literal) => text.push_str(literal),
                FormatPart::Interpolation(interpolation) => {
                    let Some(expression) = &interpolation.expression else {
                        return Err(RuntimeError::new(
                            ErrorKind::SyntaxError,
                            format!("f-string: could not read '{}'", interpolation.source),
                        ));
                    };
                    let value = self.evaluate(expression)?;
                    match (interpolation.precision, value.as_number()) {
                        (None, _) => {
                            text.push_str(&value.to_text_within(self.limits.max_collection_len)?)
                        }
                        (Some(precision), Some(number)) => {
                            text.push_str(&format!("{number:.precision$}"))
                        }
                        (Some(_), None) => {
                            return Err(RuntimeError::value_error(format!(
                                "unknown format code 'f' for object of type '{}'",
                                value.type_name()
                            ))
                            .at(expression.span.into_range()));
                        }
                    }
                }
            }
            if text.len() > self.limits.max_collection_len {
                return Err(RuntimeError::value_error(format!(
                    "f-string result would exceed the limit of {} characters",
                    self.limits.max_collection_len
                )));
            }
        }
        Ok(Value::text(text))
    }

    fn attribute(&self, object: &Value, name: &str) -> Result<Value, RuntimeError> {
        let missing = || {
            RuntimeError::new(
                ErrorKind::AttributeError,
                format!("'{}' object has no attribute '{name}'", object.type_name()),
            )
        };
        match object {
            Value::Member(id) => {
                let member = self.roster.member(*id).ok_or_else(|| {
                    RuntimeError::new(
                        ErrorKind::AttributeError,
                        format!("member {id} is no longer on the field"),
                    )
                })?;
                match name {
                    "x" => Ok(Value::Float(member.x)),
                    "y" => Ok(Value::Float(member.y)),
                    "id" => i64::try_from(member.id)
                        .map(Value::Int)
                        .map_err(|_| RuntimeError::overflow()),
                    "section" => Ok(Value::text(member.section.name())),
                    "facing" => Ok(Value::text(member.facing.name())),
                    _ => Err(missing()),
                }
            }
            Value::Band => BandMethod::from_name(name)
                .map(|method| Value::Method(Method::Band(method)))
                .ok_or_else(missing),
            Value::List(list) => ListMethod::from_name(name)
                .map(|method| {
                    Value::Method(Method::List {
                        list: Rc::clone(list),
                        method,
                    })
                })
                .ok_or_else(missing),
            _ => Err(missing()),
        }
    }

    fn call(&mut self, callee: Value, arguments: Arguments) -> Result<Value, RuntimeError> {
        match callee {
            Value::Builtin(builtin) => builtin.call(arguments, self.output, &self.limits),
            Value::Method(Method::Band(method)) => self.call_band(method, &arguments),
            Value::Method(Method::List { list, method }) => {
                self.call_list(&list, method, arguments)
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_band(&mut self, method: BandMethod, arguments: &[Value]) -> Result<Value, RuntimeError> {
        let name = method.name();
        trace!(method = name, arguments = arguments.len(), "band call");
        match (method, arguments) {
            (BandMethod::MoveTo, [member, x, y]) => {
                let member = member_argument(name, member)?;
                let x = number_argument(name, "x", x)?;
                let y = number_argument(name, "y", y)?;
                if let Some(id) = member {
                    self.roster.move_to(id, x, y);
                }
            }
            (BandMethod::MoveForward, [member, steps]) => {
                let member = member_argument(name, member)?;
                let steps = number_argument(name, "steps", steps)?;
                if let Some(id) = member {
                    self.roster.move_forward(id, steps);
                }
            }
            (BandMethod::FormCircle, [members, cx, cy, radius]) => {
                let ids = members_argument(name, members)?;
                let cx = number_argument(name, "cx", cx)?;
                let cy = number_argument(name, "cy", cy)?;
                let radius = number_argument(name, "radius", radius)?;
                self.roster.form_circle(&ids, cx, cy, radius);
            }
            (BandMethod::FormLine, [members, x1, y1, x2, y2]) => {
                let ids = members_argument(name, members)?;
                let x1 = number_argument(name, "x1", x1)?;
                let y1 = number_argument(name, "y1", y1)?;
                let x2 = number_argument(name, "x2", x2)?;
                let y2 = number_argument(name, "y2", y2)?;
                self.roster.form_line(&ids, x1, y1, x2, y2);
            }
            (BandMethod::GetSection, [section]) => {
                let Value::Text(section) = section else {
                    return Err(RuntimeError::type_error(format!(
                        "{name}() expected a section name, got '{}'",
                        section.type_name()
                    )));
                };
                let ids = self.roster.get_section(section)?;
                return Ok(Value::list(ids.iter().copied().map(Value::Member).collect()));
            }
            (BandMethod::Face, [member, direction]) => {
                let member = member_argument(name, member)?;
                let Value::Text(direction) = direction else {
                    return Err(RuntimeError::type_error(format!(
                        "{name}() expected a direction, got '{}'",
                        direction.type_name()
                    )));
                };
                let facing = direction.parse::<Facing>().map_err(|()| {
                    RuntimeError::value_error(format!(
                        "unknown direction '{direction}' (expected north, east, south or west)"
                    ))
                })?;
                if let Some(id) = member {
                    self.roster.face(id, facing);
                }
            }
            _ => {
                let expected = method.parameters();
                return Err(RuntimeError::type_error(format!(
                    "{name}({}) takes {} arguments ({} given)",
                    expected.join(", "),
                    expected.len(),
                    arguments.len()
                )));
            }
        }
        Ok(Value::None)
    }

    fn call_list(
        &mut self,
        list: &Rc<RefCell<Vec<Value>>>,
        method: ListMethod,
        arguments: Arguments,
    ) -> Result<Value, RuntimeError> {
        match (method, arguments.as_slice()) {
            (ListMethod::Append, [item]) => {
                let mut items = list.borrow_mut();
                if items.len() >= self.limits.max_collection_len {
                    return Err(RuntimeError::value_error(format!(
                        "list would exceed the limit of {} items",
                        self.limits.max_collection_len
                    )));
                }
                items.push(item.clone());
                Ok(Value::None)
            }
            (ListMethod::Pop, []) => list
                .borrow_mut()
                .pop()
                .ok_or_else(|| RuntimeError::index_error("pop from empty list")),
            (ListMethod::Pop, [index]) => {
                let mut items = list.borrow_mut();
                if items.is_empty() {
                    return Err(RuntimeError::index_error("pop from empty list"));
                }
                let index = resolve_index(index, items.len(), "pop")?;
                Ok(items.remove(index))
            }
            (ListMethod::Append, _) => Err(RuntimeError::type_error(format!(
                "append() takes exactly one argument ({} given)",
                arguments.len()
            ))),
            (ListMethod::Pop, _) => Err(RuntimeError::type_error(format!(
                "pop expected at most 1 argument, got {}",
                arguments.len()
            ))),
        }
    }

    fn assign(&mut self, target: &Spanned<Expression<'_>>, value: Value) -> Result<(), RuntimeError> {
        match &target.node {
            Expression::Name(name) => {
                self.namespace.set(name, value);
                Ok(())
            }
            Expression::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                set_item(&object, &index, value)
            }
            Expression::Attribute { object, name } => {
                let object = self.evaluate(object)?;
                Err(read_only_attribute(&object, name.node).at(name.span.into_range()))
            }
            _ => Err(RuntimeError::new(
                ErrorKind::SyntaxError,
                "cannot assign to this expression",
            )),
        }
    }

    fn augmented_assign(
        &mut self,
        target: &Spanned<Expression<'_>>,
        operator: ArithmeticOperator,
        value: &Spanned<Expression<'_>>,
    ) -> Result<(), RuntimeError> {
        match &target.node {
            Expression::Name(name) => {
                let current = self.lookup(name).map_err(|error| error.at(target.span.into_range()))?;
                let value = self.evaluate(value)?;
                let result = self.combine(operator, current, &value)?;
                self.namespace.set(name, result);
                Ok(())
            }
            Expression::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let current = item(&object, &index)?;
                let value = self.evaluate(value)?;
                let result = self.combine(operator, current, &value)?;
                set_item(&object, &index, result)
            }
            Expression::Attribute { object, name } => {
                let object = self.evaluate(object)?;
                self.attribute(&object, name.node)?;
                Err(read_only_attribute(&object, name.node).at(name.span.into_range()))
            }
            _ => Err(RuntimeError::new(
                ErrorKind::SyntaxError,
                "cannot assign to this expression",
            )),
        }
    }

    /// `list += list` extends in place so every alias sees the new items.
    fn combine(
        &self,
        operator: ArithmeticOperator,
        current: Value,
        value: &Value,
    ) -> Result<Value, RuntimeError> {
        if let (ArithmeticOperator::Add, Value::List(items), Value::List(extra)) =
            (operator, &current, value)
        {
            let extra = extra.borrow().clone();
            let mut items = items.borrow_mut();
            if items.len() + extra.len() > self.limits.max_collection_len {
                return Err(RuntimeError::value_error(format!(
                    "list would exceed the limit of {} items",
                    self.limits.max_collection_len
                )));
            }
            items.extend(extra);
            drop(items);
            return Ok(current);
        }
        arithmetic(operator, &current, value, self.limits.max_collection_len)
    }
}

fn item(object: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let index = resolve_index(index, items.len(), "list")?;
            Ok(items[index].clone())
        }
        Value::Text(text) => {
            let characters: Vec<char> = text.chars().collect();
            let index = resolve_index(index, characters.len(), "string")?;
            Ok(Value::text(characters[index].to_string()))
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn set_item(object: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    let Value::List(items) = object else {
        return Err(RuntimeError::type_error(format!(
            "'{}' object does not support item assignment",
            object.type_name()
        )));
    };
    let mut items = items.borrow_mut();
    let index = resolve_index(index, items.len(), "list assignment")?;
    items[index] = value;
    Ok(())
}

fn read_only_attribute(object: &Value, name: &str) -> RuntimeError {
    let message = match object {
        Value::Member(_) => format!(
            "can't set attribute '{name}' of a band member; move members with band.move_to() or band.face()"
        ),
        other => format!("cannot set attribute '{name}' on '{}' object", other.type_name()),
    };
    RuntimeError::new(ErrorKind::AttributeError, message)
}

/// A member handle, an index into the roster or `None`. Negative indices and
/// `None` select nobody.
fn member_argument(method: &str, value: &Value) -> Result<Option<MemberId>, RuntimeError> {
    match value {
        Value::Member(id) => Ok(Some(*id)),
        Value::Int(index) => Ok(usize::try_from(*index).ok()),
        Value::None => Ok(None),
        other => Err(RuntimeError::type_error(format!(
            "{method}() expected a band member, got '{}'",
            other.type_name()
        ))),
    }
}

fn members_argument(method: &str, value: &Value) -> Result<Vec<MemberId>, RuntimeError> {
    match value {
        Value::None => Ok(Vec::new()),
        Value::Member(id) => Ok(vec![*id]),
        Value::List(items) => {
            let mut ids = Vec::new();
            for item in items.borrow().iter() {
                if let Some(id) = member_argument(method, item)? {
                    ids.push(id);
                }
            }
            Ok(ids)
        }
        other => Err(RuntimeError::type_error(format!(
            "{method}() expected a list of members, got '{}'",
            other.type_name()
        ))),
    }
}

fn number_argument(method: &str, parameter: &str, value: &Value) -> Result<f64, RuntimeError> {
    value.as_number().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "{method}() argument '{parameter}' must be a number, not '{}'",
            value.type_name()
        ))
    })
}
