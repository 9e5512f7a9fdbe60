//! `f'...'` texts: splitting the raw content into literal runs and
//! interpolations, and parsing the interpolated expressions once the
//! surrounding script has been parsed.

use super::{
    Branch, Expression, FormatPart, Interpolation, ParseError, Span, Spanned, Statement, Token,
    lexer::push_escaped, parse_expression,
};

pub fn split_format_text<'code>(
    content: &'code str,
    offset: usize,
) -> Result<Vec<FormatPart<'code>>, ParseError<'code, Token<'code>>> {
    let error_at = |start: usize, end: usize, message: String| {
        ParseError::custom(Span::from(offset + start..offset + end), message)
    };

    let mut parts = Vec::new();
    let mut text = String::new();
    let mut characters = content.char_indices().peekable();

    while let Some((index, character)) = characters.next() {
        match character {
            '{' if characters.next_if(|(_, next)| *next == '{').is_some() => text.push('{'),
            '}' if characters.next_if(|(_, next)| *next == '}').is_some() => text.push('}'),
            '}' => {
                return Err(error_at(
                    index,
                    index + 1,
                    "f-string: single '}' is not allowed".to_string(),
                ));
            }
            '\\' => match characters.next() {
                Some((_, escaped)) => push_escaped(&mut text, escaped),
                None => text.push('\\'),
            },
            '{' => {
                let start = index + 1;
                let Some(end) = closing_brace(content, start) else {
                    return Err(error_at(
                        index,
                        content.len(),
                        "f-string: expecting '}'".to_string(),
                    ));
                };
                while characters.next_if(|(next, _)| *next <= end).is_some() {}

                let inner = &content[start..end];
                let (source, spec) = match top_level_colon(inner) {
                    Some(colon) => (&inner[..colon], Some(&inner[colon + 1..])),
                    None => (inner, None),
                };
                if source.trim().is_empty() {
                    return Err(error_at(
                        index,
                        end + 1,
                        "f-string: empty expression not allowed".to_string(),
                    ));
                }
                let precision = match spec {
                    None => None,
                    Some(spec) => Some(parse_precision(spec).ok_or_else(|| {
                        error_at(
                            start,
                            end,
                            format!("f-string: unsupported format specifier '{spec}'"),
                        )
                    })?),
                };
                if !text.is_empty() {
                    parts.push(FormatPart::Text(std::mem::take(&mut text)));
                }
                parts.push(FormatPart::Interpolation(Interpolation {
                    source,
                    offset: offset + start,
                    precision,
                    expression: None,
                }));
            }
            _ => text.push(character),
        }
    }
    if !text.is_empty() {
        parts.push(FormatPart::Text(text));
    }
    Ok(parts)
}

/// Byte index of the `}` closing an interpolation opened just before `start`.
fn closing_brace(content: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    for (index, character) in content[start..].char_indices() {
        match (quote, character) {
            (Some(open), _) if character == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(character),
            (None, '}') => return Some(start + index),
            (None, _) => {}
        }
    }
    None
}

fn top_level_colon(inner: &str) -> Option<usize> {
    let mut quote = None;
    for (index, character) in inner.char_indices() {
        match (quote, character) {
            (Some(open), _) if character == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(character),
            (None, ':') => return Some(index),
            (None, _) => {}
        }
    }
    None
}

/// Only fixed-point specifiers (`.2f`) are supported.
fn parse_precision(spec: &str) -> Option<usize> {
    let digits = spec.strip_prefix('.')?.strip_suffix('f')?;
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    digits.parse().ok()
}

/// Parses every interpolation left unparsed by [`split_format_text`].
pub fn resolve_format_texts<'code>(
    statements: &mut [Spanned<Statement<'code>>],
) -> Result<(), Vec<ParseError<'code, Token<'code>>>> {
    let mut errors = Vec::new();
    for statement in statements {
        resolve_statement(statement, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn resolve_statement<'code>(
    statement: &mut Spanned<Statement<'code>>,
    errors: &mut Vec<ParseError<'code, Token<'code>>>,
) {
    crate::with_stack(|| resolve_statement_node(&mut statement.node, errors));
}

fn resolve_statement_node<'code>(
    statement: &mut Statement<'code>,
    errors: &mut Vec<ParseError<'code, Token<'code>>>,
) {
    match statement {
        Statement::Expression(expression) => resolve_expression(expression, errors),
        Statement::Assignment { target, value }
        | Statement::AugmentedAssignment { target, value, .. } => {
            resolve_expression(target, errors);
            resolve_expression(value, errors);
        }
        Statement::If {
            branches,
            otherwise,
        } => {
            for Branch { condition, body } in branches {
                resolve_expression(condition, errors);
                body.iter_mut()
                    .for_each(|statement| resolve_statement(statement, errors));
            }
            for statement in otherwise.iter_mut().flatten() {
                resolve_statement(statement, errors);
            }
        }
        Statement::For { iterable, body, .. } => {
            resolve_expression(iterable, errors);
            body.iter_mut()
                .for_each(|statement| resolve_statement(statement, errors));
        }
        Statement::While { condition, body } => {
            resolve_expression(condition, errors);
            body.iter_mut()
                .for_each(|statement| resolve_statement(statement, errors));
        }
        Statement::Pass | Statement::Break | Statement::Continue => {}
    }
}

fn resolve_expression<'code>(
    expression: &mut Spanned<Expression<'code>>,
    errors: &mut Vec<ParseError<'code, Token<'code>>>,
) {
    crate::with_stack(|| resolve_expression_node(&mut expression.node, errors));
}

fn resolve_expression_node<'code>(
    expression: &mut Expression<'code>,
    errors: &mut Vec<ParseError<'code, Token<'code>>>,
) {
    match expression {
        Expression::FormatText { parts } => {
            for part in parts {
                let FormatPart::Interpolation(interpolation) = part else {
                    continue;
                };
                if interpolation.expression.is_some() {
                    continue;
                }
                match parse_expression(interpolation.source, interpolation.offset) {
                    Ok(mut parsed) => {
                        resolve_expression(&mut parsed, errors);
                        interpolation.expression = Some(Box::new(parsed));
                    }
                    Err(parse_errors) => errors.extend(parse_errors),
                }
            }
        }
        Expression::List { items } => items
            .iter_mut()
            .for_each(|item| resolve_expression(item, errors)),
        Expression::Call { callee, arguments } => {
            resolve_expression(callee, errors);
            arguments
                .iter_mut()
                .for_each(|argument| resolve_expression(argument, errors));
        }
        Expression::Attribute { object, .. } => resolve_expression(object, errors),
        Expression::Index { object, index } => {
            resolve_expression(object, errors);
            resolve_expression(index, errors);
        }
        Expression::Negate { operand } | Expression::Not { operand } => {
            resolve_expression(operand, errors)
        }
        Expression::ArithmeticOperator {
            operand_a,
            operand_b,
            ..
        }
        | Expression::Comparator {
            operand_a,
            operand_b,
            ..
        }
        | Expression::Logical {
            operand_a,
            operand_b,
            ..
        } => {
            resolve_expression(operand_a, errors);
            resolve_expression(operand_b, errors);
        }
        Expression::Literal(_) | Expression::Name(_) => {}
    }
}
