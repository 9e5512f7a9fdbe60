use chumsky::{
    input::{Stream, ValueInput},
    pratt::*,
    prelude::*,
};
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

mod lexer;
pub use lexer::{Token, indentation_width, lexer, unescape};

mod layout;
pub use layout::{MAX_NESTING, MAX_STATEMENT_OPERATORS, check_nesting, resolve_layout};

mod format_text;
pub use format_text::{resolve_format_texts, split_format_text};

pub use chumsky::prelude::{Input, Parser};

pub type Span = SimpleSpan;
pub type ParseError<'code, T> = Rich<'code, T, Span>;

#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

/// A syntax error detached from the token type, ready to be reported.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub span: Range<usize>,
    pub message: String,
    pub label: String,
}

impl SyntaxError {
    pub fn new(span: Range<usize>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            span,
            label: message.clone(),
            message,
        }
    }

    fn from_errors<'code, T: fmt::Display + 'code>(
        errors: impl IntoIterator<Item = ParseError<'code, T>>,
    ) -> Vec<Self> {
        errors
            .into_iter()
            .map(|error| Self {
                span: error.span().into_range(),
                message: error.to_string(),
                label: error.reason().to_string(),
            })
            .collect()
    }
}

/// Lexes, lays out and parses a whole script.
pub fn parse_script(source_code: &str) -> Result<Vec<Spanned<Statement<'_>>>, Vec<SyntaxError>> {
    let (tokens, errors) = lexer().parse(source_code).into_output_errors();
    if !errors.is_empty() {
        return Err(SyntaxError::from_errors(errors));
    }
    let Some(tokens) = tokens else {
        return Err(vec![SyntaxError::new(0..0, "could not read the script")]);
    };

    let tokens = resolve_layout(tokens, source_code).map_err(SyntaxError::from_errors)?;

    let end_of_input = Span::from(source_code.len()..source_code.len());
    let (statements, errors) = parser()
        .parse(
            Stream::from_iter(tokens).map(end_of_input, |Spanned { node, span }| (node, span)),
        )
        .into_output_errors();
    if !errors.is_empty() {
        return Err(SyntaxError::from_errors(errors));
    }
    let Some(mut statements) = statements else {
        return Err(vec![SyntaxError::new(0..0, "could not parse the script")]);
    };

    resolve_format_texts(&mut statements).map_err(SyntaxError::from_errors)?;
    Ok(statements)
}

/// Parses the expression inside an f-string interpolation. `offset` is the
/// position of `source` in the whole script so spans stay script-relative.
pub fn parse_expression(
    source: &str,
    offset: usize,
) -> Result<Spanned<Expression<'_>>, Vec<ParseError<'_, Token<'_>>>> {
    let shift = |span: Span| {
        let range = span.into_range();
        Span::from(range.start + offset..range.end + offset)
    };

    let (tokens, errors) = lexer().parse(source).into_output_errors();
    if !errors.is_empty() {
        return Err(errors
            .into_iter()
            .map(|error| ParseError::custom(shift(*error.span()), error.reason().to_string()))
            .collect());
    }
    let tokens: Vec<_> = tokens
        .unwrap_or_default()
        .into_iter()
        .filter(|token| !matches!(token.node, Token::Comment(_) | Token::LineBreak(_)))
        .map(|token| Spanned {
            node: token.node,
            span: shift(token.span),
        })
        .collect();
    check_nesting(&tokens).map_err(|error| vec![error])?;

    let end = offset + source.len();
    expression()
        .parse(
            Stream::from_iter(tokens)
                .map(Span::from(end..end), |Spanned { node, span }| (node, span)),
        )
        .into_result()
}

pub fn parser<'code, I>()
-> impl Parser<'code, I, Vec<Spanned<Statement<'code>>>, extra::Err<ParseError<'code, Token<'code>>>>
where
    I: ValueInput<'code, Token = Token<'code>, Span = Span>,
{
    let expression = expression().boxed();
    let newline = just(Token::Newline);

    let assignment_operator = select! {
        Token::Assign => None,
        Token::PlusAssign => Some(ArithmeticOperator::Add),
        Token::MinusAssign => Some(ArithmeticOperator::Subtract),
        Token::AsteriskAssign => Some(ArithmeticOperator::Multiply),
        Token::SlashAssign => Some(ArithmeticOperator::Divide),
    };

    let expression_or_assignment = expression
        .clone()
        .then(assignment_operator.then(expression.clone()).or_not())
        .try_map(|(target, assignment), _| {
            let Some((operator, value)) = assignment else {
                return Ok(Statement::Expression(target));
            };
            if !target.node.is_assignable() {
                return Err(ParseError::custom(
                    target.span,
                    "cannot assign to this expression",
                ));
            }
            Ok(match operator {
                None => Statement::Assignment { target, value },
                Some(operator) => Statement::AugmentedAssignment {
                    target,
                    operator,
                    value,
                },
            })
        });

    let simple_statement = choice((
        just(Token::Pass).to(Statement::Pass),
        just(Token::Break).to(Statement::Break),
        just(Token::Continue).to(Statement::Continue),
        expression_or_assignment,
    ))
    .map_with(|statement, extra| Spanned {
        node: statement,
        span: extra.span(),
    });

    // `a = 1; b = 2` shares one line.
    let simple_line = simple_statement
        .separated_by(just(Token::Semicolon))
        .allow_trailing()
        .at_least(1)
        .collect::<Vec<_>>()
        .then_ignore(newline.clone())
        .boxed();

    let line = recursive(|line| {
        let suite = newline
            .clone()
            .ignore_then(
                line.repeated()
                    .at_least(1)
                    .collect::<Vec<Vec<_>>>()
                    .delimited_by(just(Token::Indent), just(Token::Dedent)),
            )
            .map(|lines| lines.into_iter().flatten().collect::<Vec<_>>());

        let block = just(Token::Colon)
            .ignore_then(choice((suite, simple_line.clone())))
            .boxed();

        let if_statement = just(Token::If)
            .ignore_then(expression.clone())
            .then(block.clone())
            .then(
                just(Token::Elif)
                    .ignore_then(expression.clone())
                    .then(block.clone())
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .then(just(Token::Else).ignore_then(block.clone()).or_not())
            .map(|(((condition, body), elif_branches), otherwise)| {
                let branches = [(condition, body)]
                    .into_iter()
                    .chain(elif_branches)
                    .map(|(condition, body)| Branch { condition, body })
                    .collect();
                Statement::If {
                    branches,
                    otherwise,
                }
            });

        let variable = select! { Token::Identifier(name) => name }.map_with(|name, extra| {
            Spanned {
                node: name,
                span: extra.span(),
            }
        });

        let for_statement = just(Token::For)
            .ignore_then(variable)
            .then_ignore(just(Token::In))
            .then(expression.clone())
            .then(block.clone())
            .map(|((variable, iterable), body)| Statement::For {
                variable,
                iterable,
                body,
            });

        let while_statement = just(Token::While)
            .ignore_then(expression.clone())
            .then(block)
            .map(|(condition, body)| Statement::While { condition, body });

        let compound_statement = choice((if_statement, for_statement, while_statement))
            .map_with(|statement, extra| {
                vec![Spanned {
                    node: statement,
                    span: extra.span(),
                }]
            });

        choice((compound_statement, simple_line.clone()))
    });

    line.repeated()
        .collect::<Vec<Vec<_>>>()
        .map(|lines| lines.into_iter().flatten().collect())
}

enum Postfix<'code> {
    Call(Vec<Spanned<Expression<'code>>>),
    Attribute(Spanned<&'code str>),
    Index(Spanned<Expression<'code>>),
}

pub fn expression<'code, I>()
-> impl Parser<'code, I, Spanned<Expression<'code>>, extra::Err<ParseError<'code, Token<'code>>>> + Clone
where
    I: ValueInput<'code, Token = Token<'code>, Span = Span>,
{
    recursive(|expression| {
        let comma = just(Token::Comma);
        let bracket_round_open = just(Token::BracketRoundOpen);
        let bracket_round_close = just(Token::BracketRoundClose);
        let bracket_square_open = just(Token::BracketSquareOpen);
        let bracket_square_close = just(Token::BracketSquareClose);

        let literal = select! {
            Token::Integer(integer) => Literal::Integer(integer),
            Token::Float(float) => Literal::Float(float),
            Token::Text(text) => Literal::Text(unescape(text)),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::None => Literal::None,
        }
        .map(Expression::Literal);

        // Interpolated expressions are parsed later by `resolve_format_texts`.
        let format_text =
            select! { Token::FormatText(content) => content }.try_map(|content, span: Span| {
                split_format_text(content, span.into_range().start + 2)
                    .map(|parts| Expression::FormatText { parts })
            });

        let name = select! { Token::Identifier(name) => Expression::Name(name) };

        let list = expression
            .clone()
            .separated_by(comma.clone())
            .allow_trailing()
            .collect()
            .delimited_by(bracket_square_open.clone(), bracket_square_close.clone())
            .map(|items| Expression::List { items });

        let nested = expression
            .clone()
            .delimited_by(bracket_round_open.clone(), bracket_round_close.clone());

        let atom = choice((literal, format_text, name, list))
            .map_with(|expression, extra| Spanned {
                node: expression,
                span: extra.span(),
            })
            .or(nested);

        let call = expression
            .clone()
            .separated_by(comma)
            .allow_trailing()
            .collect()
            .delimited_by(bracket_round_open, bracket_round_close)
            .map(Postfix::Call);

        let attribute = just(Token::Dot)
            .ignore_then(select! { Token::Identifier(name) => name }.map_with(|name, extra| {
                Spanned {
                    node: name,
                    span: extra.span(),
                }
            }))
            .map(Postfix::Attribute);

        let index = expression
            .delimited_by(bracket_square_open, bracket_square_close)
            .map(Postfix::Index);

        let postfix = choice((call, attribute, index))
            .map_with(|postfix, extra| (postfix, extra.span()));

        let operand = atom.foldl(
            postfix.repeated(),
            |object: Spanned<Expression<'code>>, (postfix, postfix_span): (Postfix<'code>, Span)| {
                let span = Span::from(object.span.into_range().start..postfix_span.into_range().end);
                let object = Box::new(object);
                let node = match postfix {
                    Postfix::Call(arguments) => Expression::Call {
                        callee: object,
                        arguments,
                    },
                    Postfix::Attribute(name) => Expression::Attribute { object, name },
                    Postfix::Index(index) => Expression::Index {
                        object,
                        index: Box::new(index),
                    },
                };
                Spanned { node, span }
            },
        );

        let comparator = select! {
            Token::Equal => Comparator::Equal,
            Token::NotEqual => Comparator::NotEqual,
            Token::Less => Comparator::Less,
            Token::LessOrEqual => Comparator::LessOrEqual,
            Token::Greater => Comparator::Greater,
            Token::GreaterOrEqual => Comparator::GreaterOrEqual,
            Token::In => Comparator::In,
        };

        let additive = select! {
            Token::Plus => ArithmeticOperator::Add,
            Token::Minus => ArithmeticOperator::Subtract,
        };

        let multiplicative = select! {
            Token::Asterisk => ArithmeticOperator::Multiply,
            Token::Slash => ArithmeticOperator::Divide,
            Token::DoubleSlash => ArithmeticOperator::FloorDivide,
            Token::Percent => ArithmeticOperator::Modulo,
        };

        operand.pratt((
            // Precedence 1 (lowest): or
            infix(left(1), just(Token::Or), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expression::Logical {
                    operator: LogicalOperator::Or,
                    operand_a: Box::new(l),
                    operand_b: Box::new(r),
                },
            }),
            infix(left(2), just(Token::And), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expression::Logical {
                    operator: LogicalOperator::And,
                    operand_a: Box::new(l),
                    operand_b: Box::new(r),
                },
            }),
            // `not a == b` is `not (a == b)`
            prefix(3, just(Token::Not), |_, operand, extra| Spanned {
                span: extra.span(),
                node: Expression::Not {
                    operand: Box::new(operand),
                },
            }),
            infix(left(4), comparator, |l, comparator, r, extra| Spanned {
                span: extra.span(),
                node: Expression::Comparator {
                    comparator,
                    operand_a: Box::new(l),
                    operand_b: Box::new(r),
                },
            }),
            infix(left(5), additive, |l, operator, r, extra| Spanned {
                span: extra.span(),
                node: Expression::ArithmeticOperator {
                    operator,
                    operand_a: Box::new(l),
                    operand_b: Box::new(r),
                },
            }),
            infix(left(6), multiplicative, |l, operator, r, extra| Spanned {
                span: extra.span(),
                node: Expression::ArithmeticOperator {
                    operator,
                    operand_a: Box::new(l),
                    operand_b: Box::new(r),
                },
            }),
            prefix(7, just(Token::Minus), |_, operand, extra| Spanned {
                span: extra.span(),
                node: Expression::Negate {
                    operand: Box::new(operand),
                },
            }),
        ))
    })
}

#[derive(Debug, Clone)]
pub enum Statement<'code> {
    Expression(Spanned<Expression<'code>>),
    Assignment {
        target: Spanned<Expression<'code>>,
        value: Spanned<Expression<'code>>,
    },
    // `target op= value`
    AugmentedAssignment {
        target: Spanned<Expression<'code>>,
        operator: ArithmeticOperator,
        value: Spanned<Expression<'code>>,
    },
    If {
        branches: Vec<Branch<'code>>,
        otherwise: Option<Vec<Spanned<Statement<'code>>>>,
    },
    For {
        variable: Spanned<&'code str>,
        iterable: Spanned<Expression<'code>>,
        body: Vec<Spanned<Statement<'code>>>,
    },
    While {
        condition: Spanned<Expression<'code>>,
        body: Vec<Spanned<Statement<'code>>>,
    },
    Pass,
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub struct Branch<'code> {
    pub condition: Spanned<Expression<'code>>,
    pub body: Vec<Spanned<Statement<'code>>>,
}

#[derive(Debug, Clone)]
pub enum Expression<'code> {
    Literal(Literal<'code>),
    FormatText {
        parts: Vec<FormatPart<'code>>,
    },
    Name(&'code str),
    List {
        items: Vec<Spanned<Self>>,
    },
    Attribute {
        object: Box<Spanned<Self>>,
        name: Spanned<&'code str>,
    },
    Index {
        object: Box<Spanned<Self>>,
        index: Box<Spanned<Self>>,
    },
    Call {
        callee: Box<Spanned<Self>>,
        arguments: Vec<Spanned<Self>>,
    },
    Negate {
        operand: Box<Spanned<Self>>,
    },
    Not {
        operand: Box<Spanned<Self>>,
    },
    ArithmeticOperator {
        operator: ArithmeticOperator,
        operand_a: Box<Spanned<Self>>,
        operand_b: Box<Spanned<Self>>,
    },
    Comparator {
        comparator: Comparator,
        operand_a: Box<Spanned<Self>>,
        operand_b: Box<Spanned<Self>>,
    },
    Logical {
        operator: LogicalOperator,
        operand_a: Box<Spanned<Self>>,
        operand_b: Box<Spanned<Self>>,
    },
}

impl Expression<'_> {
    /// Attribute targets parse fine and fail when run.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Self::Name(_) | Self::Index { .. } | Self::Attribute { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal<'code> {
    Integer(i64),
    Float(f64),
    Text(Cow<'code, str>),
    Bool(bool),
    None,
}

#[derive(Debug, Clone)]
pub enum FormatPart<'code> {
    Text(String),
    Interpolation(Interpolation<'code>),
}

#[derive(Debug, Clone)]
pub struct Interpolation<'code> {
    pub source: &'code str,
    pub offset: usize,
    /// Digits after the point for `{value:.Nf}`.
    pub precision: Option<usize>,
    pub expression: Option<Box<Spanned<Expression<'code>>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
}

impl ArithmeticOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::FloorDivide => "//",
            Self::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    In,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}
