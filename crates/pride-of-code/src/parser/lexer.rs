use super::{ParseError, Spanned};
use chumsky::prelude::*;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'code> {
    BracketRoundOpen,
    BracketRoundClose,
    BracketSquareOpen,
    BracketSquareClose,
    Comment(&'code str),
    Integer(i64),
    Float(f64),
    // Raw content between the quotes, escapes still in place.
    Text(&'code str),
    FormatText(&'code str),
    Identifier(&'code str),
    If,
    Elif,
    Else,
    For,
    In,
    While,
    Pass,
    Break,
    Continue,
    And,
    Or,
    Not,
    True,
    False,
    None,
    Colon,
    Semicolon,
    Comma,
    Dot,
    Assign,
    PlusAssign,
    MinusAssign,
    AsteriskAssign,
    SlashAssign,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Plus,
    Minus,
    Asterisk,
    Slash,
    DoubleSlash,
    Percent,
    // Physical line break with the indentation width of the following line.
    // The layout pass replaces these with `Newline`, `Indent` and `Dedent`.
    LineBreak(usize),
    Newline,
    Indent,
    Dedent,
}

impl<'code> Token<'code> {
    pub fn into_cow_str(self) -> Cow<'code, str> {
        match self {
            Self::BracketRoundOpen => "(".into(),
            Self::BracketRoundClose => ")".into(),
            Self::BracketSquareOpen => "[".into(),
            Self::BracketSquareClose => "]".into(),
            Self::Comment(comment) => comment.into(),
            Self::Integer(integer) => integer.to_string().into(),
            Self::Float(float) => float.to_string().into(),
            Self::Text(text) => format!("'{text}'").into(),
            Self::FormatText(text) => format!("f'{text}'").into(),
            Self::Identifier(identifier) => identifier.into(),
            Self::If => "if".into(),
            Self::Elif => "elif".into(),
            Self::Else => "else".into(),
            Self::For => "for".into(),
            Self::In => "in".into(),
            Self::While => "while".into(),
            Self::Pass => "pass".into(),
            Self::Break => "break".into(),
            Self::Continue => "continue".into(),
            Self::And => "and".into(),
            Self::Or => "or".into(),
            Self::Not => "not".into(),
            Self::True => "True".into(),
            Self::False => "False".into(),
            Self::None => "None".into(),
            Self::Colon => ":".into(),
            Self::Semicolon => ";".into(),
            Self::Comma => ",".into(),
            Self::Dot => ".".into(),
            Self::Assign => "=".into(),
            Self::PlusAssign => "+=".into(),
            Self::MinusAssign => "-=".into(),
            Self::AsteriskAssign => "*=".into(),
            Self::SlashAssign => "/=".into(),
            Self::Equal => "==".into(),
            Self::NotEqual => "!=".into(),
            Self::Less => "<".into(),
            Self::LessOrEqual => "<=".into(),
            Self::Greater => ">".into(),
            Self::GreaterOrEqual => ">=".into(),
            Self::Plus => "+".into(),
            Self::Minus => "-".into(),
            Self::Asterisk => "*".into(),
            Self::Slash => "/".into(),
            Self::DoubleSlash => "//".into(),
            Self::Percent => "%".into(),
            Self::LineBreak(_) | Self::Newline => "end of line".into(),
            Self::Indent => "indent".into(),
            Self::Dedent => "dedent".into(),
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.into_cow_str())
    }
}

/// Quoted text without its quotes. A backslash escapes the next character.
fn quoted<'code>(
    quote: char,
) -> impl Parser<'code, &'code str, &'code str, extra::Err<ParseError<'code, char>>> + Clone {
    just(quote)
        .ignore_then(
            choice((
                just('\\').then(any()).ignored(),
                none_of([quote, '\\', '\n', '\r']).ignored(),
            ))
            .repeated()
            .to_slice(),
        )
        .then_ignore(just(quote))
}

pub fn lexer<'code>()
-> impl Parser<'code, &'code str, Vec<Spanned<Token<'code>>>, extra::Err<ParseError<'code, char>>> {
    let bracket = choice((
        just('(').to(Token::BracketRoundOpen),
        just(')').to(Token::BracketRoundClose),
        just('[').to(Token::BracketSquareOpen),
        just(']').to(Token::BracketSquareClose),
    ));

    let comparator = choice((
        just("==").to(Token::Equal),
        just("!=").to(Token::NotEqual),
        just("<=").to(Token::LessOrEqual),
        just('<').to(Token::Less),
        just(">=").to(Token::GreaterOrEqual),
        just('>').to(Token::Greater),
    ));

    let assignment = choice((
        just("+=").to(Token::PlusAssign),
        just("-=").to(Token::MinusAssign),
        just("*=").to(Token::AsteriskAssign),
        just("/=").to(Token::SlashAssign),
        just('=').to(Token::Assign),
    ));

    let arithmetic_operator = choice((
        just("//").to(Token::DoubleSlash),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Asterisk),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
    ));

    let comment = just('#')
        .then(none_of("\r\n").repeated())
        .to_slice()
        .map(Token::Comment);

    let float = text::int(10)
        .then(just('.'))
        .then(text::digits(10))
        .to_slice()
        .from_str()
        .unwrapped()
        .map(Token::Float);

    let integer = text::int(10).try_map(|digits: &str, span| {
        digits.parse::<i64>().map(Token::Integer).map_err(|_| {
            ParseError::custom(span, format!("integer literal '{digits}' is too large"))
        })
    });

    let text = choice((quoted('\''), quoted('"'))).map(Token::Text);

    let format_text = just('f')
        .ignore_then(choice((quoted('\''), quoted('"'))))
        .map(Token::FormatText);

    let identifier_or_keyword = any()
        .filter(|character: &char| *character == '_' || character.is_ascii_alphabetic())
        .then(
            any()
                .filter(|character: &char| *character == '_' || character.is_ascii_alphanumeric())
                .repeated(),
        )
        .to_slice()
        .map(|identifier: &str| match identifier {
            "if" => Token::If,
            "elif" => Token::Elif,
            "else" => Token::Else,
            "for" => Token::For,
            "in" => Token::In,
            "while" => Token::While,
            "pass" => Token::Pass,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "True" => Token::True,
            "False" => Token::False,
            "None" => Token::None,
            _ => Token::Identifier(identifier),
        });

    // The indentation belongs to the line break so padding can't swallow it.
    let line_break = text::newline()
        .ignore_then(one_of(" \t").repeated().to_slice())
        .map(|indentation: &str| Token::LineBreak(indentation_width(indentation)));

    let token = choice((
        line_break,
        bracket,
        comment,
        float,
        integer,
        comparator,
        assignment,
        arithmetic_operator,
        just(':').to(Token::Colon),
        just(';').to(Token::Semicolon),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
        text,
        format_text,
        identifier_or_keyword,
    ));

    token
        .map_with(|token, extra| Spanned {
            node: token,
            span: extra.span(),
        })
        .padded_by(text::inline_whitespace())
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect()
}

/// Resolves backslash escapes in quoted text. Unknown escapes are kept as written.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }
    let mut text = String::with_capacity(raw.len());
    let mut characters = raw.chars();
    while let Some(character) = characters.next() {
        if character != '\\' {
            text.push(character);
            continue;
        }
        match characters.next() {
            Some(escaped) => push_escaped(&mut text, escaped),
            None => text.push('\\'),
        }
    }
    Cow::Owned(text)
}

pub(super) fn push_escaped(text: &mut String, escaped: char) {
    match escaped {
        'n' => text.push('\n'),
        't' => text.push('\t'),
        'r' => text.push('\r'),
        '0' => text.push('\0'),
        '\\' | '\'' | '"' => text.push(escaped),
        other => {
            text.push('\\');
            text.push(other);
        }
    }
}

/// Tabs count as four columns.
pub fn indentation_width(indentation: &str) -> usize {
    indentation
        .chars()
        .map(|character| if character == '\t' { 4 } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chumsky::prelude::Parser;

    fn tokens(code: &str) -> Vec<Token<'_>> {
        let result = lexer().parse(code);
        result
            .output()
            .unwrap()
            .iter()
            .map(|token| token.node)
            .collect()
    }

    #[test]
    fn test_assignment_and_call() {
        assert_eq!(
            tokens("member = members[0]; band.move_to(member, 50, 26)"),
            vec![
                Token::Identifier("member"),
                Token::Assign,
                Token::Identifier("members"),
                Token::BracketSquareOpen,
                Token::Integer(0),
                Token::BracketSquareClose,
                Token::Semicolon,
                Token::Identifier("band"),
                Token::Dot,
                Token::Identifier("move_to"),
                Token::BracketRoundOpen,
                Token::Identifier("member"),
                Token::Comma,
                Token::Integer(50),
                Token::Comma,
                Token::Integer(26),
                Token::BracketRoundClose,
            ]
        );
    }

    #[test]
    fn test_line_break_carries_indentation() {
        assert_eq!(
            tokens("for m in brass:\n    pass\n\tpass"),
            vec![
                Token::For,
                Token::Identifier("m"),
                Token::In,
                Token::Identifier("brass"),
                Token::Colon,
                Token::LineBreak(4),
                Token::Pass,
                Token::LineBreak(4),
                Token::Pass,
            ]
        );
    }

    #[test]
    fn test_operators_prefer_longest_match() {
        assert_eq!(
            tokens("a //= b"),
            vec![
                Token::Identifier("a"),
                Token::DoubleSlash,
                Token::Assign,
                Token::Identifier("b"),
            ]
        );
        assert_eq!(
            tokens("x <= 1 == y != z"),
            vec![
                Token::Identifier("x"),
                Token::LessOrEqual,
                Token::Integer(1),
                Token::Equal,
                Token::Identifier("y"),
                Token::NotEqual,
                Token::Identifier("z"),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("12 3.5"), vec![Token::Integer(12), Token::Float(3.5)]);
        assert_eq!(tokens("x-1"), vec![Token::Identifier("x"), Token::Minus, Token::Integer(1)]);
    }

    #[test]
    fn test_texts_keep_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "two" f'{x}!'"#),
            vec![
                Token::Text(r"it\'s"),
                Token::Text("two"),
                Token::FormatText("{x}!"),
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            tokens("if not True and format"),
            vec![
                Token::If,
                Token::Not,
                Token::True,
                Token::And,
                Token::Identifier("format"),
            ]
        );
    }

    #[test]
    fn test_comment_runs_to_end_of_line() {
        assert_eq!(
            tokens("x # move x\ny"),
            vec![
                Token::Identifier("x"),
                Token::Comment("# move x"),
                Token::LineBreak(0),
                Token::Identifier("y"),
            ]
        );
    }

    #[test]
    fn test_unescape() {
        assert!(matches!(unescape("plain"), Cow::Borrowed("plain")));
        assert_eq!(unescape(r"a\nb\tc"), "a\nb\tc");
        assert_eq!(unescape(r"it\'s \\ \q"), r"it's \ \q");
    }

    #[test]
    fn test_unterminated_text_is_an_error() {
        let result = lexer().parse("x = 'open");
        assert!(result.has_errors());
    }

    #[test]
    fn test_huge_integer_is_an_error() {
        let result = lexer().parse("99999999999999999999999");
        assert!(result.has_errors());
    }
}
