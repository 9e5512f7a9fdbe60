//! Turns physical line breaks into `Newline`, `Indent` and `Dedent` tokens so
//! the parser can treat indented suites like bracketed blocks.

use super::{ParseError, Span, Spanned, Token, lexer::indentation_width};

/// Deepest bracket, block or prefix-operator nesting the parser is asked to handle.
pub const MAX_NESTING: usize = 64;

/// Operators, calls, attribute accesses and subscripts allowed in one statement.
pub const MAX_STATEMENT_OPERATORS: usize = 512;

pub type LayoutError<'code> = ParseError<'code, Token<'code>>;

pub fn resolve_layout<'code>(
    tokens: Vec<Spanned<Token<'code>>>,
    source_code: &str,
) -> Result<Vec<Spanned<Token<'code>>>, Vec<LayoutError<'code>>> {
    let mut tokens = tokens
        .into_iter()
        .filter(|token| !matches!(token.node, Token::Comment(_)))
        .peekable();

    let base_indentation = tokens
        .peek()
        .map(|first| first_line_indentation(source_code, first.span))
        .unwrap_or_default();

    let mut output: Vec<Spanned<Token<'code>>> = Vec::new();
    let mut indentation = vec![base_indentation];
    let mut nesting = NestingGuard::default();
    let mut errors = Vec::new();

    while let Some(token) = tokens.next() {
        if let Err(error) = nesting.observe(&token) {
            errors.push(error);
            break;
        }
        let Token::LineBreak(width) = token.node else {
            output.push(token);
            continue;
        };
        if nesting.bracket_depth > 0 || output.is_empty() {
            continue;
        }
        // Only the last break of a run of blank lines counts.
        match tokens.peek() {
            Some(Spanned {
                node: Token::LineBreak(_),
                ..
            })
            | None => continue,
            Some(_) => {}
        }
        let at = zero_width(token.span, true);
        output.push(Spanned {
            node: Token::Newline,
            span: token.span,
        });
        let current = indentation.last().copied().unwrap_or_default();
        if width > current {
            if indentation.len() > MAX_NESTING {
                errors.push(ParseError::custom(
                    at,
                    format!("blocks nested deeper than {MAX_NESTING} levels"),
                ));
                break;
            }
            indentation.push(width);
            output.push(Spanned {
                node: Token::Indent,
                span: at,
            });
            continue;
        }
        while width < indentation.last().copied().unwrap_or_default() && indentation.len() > 1 {
            indentation.pop();
            output.push(Spanned {
                node: Token::Dedent,
                span: at,
            });
        }
        if indentation.last().copied().unwrap_or_default() != width {
            errors.push(ParseError::custom(
                at,
                "unindent does not match any outer indentation level",
            ));
            break;
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    if let Some(last) = output.last() {
        if last.node != Token::Newline {
            let eoi = Span::from(source_code.len()..source_code.len());
            output.push(Spanned {
                node: Token::Newline,
                span: eoi,
            });
        }
    }
    let end = output
        .last()
        .map(|token| zero_width(token.span, false))
        .unwrap_or_else(|| Span::from(0..0));
    while indentation.len() > 1 {
        indentation.pop();
        output.push(Spanned {
            node: Token::Dedent,
            span: end,
        });
    }
    Ok(output)
}

/// Rejects token streams nested deeper than [`MAX_NESTING`].
pub fn check_nesting<'code>(tokens: &[Spanned<Token<'code>>]) -> Result<(), LayoutError<'code>> {
    let mut nesting = NestingGuard::default();
    tokens.iter().try_for_each(|token| nesting.observe(token))
}

#[derive(Default)]
struct NestingGuard {
    bracket_depth: usize,
    prefix_run: usize,
    operators: usize,
}

impl NestingGuard {
    fn observe<'code>(&mut self, token: &Spanned<Token<'code>>) -> Result<(), LayoutError<'code>> {
        match token.node {
            Token::LineBreak(_) if self.bracket_depth == 0 => {
                self.operators = 0;
                self.prefix_run = 0;
                return Ok(());
            }
            Token::LineBreak(_) | Token::Comment(_) => return Ok(()),
            Token::Semicolon | Token::Colon => {
                self.operators = 0;
                self.prefix_run = 0;
                return Ok(());
            }
            Token::BracketRoundOpen | Token::BracketSquareOpen => {
                self.bracket_depth += 1;
                self.prefix_run = 0;
                if self.bracket_depth > MAX_NESTING {
                    return Err(ParseError::custom(
                        token.span,
                        format!("brackets nested deeper than {MAX_NESTING} levels"),
                    ));
                }
            }
            Token::BracketRoundClose | Token::BracketSquareClose => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                self.prefix_run = 0;
                return Ok(());
            }
            Token::Minus | Token::Not => {
                self.prefix_run += 1;
                if self.prefix_run > MAX_NESTING {
                    return Err(ParseError::custom(
                        token.span,
                        format!("more than {MAX_NESTING} operators in a row"),
                    ));
                }
            }
            Token::Plus
            | Token::Asterisk
            | Token::Slash
            | Token::DoubleSlash
            | Token::Percent
            | Token::Equal
            | Token::NotEqual
            | Token::Less
            | Token::LessOrEqual
            | Token::Greater
            | Token::GreaterOrEqual
            | Token::In
            | Token::And
            | Token::Or
            | Token::Dot => self.prefix_run = 0,
            _ => {
                self.prefix_run = 0;
                return Ok(());
            }
        }
        self.operators += 1;
        if self.operators > MAX_STATEMENT_OPERATORS {
            return Err(ParseError::custom(
                token.span,
                format!("more than {MAX_STATEMENT_OPERATORS} operators in one statement"),
            ));
        }
        Ok(())
    }
}

fn zero_width(span: Span, at_end: bool) -> Span {
    let range = span.into_range();
    let offset = if at_end { range.end } else { range.start };
    Span::from(offset..offset)
}

fn first_line_indentation(source_code: &str, first_token: Span) -> usize {
    let start = first_token.into_range().start.min(source_code.len());
    let line_start = source_code[..start].rfind('\n').map_or(0, |index| index + 1);
    source_code
        .get(line_start..start)
        .map(indentation_width)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer;
    use chumsky::prelude::Parser;

    fn layout(code: &str) -> Result<Vec<Token<'_>>, usize> {
        let tokens = lexer().parse(code).into_output().unwrap();
        resolve_layout(tokens, code)
            .map(|tokens| tokens.into_iter().map(|token| token.node).collect())
            .map_err(|errors| errors.len())
    }

    #[test]
    fn test_single_line_gets_terminated() {
        assert_eq!(
            layout("pass").unwrap(),
            vec![Token::Pass, Token::Newline]
        );
    }

    #[test]
    fn test_indented_suite() {
        assert_eq!(
            layout("while x:\n    pass\n    pass\nbreak\n").unwrap(),
            vec![
                Token::While,
                Token::Identifier("x"),
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Pass,
                Token::Newline,
                Token::Pass,
                Token::Newline,
                Token::Dedent,
                Token::Break,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_are_ignored() {
        assert_eq!(
            layout("\n\npass\n   \n# note\n\npass\n\n").unwrap(),
            vec![Token::Pass, Token::Newline, Token::Pass, Token::Newline]
        );
    }

    #[test]
    fn test_open_suites_close_at_end() {
        assert_eq!(
            layout("if a:\n  if b:\n    pass").unwrap(),
            vec![
                Token::If,
                Token::Identifier("a"),
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::If,
                Token::Identifier("b"),
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Pass,
                Token::Newline,
                Token::Dedent,
                Token::Dedent,
            ]
        );
    }

    #[test]
    fn test_line_breaks_inside_brackets_are_joined() {
        assert_eq!(
            layout("f(1,\n      2)\n").unwrap(),
            vec![
                Token::Identifier("f"),
                Token::BracketRoundOpen,
                Token::Integer(1),
                Token::Comma,
                Token::Integer(2),
                Token::BracketRoundClose,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_indented_first_line_sets_the_base() {
        assert_eq!(
            layout("  a\n  b").unwrap(),
            vec![
                Token::Identifier("a"),
                Token::Newline,
                Token::Identifier("b"),
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_inconsistent_dedent_is_an_error() {
        assert!(layout("if a:\n    pass\n  pass").is_err());
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let code = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(layout(&code).is_err());
        let code = format!("x = {}1", "-".repeat(100));
        assert!(layout(&code).is_err());
    }

    #[test]
    fn test_long_operator_chains_are_an_error() {
        let code = format!("x = 1{}", " + 1".repeat(600));
        assert!(layout(&code).is_err());
        let code = format!("x = 1{}\ny = 1{}", " + 1".repeat(300), " + 1".repeat(300));
        assert!(layout(&code).is_ok());
    }
}
