use std::borrow::Cow;

use pest::{Parser, iterators::Pair};
use pest_derive::Parser;
use tracing::debug;

use crate::ast::{Delimiter, Token, TokenKind};
use crate::error::{ExpandError, Result};

#[derive(Parser)]
#[grammar = "src/shorthand.pest"]
pub struct ShorthandParser;

impl ShorthandParser {
    /// Lex shorthand source into a token stream
    pub fn tokenize(input: &str) -> Result<TokenStream<'_>> {
        let file = ShorthandParser::parse(Rule::file, input)?
            .next()
            .ok_or_else(|| ExpandError::Grammar("parser returned no file rule".to_string()))?;

        let mut tokens = Vec::new();
        let mut last_end = 0;
        for pair in file.into_inner() {
            if pair.as_rule() == Rule::EOI {
                break;
            }
            let span = pair.as_span();
            let (line, column) = span.start_pos().line_col();
            let kind = Self::classify(&pair).ok_or(ExpandError::StrayQuote { line, column })?;

            tokens.push(Token {
                kind,
                text: span.as_str(),
                space: strip_comments(&input[last_end..span.start()]),
                line,
                column,
            });
            last_end = span.end();
        }

        debug!(tokens = tokens.len(), "tokenized input");
        Ok(TokenStream::new(tokens).with_trailing(strip_comments(&input[last_end..])))
    }

    /// Map a grammar rule onto a token kind. `None` for a stray quote.
    fn classify(pair: &Pair<Rule>) -> Option<TokenKind> {
        let kind = match pair.as_rule() {
            Rule::arrow => TokenKind::Arrow,
            Rule::map_open => TokenKind::MapOpen,
            Rule::array_open => TokenKind::ArrayOpen,
            Rule::open | Rule::close => {
                let c = pair.as_str().chars().next()?;
                let delim = Delimiter::from_char(c)?;
                if pair.as_rule() == Rule::open {
                    TokenKind::Open(delim)
                } else {
                    TokenKind::Close(delim)
                }
            }
            Rule::increment => TokenKind::Increment,
            Rule::decrement => TokenKind::Decrement,
            Rule::string => TokenKind::Str,
            Rule::lambda_symbol | Rule::comma | Rule::atom => TokenKind::Atom,
            Rule::stray_quote => return None,
            _ => TokenKind::Operator,
        };
        Some(kind)
    }
}

/// Whitespace between two tokens, minus any `#` comments it spans
fn strip_comments(gap: &str) -> Cow<'_, str> {
    if !gap.contains('#') {
        return Cow::Borrowed(gap);
    }
    let mut out = String::with_capacity(gap.len());
    let mut in_comment = false;
    for c in gap.chars() {
        match c {
            '#' => in_comment = true,
            '\n' | '\r' => {
                in_comment = false;
                out.push(c);
            }
            _ if in_comment => {}
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Cursor over lexed tokens, shared by every level of a recursive expansion
#[derive(Debug, Clone, Default)]
pub struct TokenStream<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    trailing: Cow<'a, str>,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            pos: 0,
            trailing: Cow::Borrowed(""),
        }
    }

    pub fn with_trailing(mut self, trailing: Cow<'a, str>) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    /// Whitespace after the last token
    pub fn trailing(&self) -> &str {
        &self.trailing
    }

    pub fn tokens(&self) -> &[Token<'a>] {
        &self.tokens
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }
}

impl<'a> Iterator for TokenStream<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lex(input: &str) -> Vec<(TokenKind, &str)> {
        ShorthandParser::tokenize(input)
            .unwrap()
            .tokens()
            .iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_tokenize_drops_whitespace_and_comments() {
        let tokens = lex("  foo   # a comment (with brackets\n bar  ");
        assert_eq!(
            tokens,
            vec![(TokenKind::Atom, "foo"), (TokenKind::Atom, "bar")]
        );
    }

    #[test]
    fn test_tokenize_records_trivia() {
        let stream = ShorthandParser::tokenize("a  # note\n  b\n").unwrap();
        let tokens = stream.tokens();
        assert_eq!(tokens[0].space, "");
        assert_eq!(tokens[1].space, "  \n  ");
        assert_eq!(stream.trailing(), "\n");
    }

    #[test]
    fn test_tokenize_positions() {
        let stream = ShorthandParser::tokenize("a\n  (b)").unwrap();
        let open = &stream.tokens()[1];
        assert_eq!(open.kind, TokenKind::Open(Delimiter::Paren));
        assert_eq!((open.line, open.column), (2, 3));
    }

    #[rstest]
    #[case("->", TokenKind::Arrow)]
    #[case("\\h{", TokenKind::MapOpen)]
    #[case("\\a[", TokenKind::ArrayOpen)]
    #[case("(", TokenKind::Open(Delimiter::Paren))]
    #[case("]", TokenKind::Close(Delimiter::Bracket))]
    #[case("}", TokenKind::Close(Delimiter::Brace))]
    #[case("**", TokenKind::Operator)]
    #[case("<=>", TokenKind::Operator)]
    #[case("<<", TokenKind::Operator)]
    #[case(">=", TokenKind::Operator)]
    #[case("!~", TokenKind::Operator)]
    #[case("==", TokenKind::Operator)]
    #[case("=~", TokenKind::Operator)]
    #[case("++", TokenKind::Increment)]
    #[case("--", TokenKind::Decrement)]
    #[case("+=", TokenKind::Operator)]
    #[case("|", TokenKind::Operator)]
    #[case("\"a \\\"quoted\\\" word\"", TokenKind::Str)]
    #[case("&:upcase", TokenKind::Atom)]
    #[case(",", TokenKind::Atom)]
    #[case("foo.bar?", TokenKind::Atom)]
    #[case("save!", TokenKind::Atom)]
    #[case("3.14", TokenKind::Atom)]
    #[case(":", TokenKind::Operator)]
    #[case("@", TokenKind::Operator)]
    fn test_classify_single_token(#[case] input: &str, #[case] kind: TokenKind) {
        assert_eq!(lex(input), vec![(kind, input)]);
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            lex("a<=>b"),
            vec![
                (TokenKind::Atom, "a"),
                (TokenKind::Operator, "<=>"),
                (TokenKind::Atom, "b"),
            ]
        );
        assert_eq!(
            lex("x->y"),
            vec![
                (TokenKind::Atom, "x"),
                (TokenKind::Arrow, "->"),
                (TokenKind::Atom, "y"),
            ]
        );
    }

    #[test]
    fn test_comma_splits_atoms() {
        assert_eq!(
            lex("a,b"),
            vec![
                (TokenKind::Atom, "a"),
                (TokenKind::Atom, ","),
                (TokenKind::Atom, "b"),
            ]
        );
    }

    #[test]
    fn test_comment_marker_inside_string_is_kept() {
        assert_eq!(lex("\"#{x}\""), vec![(TokenKind::Str, "\"#{x}\"")]);
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let err = ShorthandParser::tokenize("puts \"oops").unwrap_err();
        assert_eq!(err, ExpandError::StrayQuote { line: 1, column: 6 });
    }

    #[test]
    fn test_stream_cursor() {
        let mut stream = ShorthandParser::tokenize("a b").unwrap();
        assert_eq!(stream.remaining(), 2);
        assert_eq!(stream.peek().map(|t| t.text), Some("a"));
        assert_eq!(stream.next().map(|t| t.text), Some("a"));
        assert_eq!(stream.next().map(|t| t.text), Some("b"));
        assert!(stream.next().is_none());
        assert!(stream.peek().is_none());
    }
}
