use std::io::{self, Read};

use tracing::{debug, trace};

use crate::ast::{Delimiter, Fragment, FragmentKind, Token, TokenKind, render};
use crate::error::{ExpandError, Result};
use crate::parser::{ShorthandParser, TokenStream};

/// Nesting limit used by [`Expander::new`]
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// How long one expansion call keeps consuming tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Until the expected closer, or end of input at the top level
    Group,
    /// Until one fragment has been produced, or the closer is reached
    Single,
}

/// Position of one expansion call in the nesting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub depth: usize,
    /// `None` at the top level
    pub closer: Option<Delimiter>,
    /// Where the enclosing structure was opened
    pub line: usize,
    pub column: usize,
}

impl Context {
    pub fn top() -> Self {
        Self {
            depth: 0,
            closer: None,
            line: 0,
            column: 0,
        }
    }

    fn enter(&self, opener: &Token, closer: Delimiter) -> Self {
        Self {
            depth: self.depth + 1,
            closer: Some(closer),
            line: opener.line,
            column: opener.column,
        }
    }

    fn accepts(&self, delim: Delimiter) -> bool {
        self.depth > 0 && self.closer == Some(delim)
    }
}

/// Fragments produced by one call, plus the whitespace before its closer
#[derive(Debug, Default)]
struct Expansion {
    fragments: Vec<Fragment>,
    closing: Option<String>,
}

/// Recursive expander from shorthand tokens to Ruby text
#[derive(Debug, Clone)]
pub struct Expander {
    max_depth: usize,
}

impl Default for Expander {
    fn default() -> Self {
        Self::new()
    }
}

impl Expander {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expand shorthand source text (main entry point)
    pub fn expand(&self, input: &str) -> Result<String> {
        let mut stream = ShorthandParser::tokenize(input)?;
        self.expand_tokens(&mut stream)
    }

    /// Expand a whole token stream into one string
    pub fn expand_tokens(&self, stream: &mut TokenStream) -> Result<String> {
        let expansion = self.expand_in(stream, &Context::top(), Mode::Group)?;
        let mut output = render(&expansion.fragments);
        output.push_str(stream.trailing());
        debug!(bytes = output.len(), "expanded input");
        Ok(output)
    }

    /// Core recursive step. Nested calls share `stream`, so every token is
    /// consumed exactly once.
    fn expand_in(&self, stream: &mut TokenStream, ctx: &Context, mode: Mode) -> Result<Expansion> {
        let mut fragments = Vec::new();

        while let Some(token) = stream.next() {
            match token.kind {
                TokenKind::Close(delim) => {
                    if !ctx.accepts(delim) {
                        return Err(ExpandError::UnexpectedCloser {
                            token: token.text.to_string(),
                            line: token.line,
                            column: token.column,
                        });
                    }
                    return Ok(Expansion {
                        fragments,
                        closing: Some(token.space.into_owned()),
                    });
                }
                TokenKind::Open(delim) => {
                    let inner = self.descend(ctx, &token, delim)?;
                    let group = self.expand_in(stream, &inner, Mode::Group)?;
                    let text = match delim {
                        Delimiter::Paren => paren_group(group),
                        Delimiter::Brace => block_group(group),
                        Delimiter::Bracket => index_group(group),
                    };
                    fragments.push(Fragment::new(FragmentKind::Text, token.space, text));
                }
                TokenKind::ArrayOpen => {
                    let inner = self.descend(ctx, &token, Delimiter::Bracket)?;
                    let elements = self.collect_elements(stream, &inner)?;
                    trace!(elements = elements.len(), "array literal");
                    let text = format!("[{}]", elements.join(", "));
                    fragments.push(Fragment::new(FragmentKind::Text, token.space, text));
                }
                TokenKind::MapOpen => {
                    let inner = self.descend(ctx, &token, Delimiter::Brace)?;
                    let elements = self.collect_elements(stream, &inner)?;
                    trace!(elements = elements.len(), "map literal");
                    let text = format!("[{}].to_h", elements.join(", "));
                    fragments.push(Fragment::new(FragmentKind::Text, token.space, text));
                }
                TokenKind::Increment | TokenKind::Decrement => {
                    apply_postfix(&mut fragments, &token);
                }
                _ => fragments.push(Fragment::from_token(&token)),
            }

            if mode == Mode::Single && !fragments.is_empty() {
                fold_postfix(stream, &mut fragments);
                return Ok(Expansion {
                    fragments,
                    closing: None,
                });
            }
        }

        if let Some(closer) = ctx.closer {
            return Err(ExpandError::Unterminated {
                expected: closer.close(),
                line: ctx.line,
                column: ctx.column,
            });
        }
        Ok(Expansion {
            fragments,
            closing: None,
        })
    }

    fn descend(&self, ctx: &Context, opener: &Token, closer: Delimiter) -> Result<Context> {
        let inner = ctx.enter(opener, closer);
        if inner.depth > self.max_depth {
            return Err(ExpandError::NestingTooDeep {
                limit: self.max_depth,
                line: opener.line,
                column: opener.column,
            });
        }
        Ok(inner)
    }

    /// Read the body of a collection literal one element at a time.
    ///
    /// Whitespace and commas separate elements; a fragment with no leading
    /// whitespace belongs to the element before it.
    fn collect_elements(&self, stream: &mut TokenStream, ctx: &Context) -> Result<Vec<String>> {
        let mut elements: Vec<String> = Vec::new();
        let mut glue = false;

        loop {
            let step = self.expand_in(stream, ctx, Mode::Single)?;
            for fragment in step.fragments {
                if fragment.kind == FragmentKind::Atom && fragment.text == "," {
                    glue = false;
                    continue;
                }
                let joins = glue && fragment.space.is_empty();
                glue = true;
                if joins {
                    if let Some(last) = elements.last_mut() {
                        last.push_str(&fragment.text);
                        continue;
                    }
                }
                elements.push(fragment.text);
            }
            if step.closing.is_some() {
                break;
            }
        }

        Ok(elements
            .into_iter()
            .map(|element| element.trim().to_string())
            .filter(|element| !element.is_empty())
            .collect())
    }
}

fn postfix_suffix(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Increment => Some(".succ"),
        TokenKind::Decrement => Some(".pred"),
        _ => None,
    }
}

/// `x++` becomes `x.succ`, `x--` becomes `x.pred`
fn apply_postfix(fragments: &mut Vec<Fragment>, token: &Token) {
    let Some(suffix) = postfix_suffix(token.kind) else {
        return;
    };
    match fragments.last_mut() {
        Some(last) => {
            last.text.push_str(suffix);
            last.kind = FragmentKind::Text;
        }
        None => fragments.push(Fragment::new(
            FragmentKind::Text,
            token.space.as_ref(),
            suffix,
        )),
    }
}

/// Pull any `++`/`--` directly after a single-mode fragment into it
fn fold_postfix(stream: &mut TokenStream, fragments: &mut Vec<Fragment>) {
    while stream
        .peek()
        .is_some_and(|token| postfix_suffix(token.kind).is_some())
    {
        if let Some(token) = stream.next() {
            apply_postfix(fragments, &token);
        }
    }
}

fn arrow_split(fragments: &[Fragment]) -> Option<(String, String)> {
    let at = fragments.iter().position(Fragment::is_arrow)?;
    let params = render(&fragments[..at]).trim().to_string();
    let body = render(&fragments[at + 1..]).trim().to_string();
    Some((params, body))
}

/// `( ... )`: chain lambda, symbol lambda, arrow lambda or plain grouping
fn paren_group(group: Expansion) -> String {
    let fragments = group.fragments;

    if fragments.first().is_some_and(|f| f.text.starts_with('.')) {
        trace!("chain lambda");
        return format!("{{|it|it{}}}", render(&fragments).trim());
    }
    if let [only] = fragments.as_slice() {
        if let Some(name) = only.text.strip_prefix("&:") {
            trace!(name, "symbol lambda");
            return format!("{{|it|it.{name}}}");
        }
    }
    if let Some((params, body)) = arrow_split(&fragments) {
        trace!("arrow lambda");
        return format!("{{|{params}|{body}}}");
    }
    format!(
        "({}{})",
        render(&fragments),
        group.closing.unwrap_or_default()
    )
}

/// `{ ... }`: method-or-function dispatch, arrow block or implicit `it` block
fn block_group(group: Expansion) -> String {
    let fragments = group.fragments;

    if let [only] = fragments.as_slice() {
        if only.kind == FragmentKind::Atom {
            let sym = &only.text;
            trace!(sym = sym.as_str(), "dispatch block");
            return format!(
                "{{|it|it.respond_to?(:\"{sym}\") ? it.send(:\"{sym}\") : {sym}(it)}}"
            );
        }
    }
    if let Some((params, body)) = arrow_split(&fragments) {
        trace!("arrow block");
        let params = if params.is_empty() {
            params
        } else {
            format!(", {params}")
        };
        return format!("{{|it{params}|{body}}}");
    }
    format!("{{|it|{}}}", render(&fragments).trim())
}

/// `[ ... ]` is reassembled unchanged
fn index_group(group: Expansion) -> String {
    format!(
        "[{}{}]",
        render(&group.fragments),
        group.closing.unwrap_or_default()
    )
}

/// A reader wrapper that expands shorthand on the fly
pub struct ExpandingReader<R: Read> {
    inner: R,
    expander: Expander,
    buffer: Vec<u8>,
    buffer_pos: usize,
    done: bool,
}

impl<R: Read> ExpandingReader<R> {
    pub fn new(inner: R, expander: Expander) -> Self {
        Self {
            inner,
            expander,
            buffer: Vec::new(),
            buffer_pos: 0,
            done: false,
        }
    }

    fn fill_buffer(&mut self) -> io::Result<()> {
        if self.done {
            return Ok(());
        }

        // Brackets can close anywhere, so the whole input is needed up front
        let mut input = String::new();
        self.inner.read_to_string(&mut input)?;

        let expanded = self
            .expander
            .expand(&input)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.buffer = expanded.into_bytes();
        self.buffer_pos = 0;
        self.done = true;
        Ok(())
    }
}

impl<R: Read> Read for ExpandingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.buffer_pos >= self.buffer.len() && !self.done {
            self.fill_buffer()?;
        }

        if self.buffer_pos >= self.buffer.len() {
            return Ok(0);
        }

        let available = self.buffer.len() - self.buffer_pos;
        let to_copy = std::cmp::min(available, buf.len());
        buf[..to_copy].copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + to_copy]);
        self.buffer_pos += to_copy;

        Ok(to_copy)
    }
}
