use std::borrow::Cow;

/// Plain bracket pairs recognised by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `( ... )`
    Paren,
    /// `[ ... ]`
    Bracket,
    /// `{ ... }`
    Brace,
}

impl Delimiter {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '(' | ')' => Some(Delimiter::Paren),
            '[' | ']' => Some(Delimiter::Bracket),
            '{' | '}' => Some(Delimiter::Brace),
            _ => None,
        }
    }

    pub fn open(self) -> char {
        match self {
            Delimiter::Paren => '(',
            Delimiter::Bracket => '[',
            Delimiter::Brace => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Delimiter::Paren => ')',
            Delimiter::Bracket => ']',
            Delimiter::Brace => '}',
        }
    }
}

/// Classification of a lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `(`, `[` or `{`
    Open(Delimiter),
    /// `)`, `]` or `}`
    Close(Delimiter),
    /// `\h{`, closed by `}`
    MapOpen,
    /// `\a[`, closed by `]`
    ArrayOpen,
    /// `->`
    Arrow,
    /// Double-quoted string, quotes included
    Str,
    /// `++`
    Increment,
    /// `--`
    Decrement,
    /// Operators and any other punctuation passed through as-is
    Operator,
    /// Identifiers, numbers, `.chain` fragments, `&:name` and commas
    Atom,
}

/// A classified slice of the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Whitespace preceding the token, with comments removed
    pub space: Cow<'a, str>,
    pub line: usize,
    pub column: usize,
}

/// What a fragment was produced from, as far as sugar rules care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Verbatim generic atom
    Atom,
    /// Verbatim `->` marker
    Arrow,
    /// Anything else: strings, operators, expanded groups
    Text,
}

/// A piece of expanded output
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub space: String,
    pub text: String,
}

impl Fragment {
    pub fn new(kind: FragmentKind, space: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            space: space.into(),
            text: text.into(),
        }
    }

    pub fn from_token(token: &Token) -> Self {
        let kind = match token.kind {
            TokenKind::Atom => FragmentKind::Atom,
            TokenKind::Arrow => FragmentKind::Arrow,
            _ => FragmentKind::Text,
        };
        Self::new(kind, token.space.as_ref(), token.text)
    }

    pub fn is_arrow(&self) -> bool {
        self.kind == FragmentKind::Arrow
    }
}

/// Join fragments back into text, keeping their leading whitespace
pub fn render(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        out.push_str(&fragment.space);
        out.push_str(&fragment.text);
    }
    out
}
