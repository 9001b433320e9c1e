//! Tokenizer for Mindcode source text.
//!
//! Hand-rolled single-pass lexer. Newlines (and `;`) are significant —
//! they separate statements — so they become tokens instead of being
//! skipped like other whitespace.

use crate::diagnostic::Diagnostic;

/// What a token is, plus its payload where relevant.
///
/// Numbers keep their source spelling so code generation can emit the
/// literal verbatim instead of re-formatting a float.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(String),
    Str(String),

    // Keywords
    If,
    Else,
    While,
    End,
    Print,
    Println,

    // Operators and punctuation
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    Comma,

    /// Statement separator: a literal newline or `;`.
    Newline,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ident(name) => return write!(f, "identifier '{}'", name),
            Self::Number(n) => return write!(f, "number '{}'", n),
            Self::Str(_) => "string literal",
            Self::If => "'if'",
            Self::Else => "'else'",
            Self::While => "'while'",
            Self::End => "'end'",
            Self::Print => "'print'",
            Self::Println => "'println'",
            Self::Assign => "'='",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::Eq => "'=='",
            Self::Ne => "'!='",
            Self::Lt => "'<'",
            Self::Le => "'<='",
            Self::Gt => "'>'",
            Self::Ge => "'>='",
            Self::AndAnd => "'&&'",
            Self::OrOr => "'||'",
            Self::Bang => "'!'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::Comma => "','",
            Self::Newline => "end of line",
            Self::Eof => "end of input",
        };
        write!(f, "{}", s)
    }
}

/// A token with its source position (both 1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Tokenizes the whole source. Lexical problems (stray characters,
/// unterminated strings) are collected as diagnostics; the lexer keeps
/// going so the parser can still report later errors.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while let Some(&c) = self.chars.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    self.push_at(TokenKind::Newline, line, column);
                }
                ';' => {
                    self.bump();
                    self.push_at(TokenKind::Newline, line, column);
                }
                '/' => {
                    self.bump();
                    if self.chars.peek() == Some(&'/') {
                        // Line comment, skip to end of line
                        while let Some(&c) = self.chars.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.bump();
                        }
                    } else {
                        self.push_at(TokenKind::Slash, line, column);
                    }
                }
                '"' => self.string(line, column),
                c if c.is_ascii_digit() => self.number(line, column),
                c if c.is_alphabetic() || c == '_' || c == '@' => self.ident(line, column),
                _ => self.operator(line, column),
            }
        }
        self.push_at(TokenKind::Eof, self.line, self.column);
        (self.tokens, self.diagnostics)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        match c {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(_) => self.column += 1,
            None => {}
        }
        c
    }

    fn push_at(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }

    fn string(&mut self, line: usize, column: usize) {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.chars.peek() {
                Some('"') => {
                    self.bump();
                    self.push_at(TokenKind::Str(text), line, column);
                    return;
                }
                Some('\n') | None => {
                    self.diagnostics
                        .push(Diagnostic::new(line, column, "unterminated string literal"));
                    return;
                }
                Some(&c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    fn number(&mut self, line: usize, column: usize) {
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        self.push_at(TokenKind::Number(text), line, column);
    }

    fn ident(&mut self, line: usize, column: usize) {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '@' || c == '-' && text.starts_with('@') {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = match text.as_str() {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "end" => TokenKind::End,
            "print" => TokenKind::Print,
            "println" => TokenKind::Println,
            _ => TokenKind::Ident(text),
        };
        self.push_at(kind, line, column);
    }

    fn operator(&mut self, line: usize, column: usize) {
        let c = match self.bump() {
            Some(c) => c,
            None => return,
        };
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '%' => TokenKind::Percent,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '=' if self.next_is('=') => TokenKind::Eq,
            '=' => TokenKind::Assign,
            '!' if self.next_is('=') => TokenKind::Ne,
            '!' => TokenKind::Bang,
            '<' if self.next_is('=') => TokenKind::Le,
            '<' => TokenKind::Lt,
            '>' if self.next_is('=') => TokenKind::Ge,
            '>' => TokenKind::Gt,
            '&' if self.next_is('&') => TokenKind::AndAnd,
            '|' if self.next_is('|') => TokenKind::OrOr,
            _ => {
                self.diagnostics.push(Diagnostic::new(
                    line,
                    column,
                    format!("unexpected character '{}'", c),
                ));
                return;
            }
        };
        self.push_at(kind, line, column);
    }

    /// Consumes the next character if it matches.
    fn next_is(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }
}
