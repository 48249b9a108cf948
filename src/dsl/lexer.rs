//! Lexer (tokenizer) for topology files.

use crate::error::{PoeError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in a topology file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A node type, node name or parameter key
    Identifier,
    /// A number, possibly with a magnitude suffix
    Number,
    /// A directive (starts with '.')
    Directive,
    /// Equals sign '='
    Equals,
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing topology descriptions.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;
        let token = |kind, text: String| Token {
            kind,
            text,
            line,
            column,
        };

        let Some(&ch) = self.chars.peek() else {
            return Ok(token(TokenKind::Eof, String::new()));
        };

        match ch {
            '\n' => {
                self.advance();
                Ok(token(TokenKind::Newline, "\n".to_string()))
            }
            '=' => {
                self.advance();
                Ok(token(TokenKind::Equals, "=".to_string()))
            }
            '.' => {
                self.advance();
                match self.chars.peek() {
                    Some(c) if c.is_ascii_digit() => {
                        let rest = self.read_word();
                        Ok(token(TokenKind::Number, format!(".{}", rest)))
                    }
                    _ => {
                        let name = self.read_word();
                        if name.is_empty() {
                            return Err(PoeError::lexer(line, column, "empty directive"));
                        }
                        Ok(token(TokenKind::Directive, format!(".{}", name)))
                    }
                }
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let text = self.read_word();
                if parse_value(&text).is_none() {
                    return Err(PoeError::lexer(line, column, format!("invalid number '{}'", text)));
                }
                Ok(token(TokenKind::Number, text))
            }
            c if c.is_alphabetic() || c == '_' => Ok(token(TokenKind::Identifier, self.read_word())),
            other => Err(PoeError::lexer(
                line,
                column,
                format!("unexpected character '{}'", other),
            )),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            match ch {
                '\n' => break,
                c if c.is_whitespace() => {
                    self.advance();
                }
                '#' | ';' => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Read a run of name/number characters.
    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '.') {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }
}

/// Parse a number with an optional magnitude suffix.
///
/// Supported suffixes: `u` (1e-6), `m` (1e-3), `k` (1e3), `M` (1e6).
pub fn parse_value(text: &str) -> Option<f64> {
    let (digits, scale) = match text.chars().last()? {
        'u' => (&text[..text.len() - 1], 1e-6),
        'm' => (&text[..text.len() - 1], 1e-3),
        'k' | 'K' => (&text[..text.len() - 1], 1e3),
        'M' => (&text[..text.len() - 1], 1e6),
        _ => (text, 1.0),
    };
    let value = digits.parse::<f64>().ok()? * scale;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            out.push(tok.kind);
            if tok.kind == TokenKind::Eof {
                return out;
            }
        }
    }

    #[test]
    fn test_parse_value() {
        assert_relative_eq!(parse_value("300").unwrap(), 300.0);
        assert_relative_eq!(parse_value("1.2k").unwrap(), 1200.0);
        assert_relative_eq!(parse_value("500m").unwrap(), 0.5);
        assert_relative_eq!(parse_value("-4").unwrap(), -4.0);
        assert_relative_eq!(parse_value("1e-6").unwrap(), 1e-6);
        assert_relative_eq!(parse_value(".5").unwrap(), 0.5);
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value("1e308k"), None);
        assert_eq!(parse_value("-1e303M"), None);
        assert_relative_eq!(parse_value("1e300k").unwrap(), 1e303);
    }

    #[test]
    fn test_overflowing_suffix_is_a_lexer_error() {
        let err = crate::dsl::parse("ps UPS maxw=1e308k\n").unwrap_err();
        assert!(matches!(err, PoeError::LexerError { line: 1, .. }), "{:?}", err);
    }

    #[test]
    fn test_lexer_node_line() {
        let mut lexer = Lexer::new("ns NS-1 UPS len=1.2k");
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Identifier);
        assert_eq!(tok.text, "ns");
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.text, "NS-1");
        assert_eq!(tok.column, 4);

        assert_eq!(
            kinds("ns a b len=3"),
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_directive_and_comments() {
        assert_eq!(
            kinds("# header\n.config damping 0.2 ; trailing\n"),
            vec![
                TokenKind::Newline,
                TokenKind::Directive,
                TokenKind::Identifier,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_reports_position() {
        let mut lexer = Lexer::new("ps UPS\nns a UPS len=12x");
        let err = loop {
            match lexer.next_token() {
                Ok(tok) if tok.kind == TokenKind::Eof => panic!("expected an error"),
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        assert!(matches!(err, PoeError::LexerError { line: 2, column: 14, .. }));
    }
}
