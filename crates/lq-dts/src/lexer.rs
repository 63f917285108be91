//! Comment stripping, brace checking and tokenization.
//!
//! Comments are blanked out rather than removed so that every byte offset in
//! the stripped text is also a valid offset in the original source.
//
//  Lexical items:
//
//      Word      ::= [A-Za-z0-9_,.+#@?-]+     (names, labels, integers)
//      String    ::= '"' ( '\' any | [^"\n] )* '"'
//      Directive ::= '/' [a-z-]+ '/'          (/dts-v1/, /include/, ...)
//      Symbols   ::= { } < > [ ] ; = : , & /

use crate::error::{ParseError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word(String),
    Str(String),
    Directive(String),
    LBrace,
    RBrace,
    LAngle,
    RAngle,
    LBracket,
    RBracket,
    Semi,
    Eq,
    Colon,
    Comma,
    Amp,
    Slash,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Word(w) => format!("'{w}'"),
            TokenKind::Str(s) => format!("string \"{s}\""),
            TokenKind::Directive(d) => format!("directive /{d}/"),
            TokenKind::LBrace => "'{'".into(),
            TokenKind::RBrace => "'}'".into(),
            TokenKind::LAngle => "'<'".into(),
            TokenKind::RAngle => "'>'".into(),
            TokenKind::LBracket => "'['".into(),
            TokenKind::RBracket => "']'".into(),
            TokenKind::Semi => "';'".into(),
            TokenKind::Eq => "'='".into(),
            TokenKind::Colon => "':'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::Amp => "'&'".into(),
            TokenKind::Slash => "'/'".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
}

/// Blank out `//` and `/* */` comments, preserving offsets and newlines.
pub fn strip_comments(src: &str) -> Result<String> {
    let bytes = src.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i)?;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                let mut closed = false;
                while i < bytes.len() {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        out[i] = b' ';
                        out[i + 1] = b' ';
                        i += 2;
                        closed = true;
                        break;
                    }
                    if bytes[i] != b'\n' {
                        out[i] = b' ';
                    }
                    i += 1;
                }
                if !closed {
                    return Err(ParseError::UnterminatedComment { offset: start });
                }
            }
            _ => i += 1,
        }
    }
    // Only ASCII bytes outside strings were replaced, so UTF-8 is preserved.
    String::from_utf8(out).map_err(|_| ParseError::Syntax {
        offset: 0,
        expected: "UTF-8 text",
        found: "invalid byte sequence".into(),
    })
}

/// Return the index just past the string literal starting at `start`.
fn skip_string(bytes: &[u8], start: usize) -> Result<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Ok(i + 1),
            b'\n' => break,
            _ => i += 1,
        }
    }
    Err(ParseError::UnterminatedString { offset: start })
}

/// Check brace nesting over comment-free text, ignoring braces inside strings.
pub fn check_braces(text: &str) -> Result<()> {
    let bytes = text.as_bytes();
    let mut open = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'{' => open.push(i),
            b'}' => {
                if open.pop().is_none() {
                    return Err(ParseError::UnbalancedBrace {
                        offset: i,
                        detail: "closing brace without a matching '{'",
                    });
                }
            }
            _ => {}
        }
        i += 1;
    }
    match open.pop() {
        Some(offset) => Err(ParseError::UnbalancedBrace {
            offset,
            detail: "opening brace is never closed",
        }),
        None => Ok(()),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ',' | '.' | '+' | '-' | '#' | '@' | '?')
}

/// Tokenize comment-free text.
pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let single = match c {
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '<' => Some(TokenKind::LAngle),
            '>' => Some(TokenKind::RAngle),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ';' => Some(TokenKind::Semi),
            '=' => Some(TokenKind::Eq),
            ':' => Some(TokenKind::Colon),
            '&' => Some(TokenKind::Amp),
            _ => None,
        };
        if let Some(kind) = single {
            chars.next();
            tokens.push(Token { kind, offset });
            continue;
        }

        match c {
            ',' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::Comma,
                    offset,
                });
            }
            '"' => {
                let end = skip_string(bytes, offset)?;
                let raw = &text[offset + 1..end - 1];
                tokens.push(Token {
                    kind: TokenKind::Str(unescape(raw)),
                    offset,
                });
                while chars.peek().is_some_and(|&(i, _)| i < end) {
                    chars.next();
                }
            }
            '/' => {
                chars.next();
                // `/name/` directive, otherwise a bare slash (the root node).
                let rest = &text[offset + 1..];
                let name_len = rest
                    .find(|ch: char| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-'))
                    .unwrap_or(rest.len());
                if name_len > 0 && rest[name_len..].starts_with('/') {
                    let name = rest[..name_len].to_string();
                    let end = offset + 1 + name_len + 1;
                    while chars.peek().is_some_and(|&(i, _)| i < end) {
                        chars.next();
                    }
                    tokens.push(Token {
                        kind: TokenKind::Directive(name),
                        offset,
                    });
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Slash,
                        offset,
                    });
                }
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if !is_word_char(ch) {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                // Trailing commas belong to the separator, not the word.
                let trimmed = word.trim_end_matches(',');
                let trailing = word.len() - trimmed.len();
                tokens.push(Token {
                    kind: TokenKind::Word(trimmed.to_string()),
                    offset,
                });
                for n in 0..trailing {
                    tokens.push(Token {
                        kind: TokenKind::Comma,
                        offset: offset + trimmed.len() + n,
                    });
                }
            }
            other => {
                return Err(ParseError::Syntax {
                    offset,
                    expected: "a name, value or punctuation",
                    found: format!("'{other}'"),
                });
            }
        }
    }
    Ok(tokens)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_blanked_in_place() {
        let src = "a; // line\n/* block\n */ b;";
        let stripped = strip_comments(src).unwrap();
        assert_eq!(stripped.len(), src.len());
        assert!(!stripped.contains("line"));
        assert!(!stripped.contains("block"));
        assert_eq!(stripped.find('b'), src.rfind('b'));
    }

    #[test]
    fn comment_markers_inside_strings_survive() {
        let src = "url = \"http://x\";";
        assert_eq!(strip_comments(src).unwrap(), src);
    }

    #[test]
    fn unterminated_comment() {
        let err = strip_comments("a; /* never").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedComment { offset: 3 });
    }

    #[test]
    fn brace_errors_report_offsets() {
        let err = check_braces("a { b { } ").unwrap_err();
        assert_eq!(err.offset(), 2);
        let err = check_braces("a { } }").unwrap_err();
        assert_eq!(err.offset(), 6);
        assert!(check_braces("a { s = \"}\"; }").is_ok());
    }

    #[test]
    fn tokenizes_node_header() {
        let toks = tokenize("rpm: adc@4000 { x = <1 &a>; };").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(kinds[0], TokenKind::Word("rpm".into()));
        assert_eq!(kinds[1], TokenKind::Colon);
        assert_eq!(kinds[2], TokenKind::Word("adc@4000".into()));
        assert_eq!(kinds[3], TokenKind::LBrace);
        assert!(kinds.contains(&TokenKind::Amp));
        assert_eq!(toks[2].offset, 5);
    }

    #[test]
    fn directives_and_root() {
        let toks = tokenize("/dts-v1/; / { };").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Directive("dts-v1".into()));
        assert_eq!(toks[2].kind, TokenKind::Slash);
    }

    #[test]
    fn string_lists_split_on_comma() {
        let toks = tokenize("compatible = \"a,b\", \"c\";").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Word("compatible".into()),
                TokenKind::Eq,
                TokenKind::Str("a,b".into()),
                TokenKind::Comma,
                TokenKind::Str("c".into()),
                TokenKind::Semi,
            ]
        );
    }
}
