//! Recursive-descent parser from tokens to a [`Block`] tree.
//
//  Grammar:
//
//      file     ::= ( directive | block )*
//      block    ::= ( label ':' )* ( name | '/' | '&' label ) '{' body '}' ';'?
//      body     ::= ( property | block )*
//      property ::= name ( '=' value ( ',' value )* )? ';'
//      value    ::= '<' cell* '>' | string | '[' byte* ']' | '&' label
//      cell     ::= integer | '&' label

use log::debug;

use lq_core::{Block, ParsedNode, PropertyValue, Span};

use crate::error::{ParseError, Result};
use crate::lexer::{check_braces, strip_comments, tokenize, Token, TokenKind};

/// Parse description text into its block tree.
///
/// Comments are stripped and brace nesting is checked before any structure
/// is read, so a malformed file never yields partial output.
pub fn parse_blocks(src: &str) -> Result<Vec<Block>> {
    let text = strip_comments(src)?;
    check_braces(&text)?;
    let tokens = tokenize(&text)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: src.len(),
    };
    let blocks = parser.file()?;
    debug!("parsed {} top-level block(s) from {} tokens", blocks.len(), tokens.len());
    Ok(blocks)
}

/// Parse description text into the flat collection of typed nodes.
///
/// Every block that declares `compatible`, at any depth, becomes a node in
/// pre-order. Blocks without a type are dropped.
pub fn parse_nodes(src: &str) -> Result<Vec<ParsedNode>> {
    let blocks = parse_blocks(src)?;
    Ok(collect_nodes(&blocks))
}

/// Lift every typed block of a tree into a node, parents first.
pub fn collect_nodes(blocks: &[Block]) -> Vec<ParsedNode> {
    let mut nodes = Vec::new();
    let mut untyped = 0usize;
    for block in blocks {
        for b in block.walk() {
            match ParsedNode::from_block(b) {
                Some(node) => nodes.push(node),
                None => untyped += 1,
            }
        }
    }
    debug!("{} typed node(s), {} untyped block(s) dropped", nodes.len(), untyped);
    nodes
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Offset reported for errors at end of input.
    end: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, ahead: usize) -> Option<&'t TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.offset).unwrap_or(self.end)
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, expected: &'static str) -> ParseError {
        ParseError::Syntax {
            offset: self.offset(),
            expected,
            found: self
                .peek()
                .map(TokenKind::describe)
                .unwrap_or_else(|| "end of input".into()),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<&'t Token> {
        if self.peek() == Some(&kind) {
            // Checked above.
            self.bump().ok_or_else(|| self.error(expected))
        } else {
            Err(self.error(expected))
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn word(&mut self, expected: &'static str) -> Result<(String, usize)> {
        match self.tokens.get(self.pos) {
            Some(Token {
                kind: TokenKind::Word(w),
                offset,
            }) => {
                self.pos += 1;
                Ok((w.clone(), *offset))
            }
            _ => Err(self.error(expected)),
        }
    }

    fn file(&mut self) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        while let Some(kind) = self.peek() {
            match kind {
                TokenKind::Directive(_) => self.directive(),
                TokenKind::Semi => {
                    self.pos += 1;
                }
                _ => blocks.push(self.block()?),
            }
        }
        Ok(blocks)
    }

    /// `/dts-v1/;`, `/plugin/;` and `/include/ "file"` carry nothing for us.
    fn directive(&mut self) {
        self.pos += 1;
        if matches!(self.peek(), Some(TokenKind::Str(_))) {
            self.pos += 1;
        }
        self.eat(&TokenKind::Semi);
    }

    fn block(&mut self) -> Result<Block> {
        let start = self.offset();
        let mut label = None;

        // Labels: `a: b: name {`.
        while matches!(self.peek(), Some(TokenKind::Word(_)))
            && self.peek_at(1) == Some(&TokenKind::Colon)
        {
            let (l, _) = self.word("a label")?;
            self.pos += 1;
            label.get_or_insert(l);
        }

        let full_name = match self.peek() {
            Some(TokenKind::Slash) => {
                self.pos += 1;
                "/".to_string()
            }
            Some(TokenKind::Amp) => {
                self.pos += 1;
                let (target, _) = self.word("a label after '&'")?;
                format!("&{target}")
            }
            Some(TokenKind::Word(_)) => self.word("a node name")?.0,
            _ => return Err(self.error("a node name")),
        };
        let (name, address) = match full_name.split_once('@') {
            Some((n, a)) => (n.to_string(), Some(a.to_string())),
            None => (full_name, None),
        };

        self.expect(TokenKind::LBrace, "'{' after node name")?;
        let mut block = Block::new(name);
        block.label = label;
        block.address = address;
        self.body(&mut block)?;
        let close = self.expect(TokenKind::RBrace, "'}' closing the node")?;
        let mut end = close.offset + 1;
        if let Some(Token {
            kind: TokenKind::Semi,
            offset,
        }) = self.tokens.get(self.pos)
        {
            end = offset + 1;
            self.pos += 1;
        }
        block.span = Span { start, end };
        Ok(block)
    }

    fn body(&mut self, block: &mut Block) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(TokenKind::RBrace), _) | (None, _) => return Ok(()),
                (Some(TokenKind::Semi), _) => self.pos += 1,
                (Some(TokenKind::Directive(_)), _) => self.directive(),
                (Some(TokenKind::Word(_)), Some(TokenKind::Eq | TokenKind::Semi)) => {
                    let (name, value) = self.property()?;
                    block.properties.insert(&name, value);
                }
                (Some(TokenKind::Word(_) | TokenKind::Amp), _) => {
                    block.children.push(self.block()?);
                }
                _ => return Err(self.error("a property or child node")),
            }
        }
    }

    fn property(&mut self) -> Result<(String, PropertyValue)> {
        let (name, start) = self.word("a property name")?;
        if self.eat(&TokenKind::Semi) {
            return Ok((name, PropertyValue::Flag));
        }
        self.expect(TokenKind::Eq, "'='")?;

        let mut values = vec![self.value()?];
        while self.eat(&TokenKind::Comma) {
            values.push(self.value()?);
        }
        self.expect(TokenKind::Semi, "';' after property value")?;
        Ok((name, merge_values(values, start)?))
    }

    fn value(&mut self) -> Result<Value> {
        let offset = self.offset();
        let value = match self.peek() {
            Some(TokenKind::Str(s)) => Value::Str(s.clone()),
            Some(TokenKind::LAngle) => {
                self.pos += 1;
                return self.cells(offset);
            }
            Some(TokenKind::LBracket) => {
                self.pos += 1;
                return self.bytes();
            }
            Some(TokenKind::Amp) => {
                self.pos += 1;
                let (label, _) = self.word("a label after '&'")?;
                return Ok(Value::Refs(vec![label]));
            }
            _ => return Err(self.error("a value: <cells>, \"string\", [bytes] or &label")),
        };
        self.pos += 1;
        Ok(value)
    }

    fn cells(&mut self, open: usize) -> Result<Value> {
        let mut ints = Vec::new();
        let mut refs = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::RAngle) => {
                    self.pos += 1;
                    break;
                }
                Some(TokenKind::Amp) => {
                    self.pos += 1;
                    refs.push(self.word("a label after '&'")?.0);
                }
                Some(TokenKind::Word(_)) => {
                    let (text, offset) = self.word("an integer")?;
                    ints.push(parse_int(&text).ok_or(ParseError::InvalidInteger { offset, text })?);
                }
                _ => return Err(self.error("an integer, &label or '>'")),
            }
        }
        match (ints.is_empty(), refs.is_empty()) {
            (_, true) => Ok(Value::Ints(ints)),
            (true, false) => Ok(Value::Refs(refs)),
            (false, false) => Err(ParseError::Syntax {
                offset: open,
                expected: "integers or references, not both",
                found: "a mixed cell list".into(),
            }),
        }
    }

    fn bytes(&mut self) -> Result<Value> {
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::RBracket) => {
                    self.pos += 1;
                    return Ok(Value::Ints(out));
                }
                Some(TokenKind::Word(_)) => {
                    let (text, offset) = self.word("hex bytes")?;
                    if text.len() % 2 != 0 {
                        return Err(ParseError::InvalidInteger { offset, text });
                    }
                    for pair in text.as_bytes().chunks(2) {
                        let digits = std::str::from_utf8(pair).unwrap_or_default();
                        let byte = i64::from_str_radix(digits, 16).map_err(|_| {
                            ParseError::InvalidInteger {
                                offset,
                                text: text.clone(),
                            }
                        })?;
                        out.push(byte);
                    }
                }
                _ => return Err(self.error("hex bytes or ']'")),
            }
        }
    }
}

/// One comma-separated piece of a property value.
enum Value {
    Str(String),
    Ints(Vec<i64>),
    Refs(Vec<String>),
}

fn merge_values(values: Vec<Value>, offset: usize) -> Result<PropertyValue> {
    let mut strings = Vec::new();
    let mut ints = Vec::new();
    let mut refs = Vec::new();
    for v in values {
        match v {
            Value::Str(s) => strings.push(s),
            Value::Ints(i) => ints.extend(i),
            Value::Refs(r) => refs.extend(r),
        }
    }
    let kinds = [!strings.is_empty(), !ints.is_empty(), !refs.is_empty()]
        .iter()
        .filter(|k| **k)
        .count();
    if kinds > 1 {
        return Err(ParseError::Syntax {
            offset,
            expected: "values of a single kind",
            found: "a mix of strings, integers and references".into(),
        });
    }

    Ok(if let Some(first) = strings.into_iter().next() {
        PropertyValue::Str(first)
    } else if !refs.is_empty() {
        if refs.len() == 1 {
            PropertyValue::Ref(refs.remove(0))
        } else {
            PropertyValue::RefList(refs)
        }
    } else if ints.len() == 1 {
        PropertyValue::Int(ints[0])
    } else {
        PropertyValue::IntArray(ints)
    })
}

/// Decimal, `0x` hex, optional leading `-`.
pub fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        i64::from_str_radix(hex, 16).ok()?
    } else {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lq_core::{HwBus, NodeKind};

    const SAMPLE: &str = r#"
/dts-v1/;

/ {
    engine {
        compatible = "lq,engine";
        ring-buffer-depth = <32>;
    };

    rpm: adc-rpm@0 {
        compatible = "lq,hw-adc-input";
        hw-channel = <0x3>;
    };

    /* a scale */
    rpm_scaled: scale@1 {
        compatible = "lq,scale";
        input = <&rpm>;
        scale_factor = <-1500>;
        invert;
    };

    pins {
        // no compatible, dropped
        note = "x", "y";
    };
};
"#;

    #[test]
    fn parses_sample_into_tree() {
        let blocks = parse_blocks(SAMPLE).unwrap();
        assert_eq!(blocks.len(), 1);
        let root = &blocks[0];
        assert_eq!(root.name, "/");
        assert_eq!(root.children.len(), 4);

        let rpm = &root.children[1];
        assert_eq!(rpm.label.as_deref(), Some("rpm"));
        assert_eq!(rpm.name, "adc-rpm");
        assert_eq!(rpm.address.as_deref(), Some("0"));
        assert_eq!(rpm.properties.int("hw-channel"), Some(3));
    }

    #[test]
    fn nodes_are_flattened_and_untyped_blocks_dropped() {
        let nodes = parse_nodes(SAMPLE).unwrap();
        let kinds: Vec<_> = nodes.iter().map(|n| n.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Engine, NodeKind::HwInput(HwBus::Adc), NodeKind::Scale]
        );
        let scale = &nodes[2];
        assert_eq!(
            scale.properties.get("input"),
            Some(&PropertyValue::Ref("rpm".into()))
        );
        assert_eq!(scale.properties.int("scale-factor"), Some(-1500));
        assert!(scale.properties.flag("invert"));
    }

    #[test]
    fn span_covers_node_text() {
        let src = "x { a: n@1 { compatible = \"lq,scale\"; }; };";
        let nodes = parse_nodes(src).unwrap();
        let span = nodes[0].span;
        assert_eq!(&src[span.start..span.end], "a: n@1 { compatible = \"lq,scale\"; };");
    }

    #[test]
    fn first_string_wins() {
        let blocks = parse_blocks("n { s = \"a\", \"b\"; };").unwrap();
        assert_eq!(blocks[0].properties.str("s"), Some("a"));
    }

    #[test]
    fn reference_lists_and_arrays() {
        let blocks =
            parse_blocks("n { a = <&x &y>, <&z>; b = <1 2 3>; c = &w; d = [01 ff]; };").unwrap();
        let props = &blocks[0].properties;
        assert_eq!(
            props.get("a"),
            Some(&PropertyValue::RefList(vec!["x".into(), "y".into(), "z".into()]))
        );
        assert_eq!(props.get("b"), Some(&PropertyValue::IntArray(vec![1, 2, 3])));
        assert_eq!(props.get("c"), Some(&PropertyValue::Ref("w".into())));
        assert_eq!(props.get("d"), Some(&PropertyValue::IntArray(vec![1, 255])));
    }

    #[test]
    fn mixed_cells_are_rejected() {
        let err = parse_blocks("n { a = <1 &x>; };").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { offset: 8, .. }));
    }

    #[test]
    fn bad_integer_reports_text() {
        let err = parse_blocks("n { a = <12abc>; };").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidInteger {
                offset: 9,
                text: "12abc".into()
            }
        );
    }

    #[test]
    fn unbalanced_braces_abort() {
        let err = parse_nodes("a { compatible = \"lq,scale\";").unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedBrace { offset: 2, .. }));
    }

    #[test]
    fn missing_semicolon_is_a_syntax_error() {
        let err = parse_blocks("n { a = <1> b = <2>; };").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn integers() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x2A"), Some(42));
        assert_eq!(parse_int("-7"), Some(-7));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int("-"), None);
    }

    #[test]
    fn signs_only_lead_the_number() {
        assert_eq!(parse_int("0x+5"), None);
        assert_eq!(parse_int("0x-5"), None);
        assert_eq!(parse_int("-0x-5"), None);
        assert_eq!(parse_int("+5"), None);
        assert_eq!(parse_int("0x"), None);

        let err = parse_blocks("n { a = <0x+5>; };").unwrap_err();
        assert!(matches!(err, ParseError::InvalidInteger { ref text, .. } if text == "0x+5"));
        let err = parse_blocks("n { a = <+5>; };").unwrap_err();
        assert!(matches!(err, ParseError::InvalidInteger { ref text, .. } if text == "+5"));
    }

    #[test]
    fn overlay_blocks_are_untyped() {
        let nodes = parse_nodes("&rpm { status = \"okay\"; };").unwrap();
        assert!(nodes.is_empty());
    }
}
