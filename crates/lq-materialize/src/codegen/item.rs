//! Typed emission items.
//!
//! Generators build a `Vec<Item>` describing a C file and hand it to
//! [`render`](super::render::render). Ordering and conditional inclusion
//! live in the generators; text layout lives only in the renderer.

/// One top-level element of a generated C file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// The AUTO-GENERATED comment block.
    Banner(Banner),
    /// `/* text */` on its own line.
    Comment(String),
    Blank,
    /// `#include "path"` or `#include <path>`.
    Include { path: String, system: bool },
    /// `#ifndef NAME` / `#define NAME`.
    GuardOpen(String),
    /// `#endif /* NAME */`.
    GuardClose(String),
    /// `extern "C" {` under `#ifdef __cplusplus`.
    CppOpen,
    CppClose,
    /// `#define NAME VALUE`.
    Define { name: String, value: String },
    /// A declaration line; the trailing `;` is added by the renderer.
    Decl(String),
    /// `decl = init;`
    Global { decl: String, init: Init },
    Function(Function),
    /// Pre-rendered text, emitted verbatim.
    Raw(String),
}

/// Provenance of a generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// File name of the description, without directories.
    pub source: String,
    /// Short SHA-256 of the description text.
    pub fingerprint: String,
}

/// A function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Comment line above the definition.
    pub doc: Option<String>,
    /// Emit `__attribute__((weak))` on its own line first.
    pub weak: bool,
    /// Everything before the opening brace, e.g. `int lq_generated_init(void)`.
    pub signature: String,
    pub body: Vec<Stmt>,
}

impl Function {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            doc: None,
            weak: false,
            signature: signature.into(),
            body: Vec::new(),
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn weak(mut self) -> Self {
        self.weak = true;
        self
    }

    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }
}

/// A statement inside a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// One line, written as given.
    Line(String),
    Blank,
    /// A preprocessor line, always written at column 0.
    Directive(String),
    /// `head {` body `}`, used for `if`, `for`, `switch` and `case` blocks.
    Block { head: String, body: Vec<Stmt> },
}

impl Stmt {
    pub fn line(text: impl Into<String>) -> Self {
        Stmt::Line(text.into())
    }

    pub fn directive(text: impl Into<String>) -> Self {
        Stmt::Directive(text.into())
    }

    pub fn block(head: impl Into<String>, body: Vec<Stmt>) -> Self {
        Stmt::Block {
            head: head.into(),
            body,
        }
    }
}

/// A C initializer expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Init {
    /// Any scalar expression: `42`, `true`, `LQ_VOTE_MEDIAN`.
    Expr(String),
    /// `{ .name = init, ... }`, one field per line.
    Fields(Vec<(String, Init)>),
    /// `{ [0] = init, [1] = init, ... }`, one element per line.
    Indexed(Vec<Init>),
    /// `{a, b, c}` on one line.
    List(Vec<String>),
}

impl Init {
    pub fn int(value: impl ToString) -> Self {
        Init::Expr(value.to_string())
    }

    pub fn bool(value: bool) -> Self {
        Init::Expr(if value { "true" } else { "false" }.into())
    }
}

/// Builder for [`Init::Fields`].
#[derive(Debug, Default)]
pub struct Fields(Vec<(String, Init)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, init: Init) -> Self {
        self.0.push((name.to_string(), init));
        self
    }

    pub fn expr(self, name: &str, value: impl ToString) -> Self {
        self.field(name, Init::Expr(value.to_string()))
    }

    pub fn flag(self, name: &str, value: bool) -> Self {
        self.field(name, Init::bool(value))
    }

    pub fn build(self) -> Init {
        Init::Fields(self.0)
    }
}
