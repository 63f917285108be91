//! Single-pass text rendering of emission items.

use super::item::{Banner, Function, Init, Item, Stmt};

const INDENT: &str = "    ";

/// Render a file. The output always ends in exactly one newline.
pub fn render(items: &[Item]) -> String {
    let mut out = String::new();
    for item in items {
        render_item(&mut out, item);
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

fn render_item(out: &mut String, item: &Item) {
    match item {
        Item::Banner(banner) => out.push_str(&banner_text(banner)),
        Item::Comment(text) => {
            out.push_str(&format!("/* {text} */\n"));
        }
        Item::Blank => out.push('\n'),
        Item::Include { path, system } => {
            if *system {
                out.push_str(&format!("#include <{path}>\n"));
            } else {
                out.push_str(&format!("#include \"{path}\"\n"));
            }
        }
        Item::GuardOpen(name) => out.push_str(&format!("#ifndef {name}\n#define {name}\n")),
        Item::GuardClose(name) => out.push_str(&format!("#endif /* {name} */\n")),
        Item::CppOpen => out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n"),
        Item::CppClose => out.push_str("#ifdef __cplusplus\n}\n#endif\n"),
        Item::Define { name, value } => out.push_str(&format!("#define {name} {value}\n")),
        Item::Decl(decl) => {
            out.push_str(decl);
            out.push_str(";\n");
        }
        Item::Global { decl, init } => {
            out.push_str(decl);
            out.push_str(" = ");
            render_init(out, init, 0);
            out.push_str(";\n");
        }
        Item::Function(function) => render_function(out, function),
        Item::Raw(text) => {
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}

/// The comment block heading every generated file.
pub fn banner_text(banner: &Banner) -> String {
    format!(
        "/*\n * AUTO-GENERATED FILE - DO NOT EDIT\n * Generated by lqc from {}\n * Input fingerprint: sha256:{}\n */\n",
        banner.source, banner.fingerprint
    )
}

fn render_function(out: &mut String, function: &Function) {
    if let Some(doc) = &function.doc {
        out.push_str(&format!("/* {doc} */\n"));
    }
    if function.weak {
        out.push_str("__attribute__((weak))\n");
    }
    out.push_str(&function.signature);
    out.push_str("\n{\n");
    render_stmts(out, &function.body, 1);
    out.push_str("}\n");
}

fn render_stmts(out: &mut String, stmts: &[Stmt], depth: usize) {
    for stmt in stmts {
        match stmt {
            Stmt::Line(text) => {
                out.push_str(&INDENT.repeat(depth));
                out.push_str(text);
                out.push('\n');
            }
            Stmt::Blank => out.push('\n'),
            Stmt::Directive(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Stmt::Block { head, body } => {
                out.push_str(&INDENT.repeat(depth));
                out.push_str(head);
                out.push_str(" {\n");
                render_stmts(out, body, depth + 1);
                out.push_str(&INDENT.repeat(depth));
                out.push_str("}\n");
            }
        }
    }
}

fn render_init(out: &mut String, init: &Init, depth: usize) {
    match init {
        Init::Expr(expr) => out.push_str(expr),
        Init::List(values) => {
            out.push('{');
            out.push_str(&values.join(", "));
            out.push('}');
        }
        Init::Fields(fields) => {
            out.push_str("{\n");
            for (name, value) in fields {
                out.push_str(&INDENT.repeat(depth + 1));
                out.push('.');
                out.push_str(name);
                out.push_str(" = ");
                render_init(out, value, depth + 1);
                out.push_str(",\n");
            }
            out.push_str(&INDENT.repeat(depth));
            out.push('}');
        }
        Init::Indexed(elements) => {
            out.push_str("{\n");
            for (i, value) in elements.iter().enumerate() {
                out.push_str(&INDENT.repeat(depth + 1));
                out.push_str(&format!("[{i}] = "));
                render_init(out, value, depth + 1);
                out.push_str(",\n");
            }
            out.push_str(&INDENT.repeat(depth));
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::item::Fields;

    #[test]
    fn nested_initializer_layout() {
        let init = Fields::new()
            .expr("num_signals", 2)
            .field(
                "merges",
                Init::Indexed(vec![Fields::new()
                    .field("input_signals", Init::List(vec!["0".into(), "1".into()]))
                    .flag("enabled", true)
                    .build()]),
            )
            .build();
        let text = render(&[Item::Global {
            decl: "struct lq_engine g_lq_engine".into(),
            init,
        }]);
        assert_eq!(
            text,
            "struct lq_engine g_lq_engine = {\n    .num_signals = 2,\n    .merges = {\n        [0] = {\n            .input_signals = {0, 1},\n            .enabled = true,\n        },\n    },\n};\n"
        );
    }

    #[test]
    fn function_with_nested_blocks() {
        let f = Function::new("void f(void)").doc("demo").weak().body(vec![
            Stmt::block("if (x)", vec![Stmt::line("y();")]),
            Stmt::Blank,
            Stmt::line("return;"),
        ]);
        assert_eq!(
            render(&[Item::Function(f)]),
            "/* demo */\n__attribute__((weak))\nvoid f(void)\n{\n    if (x) {\n        y();\n    }\n\n    return;\n}\n"
        );
    }

    #[test]
    fn trailing_blank_lines_collapse() {
        let text = render(&[
            Item::GuardOpen("X_H_".into()),
            Item::Blank,
            Item::GuardClose("X_H_".into()),
            Item::Blank,
            Item::Blank,
        ]);
        assert_eq!(text, "#ifndef X_H_\n#define X_H_\n\n#endif /* X_H_ */\n");
    }

    #[test]
    fn includes_and_declarations() {
        let text = render(&[
            Item::Include { path: "stdint.h".into(), system: true },
            Item::Include { path: "lq_engine.h".into(), system: false },
            Item::Decl("int lq_generated_init(void)".into()),
        ]);
        assert_eq!(
            text,
            "#include <stdint.h>\n#include \"lq_engine.h\"\nint lq_generated_init(void);\n"
        );
    }
}
