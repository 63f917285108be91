//! `lq_generated.c`: engine instance, entry points and dispatch.

use std::collections::BTreeSet;

use lq_core::{OutputFamily, Topology};
use lq_targets::HwInput;

use super::header::wake_signature;
use super::item::{Banner, Function, Item, Stmt};
use super::{dispatch, engine, isr};
use crate::error::Result;

pub fn generated_source(
    topology: &Topology,
    banner: &Banner,
    inputs: &[HwInput],
    wakes: &[String],
    families: &BTreeSet<OutputFamily>,
) -> Result<Vec<Item>> {
    let mut items = vec![
        Item::Banner(banner.clone()),
        Item::Blank,
        Item::Include {
            path: "lq_generated.h".into(),
            system: false,
        },
        Item::Include {
            path: "lq_hw_input.h".into(),
            system: false,
        },
    ];
    items.extend(dispatch::includes(families));
    items.extend([
        Item::Include {
            path: "stdbool.h".into(),
            system: true,
        },
        Item::Include {
            path: "stddef.h".into(),
            system: true,
        },
        Item::Include {
            path: "stdint.h".into(),
            system: true,
        },
        Item::Blank,
    ]);

    let transports = dispatch::transport_decls(families);
    if !transports.is_empty() {
        items.extend(transports);
        items.push(Item::Blank);
    }

    items.push(Item::Comment("Engine instance".into()));
    items.push(engine::engine_global(topology)?);
    items.push(Item::Blank);

    items.extend(isr::definitions(inputs));

    for wake in wakes {
        items.push(Item::Function(
            Function::new(wake_signature(wake))
                .doc("Default wake action: none")
                .weak()
                .body(vec![
                    Stmt::line("(void)monitor_id;"),
                    Stmt::line("(void)input_value;"),
                    Stmt::line("(void)fault_level;"),
                ]),
        ));
        items.push(Item::Blank);
    }

    items.push(Item::Function(init_function()));
    items.push(Item::Blank);
    items.push(Item::Function(dispatch::dispatch_function(families)));
    Ok(items)
}

fn init_function() -> Function {
    let check = |call: &str| {
        vec![
            Stmt::line(format!("ret = {call};")),
            Stmt::block("if (ret != 0)", vec![Stmt::line("return ret;")]),
        ]
    };
    let mut body = vec![Stmt::line("int ret;"), Stmt::Blank];
    body.extend(check("lq_engine_init(&g_lq_engine)"));
    body.extend(check("lq_hw_input_init(LQ_HW_RINGBUFFER_SIZE)"));
    body.extend([
        Stmt::Blank,
        Stmt::directive("#ifdef LQ_PLATFORM_INIT"),
        Stmt::line("lq_platform_peripherals_init();"),
        Stmt::directive("#endif"),
        Stmt::Blank,
        Stmt::line("return 0;"),
    ]);
    Function::new("int lq_generated_init(void)").body(body)
}
