//! Test descriptions compiled into a TAP-reporting C runner.
//!
//! Each case becomes a `static bool` function; each step becomes one checked
//! call into the HIL tester API. A failing step writes its reason into the
//! case's detail buffer and returns from that case only, so `main` always
//! reaches every case and the final tally.

use log::debug;

use lq_materialize::codegen::{render, Banner, Function, Item, Stmt};

use crate::suite::{Action, HilTest, Step};

/// Render `lq_hil_runner.c` for `tests`.
pub fn compile_harness(tests: &[HilTest], banner: &Banner) -> String {
    let mut items = vec![Item::Banner(banner.clone()), Item::Blank];
    for header in ["inttypes.h", "stdbool.h", "stdint.h", "stdio.h", "stdlib.h", "string.h", "unistd.h"] {
        items.push(Item::Include {
            path: header.into(),
            system: true,
        });
    }
    items.extend([
        Item::Include {
            path: "lq_hil.h".into(),
            system: false,
        },
        Item::Include {
            path: "lq_j1939.h".into(),
            system: false,
        },
        Item::Blank,
        Item::Decl("static int tests_run".into()),
        Item::Decl("static int tests_passed".into()),
        Item::Decl("static int tests_failed".into()),
        Item::Blank,
        Item::Function(tap_result()),
        Item::Blank,
    ]);

    for test in tests {
        items.push(Item::Function(case_function(test)));
        items.push(Item::Blank);
    }
    items.push(Item::Function(main_function(tests)));

    debug!(
        "compiled {} case(s), {} step(s)",
        tests.len(),
        tests.iter().map(|t| t.steps.len()).sum::<usize>()
    );
    render(&items)
}

/// C function name of a case.
pub fn case_ident(test: &HilTest) -> String {
    test.name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn tap_result() -> Function {
    Function::new("static void tap_result(bool passed, const char *name, const char *details)")
        .doc("One TAP line per case")
        .body(vec![
            Stmt::line("tests_run++;"),
            Stmt::block(
                "if (passed)",
                vec![
                    Stmt::line("tests_passed++;"),
                    Stmt::line("printf(\"ok %d - %s\", tests_run, name);"),
                ],
            ),
            Stmt::block(
                "else",
                vec![
                    Stmt::line("tests_failed++;"),
                    Stmt::line("printf(\"not ok %d - %s\", tests_run, name);"),
                ],
            ),
            Stmt::block(
                "if (details[0] != '\\0')",
                vec![Stmt::line("printf(\" # %s\", details);")],
            ),
            Stmt::line("printf(\"\\n\");"),
        ])
}

fn case_function(test: &HilTest) -> Function {
    let mut body = vec![
        Stmt::line("(void)details;"),
        Stmt::line("(void)len;"),
    ];
    for step in &test.steps {
        body.push(Stmt::Blank);
        body.push(Stmt::line(format!(
            "/* step {}: {} */",
            step.index,
            step.action.name()
        )));
        body.extend(step_body(step));
    }
    body.push(Stmt::Blank);
    body.push(Stmt::line("return true;"));

    let doc = if test.description.is_empty() {
        format!("{} (timeout {} ms)", test.name, test.timeout_ms)
    } else {
        format!("{} (timeout {} ms)", test.description, test.timeout_ms)
    };
    Function::new(format!("static bool {}(char *details, size_t len)", case_ident(test)))
        .doc(doc)
        .body(body)
}

/// `if (<call> != 0) { <fail> }`
fn checked(call: String, reason: String) -> Stmt {
    Stmt::block(format!("if ({call} != 0)"), fail(reason))
}

/// Report and leave the case. `reason` is a C format string; `args` follow it.
fn fail_with(reason: &str, args: &str) -> Vec<Stmt> {
    let args = if args.is_empty() {
        String::new()
    } else {
        format!(", {args}")
    };
    vec![
        Stmt::line(format!("snprintf(details, len, \"{reason}\"{args});")),
        Stmt::line("return false;"),
    ]
}

fn fail(reason: String) -> Vec<Stmt> {
    fail_with(&reason, "")
}

fn sleep_ms(ms: i64) -> Stmt {
    Stmt::line(format!("usleep({ms} * 1000);"))
}

fn inject_adc(n: u32, channel: i64, value: i64) -> Stmt {
    checked(
        format!("lq_hil_tester_inject_adc({channel}, {value})"),
        format!("step {n}: ADC injection on channel {channel} failed"),
    )
}

fn payload(n: u32, data: &[u8]) -> Stmt {
    let mut bytes: Vec<String> = data.iter().map(|b| format!("0x{b:02X}")).collect();
    if bytes.is_empty() {
        bytes.push("0".into());
    }
    Stmt::line(format!(
        "static const uint8_t data_{n}[8] = {{{}}};",
        bytes.join(", ")
    ))
}

fn wait_can(n: u32, timeout_ms: i64) -> Vec<Stmt> {
    vec![
        Stmt::line(format!("struct lq_hil_can_msg msg_{n};")),
        checked(
            format!("lq_hil_tester_wait_can(&msg_{n}, {timeout_ms})"),
            format!("step {n}: no CAN frame within {timeout_ms} ms"),
        ),
    ]
}

fn check_pgn(n: u32, pgn: i64) -> Vec<Stmt> {
    vec![
        Stmt::line(format!("uint32_t pgn_{n} = (msg_{n}.can_id >> 8) & 0x3FFFF;")),
        Stmt::block(
            format!("if (pgn_{n} != {pgn}u)"),
            fail_with(
                &format!("step {n}: expected PGN {pgn}, got %\" PRIu32 \""),
                &format!("pgn_{n}"),
            ),
        ),
    ]
}

fn step_body(step: &Step) -> Vec<Stmt> {
    let n = step.index;
    match &step.action {
        Action::InjectAdc {
            channel,
            value,
            delay_ms,
        } => {
            let mut body = vec![inject_adc(n, *channel, *value)];
            if *delay_ms > 0 {
                body.push(sleep_ms(*delay_ms));
            }
            body
        }
        Action::InjectMultiAdc {
            channels,
            values,
            delay_ms,
        } => {
            let mut body: Vec<Stmt> = channels
                .iter()
                .zip(values)
                .map(|(c, v)| inject_adc(n, *c, *v))
                .collect();
            if *delay_ms > 0 {
                body.push(sleep_ms(*delay_ms));
            }
            body
        }
        Action::InjectAdcPeriodic {
            channel,
            value,
            period_ms,
            count,
        } => vec![Stmt::block(
            format!("for (int i = 0; i < {count}; i++)"),
            vec![inject_adc(n, *channel, *value), sleep_ms(*period_ms)],
        )],
        Action::InjectCan {
            can_id,
            extended,
            data,
        } => vec![
            payload(n, data),
            checked(
                format!(
                    "lq_hil_tester_inject_can(0x{can_id:X}u, {extended}, data_{n}, {})",
                    data.len()
                ),
                format!("step {n}: CAN injection failed"),
            ),
        ],
        Action::InjectCanPgn {
            pgn,
            priority,
            source,
            data,
        } => vec![
            Stmt::line(format!(
                "uint32_t id_{n} = lq_j1939_build_id_from_pgn({pgn}u, {priority}, 0x{source:02X});"
            )),
            payload(n, data),
            checked(
                format!("lq_hil_tester_inject_can(id_{n}, true, data_{n}, {})", data.len()),
                format!("step {n}: J1939 injection for PGN {pgn} failed"),
            ),
        ],
        Action::WaitGpio {
            pin,
            high,
            timeout_ms,
        } => vec![checked(
            format!(
                "lq_hil_tester_wait_gpio(NULL, {pin}, {}, {timeout_ms})",
                u8::from(*high)
            ),
            format!(
                "step {n}: GPIO pin {pin} not {} within {timeout_ms} ms",
                if *high { "high" } else { "low" }
            ),
        )],
        Action::ExpectCan { pgn, timeout_ms } => {
            let mut body = wait_can(n, *timeout_ms);
            if let Some(pgn) = pgn {
                body.extend(check_pgn(n, *pgn));
            }
            body
        }
        Action::ExpectCanPgn { pgn, timeout_ms } => {
            let mut body = wait_can(n, *timeout_ms);
            body.extend(check_pgn(n, *pgn));
            body
        }
        Action::MeasureLatency {
            channel,
            value,
            max_latency_us,
            timeout_ms,
        } => {
            let mut body = vec![
                Stmt::line(format!("uint64_t start_{n} = lq_hil_get_timestamp_us();")),
                inject_adc(n, *channel, *value),
            ];
            body.extend(wait_can(n, *timeout_ms));
            body.push(Stmt::line(format!(
                "uint64_t latency_{n} = lq_hil_get_timestamp_us() - start_{n};"
            )));
            body.push(Stmt::block(
                format!("if (latency_{n} > {max_latency_us}u)"),
                fail_with(
                    &format!("step {n}: latency %\" PRIu64 \" us exceeds {max_latency_us} us"),
                    &format!("latency_{n}"),
                ),
            ));
            body.push(Stmt::line(format!(
                "snprintf(details, len, \"latency %\" PRIu64 \" us\", latency_{n});"
            )));
            body
        }
        Action::Delay { duration_ms } => vec![sleep_ms(*duration_ms)],
    }
}

fn main_function(tests: &[HilTest]) -> Function {
    let mut body = vec![
        Stmt::line("int sut_pid = 0;"),
        Stmt::line("char details[256];"),
        Stmt::Blank,
        Stmt::block(
            "for (int i = 1; i < argc; i++)",
            vec![Stmt::block(
                "if (strncmp(argv[i], \"--sut-pid=\", 10) == 0)",
                vec![Stmt::line("sut_pid = atoi(argv[i] + 10);")],
            )],
        ),
        Stmt::block(
            "if (sut_pid == 0)",
            vec![
                Stmt::line("fprintf(stderr, \"usage: %s --sut-pid=<pid>\\n\", argv[0]);"),
                Stmt::line("return 1;"),
            ],
        ),
        Stmt::block(
            "if (lq_hil_init(LQ_HIL_MODE_TESTER, NULL, sut_pid) != 0)",
            vec![
                Stmt::line("fprintf(stderr, \"failed to initialize HIL tester\\n\");"),
                Stmt::line("return 1;"),
            ],
        ),
        Stmt::Blank,
        Stmt::line("printf(\"TAP version 14\\n\");"),
        Stmt::line(format!("printf(\"1..{}\\n\");", tests.len())),
    ];
    for test in tests {
        body.push(Stmt::Blank);
        body.push(Stmt::line("details[0] = '\\0';"));
        body.push(Stmt::line(format!(
            "tap_result({}(details, sizeof(details)), \"{}\", details);",
            case_ident(test),
            test.name
        )));
    }
    body.extend([
        Stmt::Blank,
        Stmt::line("lq_hil_cleanup();"),
        Stmt::line(
            "fprintf(stderr, \"\\nTests: %d passed, %d failed, %d total\\n\", tests_passed, tests_failed, tests_run);",
        ),
        Stmt::line("return tests_failed > 0 ? 1 : 0;"),
    ]);
    Function::new("int main(int argc, char *argv[])").body(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::parse_suite;

    fn banner() -> Banner {
        Banner {
            source: "suite.dts".into(),
            fingerprint: "abcdef0123456789".into(),
        }
    }

    fn compile(src: &str) -> String {
        compile_harness(&parse_suite(src).unwrap(), &banner())
    }

    #[test]
    fn tap_plan_and_summary() {
        let runner = compile(
            r#"
            hil-test-one { compatible = "lq,hil-test"; sequence { step@0 { action = "delay"; duration-ms = <5>; }; }; };
            hil-test-two { compatible = "lq,hil-test"; };
            "#,
        );
        assert!(runner.contains("printf(\"TAP version 14\\n\");"));
        assert!(runner.contains("printf(\"1..2\\n\");"));
        assert!(runner.contains("tap_result(hil_test_one(details, sizeof(details)), \"hil-test-one\", details);"));
        assert!(runner.contains("Tests: %d passed, %d failed, %d total"));
        assert!(runner.contains("return tests_failed > 0 ? 1 : 0;"));
        assert!(runner.contains("usleep(5 * 1000);"));
    }

    #[test]
    fn failed_step_returns_from_its_case() {
        let runner = compile(
            r#"hil-test-adc { sequence { step@3 { action = "inject-adc"; channel = <2>; value = <4095>; }; }; };"#,
        );
        assert!(runner.contains(
            "    if (lq_hil_tester_inject_adc(2, 4095) != 0) {\n        snprintf(details, len, \"step 3: ADC injection on channel 2 failed\");\n        return false;\n    }\n"
        ));
    }

    #[test]
    fn pgn_filter_on_expect_can() {
        let runner = compile(
            r#"hil-test-bus { sequence {
                step@0 { action = "expect-can"; pgn = <65265>; timeout-ms = <150>; };
                step@1 { action = "expect-can"; };
            }; };"#,
        );
        assert!(runner.contains("lq_hil_tester_wait_can(&msg_0, 150)"));
        assert!(runner.contains("uint32_t pgn_0 = (msg_0.can_id >> 8) & 0x3FFFF;"));
        assert!(runner.contains("if (pgn_0 != 65265u) {"));
        assert!(runner.contains("lq_hil_tester_wait_can(&msg_1, 1000)"));
        assert!(!runner.contains("pgn_1"));
    }

    #[test]
    fn j1939_injection_builds_the_identifier() {
        let runner = compile(
            r#"hil-test-tx { sequence { step@0 { action = "inject-can-pgn"; pgn = <61444>; data = <0x10 0x20>; }; }; };"#,
        );
        assert!(runner.contains("uint32_t id_0 = lq_j1939_build_id_from_pgn(61444u, 6, 0x28);"));
        assert!(runner.contains("static const uint8_t data_0[8] = {0x10, 0x20};"));
        assert!(runner.contains("lq_hil_tester_inject_can(id_0, true, data_0, 2)"));
    }

    #[test]
    fn latency_and_gpio_steps() {
        let runner = compile(
            r#"hil-test-lat { sequence {
                step@0 { action = "measure-latency"; max-latency-us = <8000>; };
                step@1 { action = "wait-gpio-low"; pin = <7>; timeout-ms = <20>; };
            }; };"#,
        );
        assert!(runner.contains("uint64_t start_0 = lq_hil_get_timestamp_us();"));
        assert!(runner.contains("if (latency_0 > 8000u) {"));
        assert!(runner.contains("lq_hil_tester_wait_gpio(NULL, 7, 0, 20)"));
    }

    #[test]
    fn empty_suite_still_compiles() {
        let runner = compile_harness(&[], &banner());
        assert!(runner.contains("printf(\"1..0\\n\");"));
        assert!(runner.starts_with("/*\n * AUTO-GENERATED FILE - DO NOT EDIT\n"));
    }
}
