//! lqc: compiler for layered-queue engine descriptions.

mod commands;
mod manifest;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};

use commands::compile::CompileOptions;
use commands::eds::EdsOptions;
use manifest::Project;

/// Exit status for path and argument problems.
const EXIT_USAGE: i32 = 1;
/// Exit status for parse, resolution and generation failures.
const EXIT_COMPILE: i32 = 2;

#[derive(Parser)]
#[command(name = "lqc", version, about = "Layered-queue description compiler")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a description into engine, platform and HIL artifacts
    Compile {
        /// Input description (.dts)
        input: PathBuf,
        /// Directory receiving the generated files
        output_dir: PathBuf,
        /// Platform backend to generate (stm32, samd, esp32, nrf52, avr)
        #[arg(long)]
        platform: Option<String>,
        /// Only splice EDS devices into the description and stop
        #[arg(long)]
        expand_eds: bool,
        /// Write SIG_<NAME> definitions for imported PDO signals
        #[arg(long)]
        signals_header: Option<PathBuf>,
        /// Skip the HIL test description and runner
        #[arg(long)]
        no_hil: bool,
    },
    /// Summarize a CANopen EDS file
    Eds {
        /// EDS file
        file: PathBuf,
        /// Node id used for COB-IDs (default 5)
        #[arg(long)]
        node_id: Option<u8>,
        /// Print the full object dictionary
        #[arg(long)]
        list_objects: bool,
        /// Write SIG_<NAME> definitions for the PDO signals
        #[arg(long)]
        signals_header: Option<PathBuf>,
    },
    /// Compile a HIL test description into a TAP runner
    Hil {
        /// Test description (.dts)
        input: PathBuf,
        /// Directory receiving lq_hil_runner.c
        output_dir: PathBuf,
    },
    /// List the built-in platform backends
    Targets,
    /// Show resolved signals and resource counts without writing files
    Inspect {
        /// Input description (.dts)
        input: PathBuf,
        /// Output format (text, json)
        #[arg(long)]
        format: Option<String>,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(exit_code(&e));
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Map a failure to its exit status by what the error chain contains.
fn exit_code(e: &anyhow::Error) -> i32 {
    let compile_failure = e.chain().any(|cause| {
        cause.is::<lq_dts::ParseError>()
            || cause.is::<lq_resolve::ResolveError>()
            || cause.is::<lq_materialize::MaterializationError>()
            || cause.is::<lq_targets::TargetError>()
            || cause.is::<lq_hil::HilError>()
    });
    if compile_failure {
        EXIT_COMPILE
    } else {
        EXIT_USAGE
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Compile {
            input,
            output_dir,
            platform,
            expand_eds,
            signals_header,
            no_hil,
        } => {
            let project = Project::for_input(&input)?;
            let options = CompileOptions {
                platform,
                expand_eds,
                signals_header,
                hil: !no_hil,
                ..CompileOptions::default()
            }
            .with_project(project.as_ref());
            commands::compile::run(&input, &output_dir, &options).map(|_| ())
        }

        Commands::Eds {
            file,
            node_id,
            list_objects,
            signals_header,
        } => commands::eds::run(
            &file,
            &EdsOptions {
                node_id,
                list_objects,
                signals_header,
            },
        ),

        Commands::Hil { input, output_dir } => {
            commands::hil::run(&input, &output_dir).map(|_| ())
        }

        Commands::Targets => commands::targets::list(),

        Commands::Inspect { input, format } => {
            let depth = Project::for_input(&input)?
                .and_then(|p| p.manifest.compile.ring_buffer_depth);
            commands::inspect::run(&input, format.as_deref(), depth)
        }
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use lq_materialize::codegen::{GENERATED_HEADER, GENERATED_SOURCE, RESOURCE_BOUNDS};

    const DRIVE_EDS: &str = include_str!("../../../crates/lq-eds/testdata/drive.eds");

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }

    fn options() -> CompileOptions {
        CompileOptions {
            hil: true,
            ..CompileOptions::default()
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// One input, one cyclic output, default identities.
    #[test]
    fn scenario_single_input_single_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "ecu.dts",
            r#"/dts-v1/;
/ {
    rpm: adc@0 { compatible = "lq,hw-adc-input"; };
    rpm_out { compatible = "lq,cyclic-output"; source = <&rpm>; period-us = <100000>; };
};
"#,
        );
        let out = dir.path().join("gen");
        commands::compile::run(&input, &out, &options()).unwrap();

        assert_eq!(
            file_names(&out),
            vec![
                GENERATED_SOURCE,
                GENERATED_HEADER,
                "lq_hil_runner.c",
                "lq_hil_tests.dts",
                RESOURCE_BOUNDS,
            ]
        );
        let bounds = read(&out, RESOURCE_BOUNDS);
        assert!(bounds.contains("#define LQ_MAX_SIGNALS 1\n"));
        assert!(bounds.contains("#define LQ_MAX_CYCLIC_OUTPUTS 1\n"));
        assert!(bounds.contains("#define LQ_NUM_MERGES 0\n"));
        assert!(bounds
            .lines()
            .filter(|l| l.starts_with("#define LQ_MAX_"))
            .all(|l| !l.ends_with(" 0")));
        let source = read(&out, GENERATED_SOURCE);
        assert!(source.contains(".source_signal = 0,"));
        assert!(source.contains(".period_us = 100000,"));

        let tests = lq_hil::parse_suite(&read(&out, "lq_hil_tests.dts")).unwrap();
        assert_eq!(tests[0].name, "hil-test-all-nominal");
    }

    /// Merge inputs keep reference order.
    #[test]
    fn scenario_three_way_merge() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "merge.dts",
            r#"/ {
    a: adc@0 { compatible = "lq,hw-adc-input"; };
    b: adc@1 { compatible = "lq,hw-adc-input"; };
    c: adc@2 { compatible = "lq,hw-adc-input"; };
    vote: merge { compatible = "lq,mid-merge"; inputs = <&c &a &b>; };
};
"#,
        );
        let out = dir.path().join("gen");
        commands::compile::run(&input, &out, &options()).unwrap();
        let source = read(&out, GENERATED_SOURCE);
        assert!(source.contains(".input_signals = {2, 0, 1},"));
        assert!(source.contains(".num_inputs = 3,"));
    }

    /// A dangling reference exits 2, names the label and writes nothing.
    #[test]
    fn scenario_dangling_reference() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "bad.dts",
            r#"/ { out { compatible = "lq,cyclic-output"; source = <&ghost>; }; };"#,
        );
        let out = dir.path().join("gen");
        let err = commands::compile::run(&input, &out, &options()).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_COMPILE);
        let message = format!("{err:#}");
        assert!(message.contains("ghost"));
        assert!(message.contains("'out'"));
        assert!(!out.exists());
    }

    /// EDS import with a node-id override.
    #[test]
    fn scenario_eds_node_id_override() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "drive.eds", DRIVE_EDS);
        let input = write(
            dir.path(),
            "bus.dts",
            r#"/ {
    motor: canopen@7 {
        compatible = "lq,protocol-canopen";
        eds-file = "drive.eds";
        node-id = <7>;
    };
};
"#,
        );
        let out = dir.path().join("gen");
        let header = dir.path().join("include").join("lq_signals.h");
        let opts = CompileOptions {
            expand_eds: true,
            signals_header: Some(header.clone()),
            ..options()
        };
        commands::compile::run(&input, &out, &opts).unwrap();

        // --expand-eds stops after the splice.
        assert_eq!(file_names(&out), vec!["bus.expanded.dts"]);
        let expanded = read(&out, "bus.expanded.dts");
        assert!(expanded.contains("cob-id = <391>;"));
        assert!(!expanded.contains("eds-file"));

        let nodes = lq_dts::parse_nodes(&expanded).unwrap();
        let ids: Vec<_> = nodes
            .iter()
            .filter_map(|n| n.properties.int("signal-id"))
            .collect();
        assert_eq!(ids, vec![100, 101]);

        let signals = fs::read_to_string(header).unwrap();
        assert!(signals.contains("SIG_STATUSWORD"));
        assert!(signals.contains("SIG_VELOCITY_ACTUAL_VALUE"));
    }

    /// An unknown platform fails the last stage only.
    #[test]
    fn scenario_unknown_platform_keeps_core_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "ecu.dts",
            r#"/ { rpm: adc@0 { compatible = "lq,hw-adc-input"; }; };"#,
        );
        let out = dir.path().join("gen");
        commands::compile::run(&input, &out, &options()).unwrap();
        let header = read(&out, GENERATED_HEADER);
        let source = read(&out, GENERATED_SOURCE);

        let opts = CompileOptions {
            platform: Some("unknown-target".into()),
            ..options()
        };
        let err = commands::compile::run(&input, &out, &opts).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_COMPILE);
        assert!(format!("{err:#}").contains("unknown platform: unknown-target"));
        assert_eq!(read(&out, GENERATED_HEADER), header);
        assert_eq!(read(&out, GENERATED_SOURCE), source);
        assert!(!file_names(&out).iter().any(|n| n.starts_with("lq_platform_")));
    }

    #[test]
    fn known_platform_adds_backend() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "ecu.dts",
            r#"/ { rpm: adc@0 { compatible = "lq,hw-adc-input"; hw-channel = <3>; }; };"#,
        );
        let out = dir.path().join("gen");
        let opts = CompileOptions {
            platform: Some("STM32".into()),
            hil: false,
            ..CompileOptions::default()
        };
        commands::compile::run(&input, &out, &opts).unwrap();
        let names = file_names(&out);
        assert!(names.contains(&"lq_platform_stm32.c".to_string()));
        assert!(!names.contains(&"lq_hil_runner.c".to_string()));
        assert!(read(&out, "lq_platform_stm32.c").contains("lq_hw_push("));
    }

    #[test]
    fn compiles_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "ecu.dts",
            r#"/ {
    a: adc@0 { compatible = "lq,hw-adc-input"; };
    b: adc@1 { compatible = "lq,hw-adc-input"; };
    m: merge { compatible = "lq,mid-merge"; inputs = <&a &b>; tolerance = <40>; };
    f: fault { compatible = "lq,fault-monitor"; input = <&m>; max-value = <3900>; };
    o { compatible = "lq,cyclic-output"; source = <&m>; output-type = "j1939"; pgn = <65265>; };
};
"#,
        );
        let first = dir.path().join("one");
        let second = dir.path().join("two");
        commands::compile::run(&input, &first, &options()).unwrap();
        commands::compile::run(&input, &second, &options()).unwrap();
        let names = file_names(&first);
        assert_eq!(names, file_names(&second));
        for name in &names {
            assert_eq!(read(&first, name), read(&second, name), "{name}");
        }
    }

    #[test]
    fn project_file_supplies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "lqc.toml",
            "[compile]\nplatform = \"avr\"\nring-buffer-depth = 32\n\n[hil]\nenabled = false\n",
        );
        let input = write(
            dir.path(),
            "ecu.dts",
            r#"/ { rpm: adc@0 { compatible = "lq,hw-adc-input"; }; };"#,
        );
        let project = Project::for_input(&input).unwrap();
        let opts = CompileOptions {
            hil: true,
            ..CompileOptions::default()
        }
        .with_project(project.as_ref());
        assert_eq!(opts.platform.as_deref(), Some("avr"));
        assert!(!opts.hil);

        let out = dir.path().join("gen");
        commands::compile::run(&input, &out, &opts).unwrap();
        assert!(read(&out, RESOURCE_BOUNDS).contains("#define LQ_HW_RINGBUFFER_SIZE 32\n"));
        assert!(out.join("lq_platform_avr.c").is_file());

        // The command line wins over the file.
        let opts = CompileOptions {
            platform: Some("esp32".into()),
            ..CompileOptions::default()
        }
        .with_project(project.as_ref());
        assert_eq!(opts.platform.as_deref(), Some("esp32"));
    }

    #[test]
    fn malformed_project_file_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lqc.toml", "[compile\n");
        let input = write(dir.path(), "ecu.dts", "/ { };");
        let err = Project::for_input(&input).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_USAGE);
    }

    #[test]
    fn missing_input_and_syntax_errors() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gen");
        let err = commands::compile::run(&dir.path().join("nope.dts"), &out, &options())
            .unwrap_err();
        assert_eq!(exit_code(&err), EXIT_USAGE);

        let input = write(dir.path(), "broken.dts", "/ { a { compatible = \"lq,hw-adc-input\"; };");
        let err = commands::compile::run(&input, &out, &options()).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_COMPILE);
        assert!(!out.exists());
    }

    #[test]
    fn unsupported_output_family_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "ecu.dts",
            r#"/ {
    rpm: adc@0 { compatible = "lq,hw-adc-input"; };
    o { compatible = "lq,cyclic-output"; source = <&rpm>; output-type = "flexray"; };
};
"#,
        );
        let out = dir.path().join("gen");
        let err = commands::compile::run(&input, &out, &options()).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_COMPILE);
        assert!(format!("{err:#}").contains("flexray"));
        assert!(!out.exists());
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "lqc",
            "-vv",
            "compile",
            "in.dts",
            "out",
            "--platform=nrf52",
            "--no-hil",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Compile {
                platform, no_hil, ..
            } => {
                assert_eq!(platform.as_deref(), Some("nrf52"));
                assert!(no_hil);
            }
            _ => panic!("expected compile"),
        }
        assert!(Cli::try_parse_from(["lqc", "compile"]).is_err());
    }
}
