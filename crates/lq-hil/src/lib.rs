//! Hardware-in-the-loop testing for layered-queue descriptions.
//!
//! A resolved topology yields a catalogue of test cases, which are written
//! out as a description file and compiled into a C runner that drives the
//! system under test through the HIL tester API and reports TAP.
//!
//! ## Modules
//!
//! - [`suite`]: test cases, typed steps and their description-file form
//! - [`derive`]: automatic case derivation from a topology
//! - [`harness`]: the TAP runner generator

pub mod derive;
pub mod error;
pub mod harness;
pub mod suite;

pub use derive::{derive_tests, DeriveConfig};
pub use error::HilError;
pub use harness::compile_harness;
pub use suite::{parse_suite, tests_from_blocks, write_suite, Action, HilTest, Step};

/// Derived test description.
pub const HIL_TESTS: &str = "lq_hil_tests.dts";
/// Compiled runner source.
pub const HIL_RUNNER: &str = "lq_hil_runner.c";
