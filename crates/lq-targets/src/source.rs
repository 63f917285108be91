//! Assembly of a complete platform source file.

use log::debug;

use crate::input::HwInput;
use crate::platform::Platform;

/// Render `lq_platform_<name>.c` for a set of hardware inputs.
///
/// Layout: `banner`, the generated header include, the platform header, one
/// wrapper per input in declaration order, shared handlers, then
/// `lq_platform_peripherals_init()`.
pub fn platform_source(platform: Platform, inputs: &[HwInput], banner: &str) -> String {
    let backend = platform.backend();
    let mut out = String::from(banner);
    out.push_str("#include \"lq_generated.h\"\n");
    out.push_str(&backend.platform_header());

    let mut wrappers = 0usize;
    for input in inputs {
        if let Some(code) = backend.isr_wrapper(input) {
            out.push('\n');
            out.push_str(&code);
            wrappers += 1;
        }
    }
    if let Some(shared) = backend.shared_handlers(inputs) {
        out.push('\n');
        out.push_str(&shared);
    }
    out.push('\n');
    out.push_str(&backend.peripheral_init(inputs));

    debug!(
        "{platform}: {wrappers} wrapper(s) for {} input(s)",
        inputs.len()
    );
    out
}
