//! CANopen object-dictionary import.
//!
//! A description may contain stub nodes of the form
//!
//! ```text
//! motor: canopen@7 {
//!     compatible = "lq,protocol-canopen";
//!     eds-file = "motor.eds";
//!     node-id = <7>;
//! };
//! ```
//!
//! Each stub's EDS file is read, its PDO mappings are decoded, and the stub is
//! replaced by one node per PDO with mapping children that carry reserved
//! signal identities (receive from 0, transmit from 100). A missing or
//! unreadable file is an [`ImportWarning`], never an error.
//!
//! ## Modules
//!
//! - [`ini`]: `[section]` / `Key=Value` reader
//! - [`dictionary`]: device identity and object index
//! - [`pdo`]: mapping decode, COB-IDs, identity reservation
//! - [`project`]: expansion into description blocks
//! - [`splice`]: stub discovery, tree splice and text splice
//! - [`signals`]: `SIG_<NAME>` header

pub mod dictionary;
pub mod error;
pub mod ini;
pub mod pdo;
pub mod project;
pub mod signals;
pub mod splice;

pub use dictionary::{EdsDevice, DEFAULT_NODE_ID};
pub use error::{EdsError, ImportWarning};
pub use pdo::{MappingEntry, Pdo, PdoLayout, SignalBases};
pub use signals::{header_guard, signals_header, DeviceSignals};
pub use splice::{expand_text, import_devices, splice_blocks, splice_nodes, Import};
