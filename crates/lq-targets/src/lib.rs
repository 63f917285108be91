//! Platform backend generators.
//!
//! One backend per supported microcontroller family, selected by the closed
//! [`Platform`] enumeration. Each backend turns the resolved hardware inputs
//! into interrupt or read wrappers and peripheral bring-up code; every wrapper
//! ends in the same `lq_hw_push(signal, value)` call, so nothing upstream of
//! this crate depends on the target.
//!
//! ## Modules
//!
//! - [`platform`]: platform enumeration and the [`PlatformBackend`] trait
//! - [`input`]: the hardware-input view backends consume
//! - [`backends`]: STM32, SAMD, ESP32, nRF52 and bare-metal AVR
//! - [`source`]: full platform source assembly

pub mod backends;
pub mod error;
pub mod input;
pub mod platform;
pub mod source;

pub use error::TargetError;
pub use input::HwInput;
pub use platform::{Platform, PlatformBackend};
pub use source::platform_source;
