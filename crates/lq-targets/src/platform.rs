//! Platform selection and the backend capability set.
//!
//! The set of targets is closed: [`Platform`] names every backend the tool
//! ships with, and [`Platform::backend`] hands out the matching
//! [`PlatformBackend`] value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backends::{Avr, Esp32, Nrf52, Samd, Stm32};
use crate::error::{Result, TargetError};
use crate::input::HwInput;

/// A supported microcontroller family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Stm32,
    Samd,
    Esp32,
    Nrf52,
    Avr,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Stm32,
        Platform::Samd,
        Platform::Esp32,
        Platform::Nrf52,
        Platform::Avr,
    ];

    /// Name accepted by `--platform`, also used in the artifact file name.
    pub fn name(self) -> &'static str {
        match self {
            Platform::Stm32 => "stm32",
            Platform::Samd => "samd",
            Platform::Esp32 => "esp32",
            Platform::Nrf52 => "nrf52",
            Platform::Avr => "avr",
        }
    }

    /// One-line description for `lqc targets`.
    pub fn description(self) -> &'static str {
        match self {
            Platform::Stm32 => "STMicroelectronics STM32 (HAL)",
            Platform::Samd => "Microchip SAMD (ASF4 / Atmel START)",
            Platform::Esp32 => "Espressif ESP32 (ESP-IDF)",
            Platform::Nrf52 => "Nordic nRF52 (nRF5 SDK)",
            Platform::Avr => "AVR and bare-metal register access",
        }
    }

    /// Comma-separated list of every platform name.
    pub fn supported() -> String {
        Platform::ALL
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// File name of the generated backend source.
    pub fn artifact_name(self) -> String {
        format!("lq_platform_{}.c", self.name())
    }

    /// The backend implementing this platform.
    pub fn backend(self) -> &'static dyn PlatformBackend {
        match self {
            Platform::Stm32 => &Stm32,
            Platform::Samd => &Samd,
            Platform::Esp32 => &Esp32,
            Platform::Nrf52 => &Nrf52,
            Platform::Avr => &Avr,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = TargetError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        Platform::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TargetError::UnknownPlatform {
                name: s.to_string(),
                supported: Platform::supported(),
            })
    }
}

/// Code generation for one microcontroller family.
///
/// Every wrapper a backend emits must deliver its sample through
/// `lq_hw_push(<signal>, (uint32_t)value)`; only the register or HAL plumbing
/// around that call differs per target.
pub trait PlatformBackend {
    fn platform(&self) -> Platform;

    /// Includes, handle declarations and register definitions.
    fn platform_header(&self) -> String;

    /// Read or receive routine for one input. `None` when this platform has
    /// no wrapper for the input's bus.
    fn isr_wrapper(&self, input: &HwInput) -> Option<String>;

    /// `lq_platform_peripherals_init()`, configuring only the peripheral
    /// families present in `inputs`.
    fn peripheral_init(&self, inputs: &[HwInput]) -> String;

    /// Vendor callbacks that may be defined only once per program and
    /// therefore serve every input of a bus at once.
    fn shared_handlers(&self, _inputs: &[HwInput]) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("stm32".parse::<Platform>().unwrap(), Platform::Stm32);
        assert_eq!("ESP32".parse::<Platform>().unwrap(), Platform::Esp32);
        assert_eq!("nRF52".parse::<Platform>().unwrap(), Platform::Nrf52);
    }

    #[test]
    fn unknown_platform_lists_supported_names() {
        let err = "unknown-target".parse::<Platform>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown platform: unknown-target (supported: stm32, samd, esp32, nrf52, avr)"
        );
    }

    #[test]
    fn every_platform_has_its_own_backend() {
        for p in Platform::ALL {
            assert_eq!(p.backend().platform(), p);
            assert_eq!(p.name().parse::<Platform>().unwrap(), p);
        }
        assert_eq!(Platform::Avr.artifact_name(), "lq_platform_avr.c");
    }
}
