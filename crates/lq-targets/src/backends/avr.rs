//! Bare-metal register backend.
//!
//! There is a single ADC and a single SPI vector, so multiple inputs on one of
//! them are served round-robin from the shared handler.

use lq_core::HwBus;

use super::{init_open, init_section, push};
use crate::input::{on_bus, HwInput};
use crate::platform::{Platform, PlatformBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct Avr;

impl PlatformBackend for Avr {
    fn platform(&self) -> Platform {
        Platform::Avr
    }

    fn platform_header(&self) -> String {
        "/* Bare-metal register access */\n\
         #include <stdint.h>\n\
         #include \"lq_platform.h\"\n\
         #include \"lq_hw_input.h\"\n\
         \n\
         /* Peripheral base addresses; adjust for the part in use */\n\
         #define ADC_BASE    0x40012000\n\
         #define SPI_BASE    0x40013000\n\
         \n\
         #define ADC_SR      (*(volatile uint32_t *)(ADC_BASE + 0x00))\n\
         #define ADC_CR1     (*(volatile uint32_t *)(ADC_BASE + 0x04))\n\
         #define ADC_CR2     (*(volatile uint32_t *)(ADC_BASE + 0x08))\n\
         #define ADC_SQR3    (*(volatile uint32_t *)(ADC_BASE + 0x34))\n\
         #define ADC_DR      (*(volatile uint32_t *)(ADC_BASE + 0x4C))\n\
         \n\
         #define SPI_CR1     (*(volatile uint32_t *)(SPI_BASE + 0x00))\n\
         #define SPI_SR      (*(volatile uint32_t *)(SPI_BASE + 0x08))\n\
         #define SPI_DR      (*(volatile uint32_t *)(SPI_BASE + 0x0C))\n"
            .to_string()
    }

    fn isr_wrapper(&self, input: &HwInput) -> Option<String> {
        let name = &input.name;
        match input.bus {
            HwBus::Adc | HwBus::Spi => Some(format!(
                "/* {bus} sample for {name} */\n\
                 static void lq_{bus}_sample_{name}(uint16_t value)\n\
                 {{\n    {push}\n}}\n",
                bus = input.bus,
                push = push(input, "value"),
            )),
            HwBus::Gpio => Some(format!(
                "/* GPIO level for {name} */\n\
                 void lq_gpio_read_{name}(void)\n\
                 {{\n    \
                     uint32_t level = (GPIO{port}->IDR >> {pin}) & 1u;\n    \
                     {push}\n\
                 }}\n",
                port = input.port_or("A"),
                pin = input.pin_or(0),
                push = push(input, "level"),
            )),
            _ => None,
        }
    }

    fn shared_handlers(&self, inputs: &[HwInput]) -> Option<String> {
        let mut code = String::new();

        let adc = on_bus(inputs, HwBus::Adc);
        if !adc.is_empty() {
            code.push_str(&scan_table("adc", &adc, |i| i.channel_or(0)));
            code.push_str(&irq_handler(
                "ADC_IRQHandler",
                "ADC_SR & 0x02",
                "ADC_DR",
                "adc",
                &adc,
                Some("ADC_SQR3 = lq_adc_channels[lq_adc_next];\n    ADC_CR2 |= (1u << 30);  /* next conversion */"),
            ));
        }

        let spi = on_bus(inputs, HwBus::Spi);
        if !spi.is_empty() {
            if !code.is_empty() {
                code.push('\n');
            }
            code.push_str(&irq_handler(
                "SPI_IRQHandler",
                "SPI_SR & 0x01",
                "SPI_DR",
                "spi",
                &spi,
                None,
            ));
        }

        (!code.is_empty()).then_some(code)
    }

    fn peripheral_init(&self, inputs: &[HwInput]) -> String {
        let adc = on_bus(inputs, HwBus::Adc);
        let spi = on_bus(inputs, HwBus::Spi);
        let gpio = on_bus(inputs, HwBus::Gpio);
        let i2c = on_bus(inputs, HwBus::I2c);
        let uart = on_bus(inputs, HwBus::Uart);

        let mut code = init_open("Bare-metal");

        if !gpio.is_empty() {
            init_section(&mut code, "GPIO (input, pull-up)");
            for input in gpio {
                let port = input.port_or("A");
                let pin = input.pin_or(0);
                code.push_str(&format!(
                    "    GPIO{port}->CRL &= ~(0xFu << ({pin} * 4));\n    \
                     GPIO{port}->CRL |= (0x8u << ({pin} * 4));\n"
                ));
            }
        }

        if !adc.is_empty() {
            init_section(&mut code, "ADC");
            code.push_str(
                "    ADC_CR1 = 0x00000120;  /* EOC interrupt, scan */\n    \
                 ADC_SQR3 = lq_adc_channels[0];\n    \
                 ADC_CR2 = 0x00000001;  /* ADON */\n    \
                 ADC_CR2 |= (1u << 30);  /* SWSTART */\n",
            );
        }

        if !i2c.is_empty() {
            init_section(&mut code, "I2C");
            code.push_str(
                "    I2C1->CR1 = 0x0000;\n    \
                 I2C1->CR2 = 0x0024;\n    \
                 I2C1->CCR = 0x00B4;  /* 100 kHz */\n    \
                 I2C1->TRISE = 0x0025;\n    \
                 I2C1->CR1 = 0x0001;\n",
            );
        }

        if !spi.is_empty() {
            init_section(&mut code, "SPI");
            code.push_str("    SPI_CR1 = 0x0344;  /* master, RXNE interrupt, enabled */\n");
        }

        if !uart.is_empty() {
            init_section(&mut code, "UART");
            code.push_str(
                "    USART1->BRR = 0x0271;  /* 115200 baud */\n    \
                 USART1->CR1 = 0x200C;\n",
            );
        }

        if !adc.is_empty() || !spi.is_empty() {
            init_section(&mut code, "NVIC");
            if !adc.is_empty() {
                code.push_str("    NVIC_EnableIRQ(ADC_IRQn);\n");
            }
            if !spi.is_empty() {
                code.push_str("    NVIC_EnableIRQ(SPI1_IRQn);\n");
            }
        }

        code.push_str("}\n");
        code
    }
}

/// Channel table for a round-robin ADC scan.
fn scan_table(bus: &str, inputs: &[&HwInput], channel: impl Fn(&HwInput) -> i64) -> String {
    let channels: Vec<String> = inputs.iter().map(|i| channel(i).to_string()).collect();
    format!(
        "static const uint8_t lq_{bus}_channels[{}] = {{{}}};\n",
        inputs.len(),
        channels.join(", ")
    )
}

/// A vector handler that hands each sample to the next input in turn.
fn irq_handler(
    vector: &str,
    ready: &str,
    data: &str,
    bus: &str,
    inputs: &[&HwInput],
    rearm: Option<&str>,
) -> String {
    let mut code = format!("static uint8_t lq_{bus}_next;\n\n");
    code.push_str(&format!(
        "void {vector}(void)\n{{\n    \
             if (!({ready})) {{\n        \
                 return;\n    \
             }}\n    \
             uint16_t value = (uint16_t){data};\n    \
             switch (lq_{bus}_next) {{\n"
    ));
    for (slot, input) in inputs.iter().enumerate() {
        code.push_str(&format!(
            "    case {slot}: lq_{bus}_sample_{}(value); break;\n",
            input.name
        ));
    }
    code.push_str(&format!(
        "    default: break;\n    \
         }}\n    \
         lq_{bus}_next = (uint8_t)((lq_{bus}_next + 1) % {});\n",
        inputs.len()
    ));
    if let Some(rearm) = rearm {
        code.push_str(&format!("    {rearm}\n"));
    }
    code.push_str("}\n");
    code
}
