//! Microchip SAMD backend on ASF4 drivers generated by Atmel START.

use lq_core::HwBus;

use super::{init_open, init_section, push};
use crate::input::{on_bus, HwInput};
use crate::platform::{Platform, PlatformBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct Samd;

impl PlatformBackend for Samd {
    fn platform(&self) -> Platform {
        Platform::Samd
    }

    fn platform_header(&self) -> String {
        "/* Atmel SAMD ASF4 */\n\
         #include \"atmel_start.h\"\n\
         #include \"hal_adc_sync.h\"\n\
         #include \"hal_spi_m_sync.h\"\n\
         #include \"hal_i2c_m_sync.h\"\n\
         #include \"hal_usart_sync.h\"\n\
         #include \"lq_platform.h\"\n\
         #include \"lq_hw_input.h\"\n\
         \n\
         /* Descriptors from Atmel START */\n\
         extern struct adc_sync_descriptor ADC_0;\n\
         extern struct spi_m_sync_descriptor SPI_0;\n\
         extern struct i2c_m_sync_desc I2C_0;\n\
         extern struct usart_sync_descriptor USART_0;\n"
            .to_string()
    }

    fn isr_wrapper(&self, input: &HwInput) -> Option<String> {
        let name = &input.name;
        let code = match input.bus {
            HwBus::Adc => {
                let ch = input.channel_or(0);
                format!(
                    "/* ADC read for {name} on channel {ch} */\n\
                     void lq_adc_read_{name}(void)\n\
                     {{\n    \
                         uint8_t buffer[2];\n    \
                         adc_sync_set_inputs(&ADC_0, {ch}, ADC_MUXNEG_GND, {ch});\n    \
                         adc_sync_read_channel(&ADC_0, {ch}, buffer, 2);\n    \
                         uint16_t value = (uint16_t)((buffer[1] << 8) | buffer[0]);\n    \
                         {push}\n\
                     }}\n",
                    push = push(input, "value"),
                )
            }
            HwBus::Spi => format!(
                "/* SPI read for {name} */\n\
                 void lq_spi_read_{name}(void)\n\
                 {{\n    \
                     uint8_t rx[2];\n    \
                     struct spi_xfer xfer = {{ .txbuf = NULL, .rxbuf = rx, .size = 2 }};\n    \
                     spi_m_sync_transfer(&SPI_0, &xfer);\n    \
                     uint16_t value = (uint16_t)((rx[1] << 8) | rx[0]);\n    \
                     {push}\n\
                 }}\n",
                push = push(input, "value"),
            ),
            HwBus::Gpio => format!(
                "/* GPIO level for {name} */\n\
                 void lq_gpio_read_{name}(void)\n\
                 {{\n    \
                     bool level = gpio_get_pin_level({pin});\n    \
                     {push}\n\
                 }}\n",
                pin = input.pin_or(0),
                push = push(input, "level"),
            ),
            HwBus::I2c => format!(
                "/* I2C read for {name} */\n\
                 void lq_i2c_read_{name}(void)\n\
                 {{\n    \
                     uint8_t rx[2];\n    \
                     struct _i2c_m_msg msg = {{ .addr = 0x{addr:02X}, .flags = I2C_M_RD | I2C_M_STOP, .len = 2, .buffer = rx }};\n    \
                     if (i2c_m_sync_transfer(&I2C_0, &msg) == 0) {{\n        \
                         uint16_t value = (uint16_t)((rx[0] << 8) | rx[1]);\n        \
                         {push}\n    \
                     }}\n\
                 }}\n",
                addr = input.i2c_address.unwrap_or(0x50),
                push = push(input, "value"),
            ),
            HwBus::Uart => format!(
                "/* UART byte for {name} */\n\
                 void lq_uart_read_{name}(void)\n\
                 {{\n    \
                     uint8_t value;\n    \
                     if (io_read(&USART_0.io, &value, 1) == 1) {{\n        \
                         {push}\n    \
                     }}\n\
                 }}\n",
                push = push(input, "value"),
            ),
            HwBus::Can | HwBus::Sensor => return None,
        };
        Some(code)
    }

    fn peripheral_init(&self, inputs: &[HwInput]) -> String {
        let mut code = init_open("SAMD");
        code.push_str("    /* atmel_start_init() must run before this */\n");

        let gpio = on_bus(inputs, HwBus::Gpio);
        if !gpio.is_empty() {
            init_section(&mut code, "GPIO");
            for input in gpio {
                code.push_str(&format!(
                    "    gpio_set_pin_direction({}, GPIO_DIRECTION_IN);\n",
                    input.pin_or(0)
                ));
            }
        }

        let adc = on_bus(inputs, HwBus::Adc);
        if !adc.is_empty() {
            init_section(&mut code, "ADC");
            let mut channels: Vec<i64> = adc.iter().map(|i| i.channel_or(0)).collect();
            channels.sort_unstable();
            channels.dedup();
            for ch in channels {
                code.push_str(&format!("    adc_sync_enable_channel(&ADC_0, {ch});\n"));
            }
        }

        if !on_bus(inputs, HwBus::Spi).is_empty() {
            init_section(&mut code, "SPI");
            code.push_str("    spi_m_sync_enable(&SPI_0);\n");
        }

        if !on_bus(inputs, HwBus::I2c).is_empty() {
            init_section(&mut code, "I2C");
            code.push_str("    i2c_m_sync_enable(&I2C_0);\n");
        }

        if !on_bus(inputs, HwBus::Uart).is_empty() {
            init_section(&mut code, "UART");
            code.push_str("    usart_sync_enable(&USART_0);\n");
        }

        code.push_str("}\n");
        code
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn adc_channels_are_enabled_once() {
        let init = Samd.peripheral_init(&inputs(TWO_ADC));
        assert!(init.contains("adc_sync_enable_channel(&ADC_0, 0);"));
        assert!(init.contains("adc_sync_enable_channel(&ADC_0, 1);"));
        assert!(!init.contains("spi_m_sync_enable"));
    }

    #[test]
    fn wrapper_reads_the_configured_channel() {
        let inputs = inputs(EVERY_BUS);
        let adc = Samd.isr_wrapper(&inputs[0]).unwrap();
        assert!(adc.contains("adc_sync_read_channel(&ADC_0, 3, buffer, 2);"));
        assert!(adc.contains("lq_hw_push(0, (uint32_t)value);"));
        assert!(Samd.isr_wrapper(&inputs[2]).is_none());
    }
}
