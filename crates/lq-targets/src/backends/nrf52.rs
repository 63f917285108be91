//! Nordic nRF52 backend on nRF5 SDK legacy drivers.
//!
//! SAADC and SPI each take a single event handler at init time, so those two
//! are emitted as shared handlers. CAN goes through an external MCP2515.

use lq_core::HwBus;

use super::{init_open, init_section, le_i32, push};
use crate::input::{on_bus, HwInput};
use crate::platform::{Platform, PlatformBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct Nrf52;

impl PlatformBackend for Nrf52 {
    fn platform(&self) -> Platform {
        Platform::Nrf52
    }

    fn platform_header(&self) -> String {
        "/* Nordic nRF5 SDK */\n\
         #include \"nrf_drv_saadc.h\"\n\
         #include \"nrf_drv_spi.h\"\n\
         #include \"nrf_drv_twi.h\"\n\
         #include \"nrf_drv_uart.h\"\n\
         #include \"nrf_drv_can.h\"  /* MCP2515 over SPI */\n\
         #include \"nrf_gpio.h\"\n\
         #include \"app_error.h\"\n\
         #include \"lq_platform.h\"\n\
         #include \"lq_hw_input.h\"\n"
            .to_string()
    }

    fn isr_wrapper(&self, input: &HwInput) -> Option<String> {
        let name = &input.name;
        let code = match input.bus {
            HwBus::Adc | HwBus::Spi => format!(
                "/* {bus} sample for {name} */\n\
                 static void lq_{bus}_sample_{name}(uint16_t value)\n\
                 {{\n    {push}\n}}\n",
                bus = input.bus,
                push = push(input, "value"),
            ),
            HwBus::Can => format!(
                "/* MCP2515 receive for {name} (PGN {pgn}) */\n\
                 void lq_can_receive_{name}(void)\n\
                 {{\n    \
                     uint8_t frame[13];\n    \
                     if (nrf_drv_can_read_message(frame, sizeof(frame)) != NRF_SUCCESS) {{\n        \
                         return;\n    \
                     }}\n    \
                     uint32_t id = ((uint32_t)frame[0] << 24) | ((uint32_t)frame[1] << 16) | ((uint32_t)frame[2] << 8) | frame[3];\n    \
                     if (((id >> 8) & 0x3FFFF) == {pgn}u) {{\n        \
                         int32_t value = {value};\n        \
                         {push}\n    \
                     }}\n\
                 }}\n",
                pgn = input.pgn_or_zero(),
                value = le_i32("frame", 5),
                push = push(input, "value"),
            ),
            HwBus::Gpio => format!(
                "/* GPIO level for {name} */\n\
                 void lq_gpio_read_{name}(void)\n\
                 {{\n    \
                     uint32_t level = nrf_gpio_pin_read({pin});\n    \
                     {push}\n\
                 }}\n",
                pin = input.pin_or(0),
                push = push(input, "level"),
            ),
            HwBus::I2c | HwBus::Uart | HwBus::Sensor => return None,
        };
        Some(code)
    }

    fn shared_handlers(&self, inputs: &[HwInput]) -> Option<String> {
        let mut code = String::new();

        let adc = on_bus(inputs, HwBus::Adc);
        if !adc.is_empty() {
            code.push_str(&format!(
                "static nrf_saadc_value_t adc_buffer[{}];\n\n\
                 /* SAADC conversion done: one buffer slot per channel */\n\
                 static void saadc_callback(nrf_drv_saadc_evt_t const *p_event)\n\
                 {{\n    \
                     if (p_event->type != NRF_DRV_SAADC_EVT_DONE) {{\n        \
                         return;\n    \
                     }}\n",
                adc.len()
            ));
            for (slot, input) in adc.iter().enumerate() {
                code.push_str(&format!(
                    "    lq_adc_sample_{}((uint16_t)p_event->data.done.p_buffer[{slot}]);\n",
                    input.name
                ));
            }
            code.push_str(&format!(
                "    nrf_drv_saadc_buffer_convert(p_event->data.done.p_buffer, {});\n}}\n",
                adc.len()
            ));
        }

        let spi = on_bus(inputs, HwBus::Spi);
        if !spi.is_empty() {
            if !code.is_empty() {
                code.push('\n');
            }
            code.push_str(
                "static const nrf_drv_spi_t spi = NRF_DRV_SPI_INSTANCE(0);\n\n\
                 /* SPI transfer done */\n\
                 static void spi_event_handler(nrf_drv_spi_evt_t const *p_event, void *p_context)\n\
                 {\n    \
                     (void)p_context;\n    \
                     if (p_event->type != NRF_DRV_SPI_EVENT_DONE) {\n        \
                         return;\n    \
                     }\n    \
                     uint16_t value = (uint16_t)((p_event->data.done.p_rx_buffer[0] << 8) | p_event->data.done.p_rx_buffer[1]);\n",
            );
            for input in spi {
                code.push_str(&format!("    lq_spi_sample_{}(value);\n", input.name));
            }
            code.push_str("}\n");
        }

        (!code.is_empty()).then_some(code)
    }

    fn peripheral_init(&self, inputs: &[HwInput]) -> String {
        let mut code = init_open("nRF52");
        code.push_str("    ret_code_t err_code;\n");

        let gpio = on_bus(inputs, HwBus::Gpio);
        if !gpio.is_empty() {
            init_section(&mut code, "GPIO");
            for input in gpio {
                code.push_str(&format!(
                    "    nrf_gpio_cfg_input({}, NRF_GPIO_PIN_PULLUP);\n",
                    input.pin_or(0)
                ));
            }
        }

        let adc = on_bus(inputs, HwBus::Adc);
        if !adc.is_empty() {
            init_section(&mut code, "SAADC");
            code.push_str(
                "    nrf_saadc_channel_config_t channel_config =\n        \
                     NRF_DRV_SAADC_DEFAULT_CHANNEL_CONFIG_SE(NRF_SAADC_INPUT_AIN0);\n    \
                 err_code = nrf_drv_saadc_init(NULL, saadc_callback);\n    \
                 APP_ERROR_CHECK(err_code);\n",
            );
            for (slot, input) in adc.iter().enumerate() {
                code.push_str(&format!(
                    "    channel_config.pin_p = NRF_SAADC_INPUT_AIN{};\n    \
                     err_code = nrf_drv_saadc_channel_init({slot}, &channel_config);\n    \
                     APP_ERROR_CHECK(err_code);\n",
                    input.channel_or(0)
                ));
            }
            code.push_str(&format!(
                "    err_code = nrf_drv_saadc_buffer_convert(adc_buffer, {});\n    \
                 APP_ERROR_CHECK(err_code);\n",
                adc.len()
            ));
        }

        let i2c = on_bus(inputs, HwBus::I2c);
        if let Some(first) = i2c.first() {
            init_section(&mut code, "TWI (I2C)");
            code.push_str(&format!(
                "    static const nrf_drv_twi_t m_twi = NRF_DRV_TWI_INSTANCE({});\n    \
                 nrf_drv_twi_config_t twi_config = NRF_DRV_TWI_DEFAULT_CONFIG;\n    \
                 twi_config.scl = 27;\n    \
                 twi_config.sda = 26;\n    \
                 twi_config.frequency = NRF_DRV_TWI_FREQ_100K;\n    \
                 err_code = nrf_drv_twi_init(&m_twi, &twi_config, NULL, NULL);\n    \
                 APP_ERROR_CHECK(err_code);\n    \
                 nrf_drv_twi_enable(&m_twi);\n",
                first.instance_or(0)
            ));
        }

        let uart = on_bus(inputs, HwBus::Uart);
        if let Some(first) = uart.first() {
            init_section(&mut code, "UART");
            code.push_str(&format!(
                "    static const nrf_drv_uart_t m_uart = NRF_DRV_UART_INSTANCE({});\n    \
                 nrf_drv_uart_config_t uart_config = NRF_DRV_UART_DEFAULT_CONFIG;\n    \
                 uart_config.pseltxd = 6;\n    \
                 uart_config.pselrxd = 8;\n    \
                 uart_config.baudrate = NRF_UART_BAUDRATE_115200;\n    \
                 err_code = nrf_drv_uart_init(&m_uart, &uart_config, NULL);\n    \
                 APP_ERROR_CHECK(err_code);\n",
                first.instance_or(0)
            ));
        }

        if !on_bus(inputs, HwBus::Spi).is_empty() {
            init_section(&mut code, "SPI");
            code.push_str(
                "    nrf_drv_spi_config_t spi_config = NRF_DRV_SPI_DEFAULT_CONFIG;\n    \
                 spi_config.ss_pin = 4;\n    \
                 spi_config.miso_pin = 28;\n    \
                 spi_config.mosi_pin = 29;\n    \
                 spi_config.sck_pin = 3;\n    \
                 err_code = nrf_drv_spi_init(&spi, &spi_config, spi_event_handler, NULL);\n    \
                 APP_ERROR_CHECK(err_code);\n",
            );
        }

        code.push_str("    (void)err_code;\n}\n");
        code
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn saadc_callback_serves_every_channel() {
        let inputs = inputs(TWO_ADC);
        let shared = Nrf52.shared_handlers(&inputs).unwrap();
        assert_eq!(shared.matches("static void saadc_callback").count(), 1);
        assert!(shared.contains("lq_adc_sample_a((uint16_t)p_event->data.done.p_buffer[0]);"));
        assert!(shared.contains("lq_adc_sample_b((uint16_t)p_event->data.done.p_buffer[1]);"));

        let wrapper = Nrf52.isr_wrapper(&inputs[1]).unwrap();
        assert!(wrapper.contains("static void lq_adc_sample_b(uint16_t value)"));
        assert!(wrapper.contains("lq_hw_push(1, (uint32_t)value);"));
    }

    #[test]
    fn init_uses_one_saadc_slot_per_input() {
        let init = Nrf52.peripheral_init(&inputs(TWO_ADC));
        assert!(init.contains("nrf_drv_saadc_channel_init(1, &channel_config);"));
        assert!(init.contains("nrf_drv_saadc_buffer_convert(adc_buffer, 2);"));
        assert!(!init.contains("nrf_drv_spi_init"));
    }
}
