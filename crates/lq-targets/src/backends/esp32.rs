//! ESP32 backend on ESP-IDF drivers.

use lq_core::HwBus;

use super::{init_open, init_section, le_i32, push};
use crate::input::{on_bus, HwInput};
use crate::platform::{Platform, PlatformBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct Esp32;

impl PlatformBackend for Esp32 {
    fn platform(&self) -> Platform {
        Platform::Esp32
    }

    fn platform_header(&self) -> String {
        "/* ESP-IDF */\n\
         #include \"driver/adc.h\"\n\
         #include \"driver/gpio.h\"\n\
         #include \"driver/i2c.h\"\n\
         #include \"driver/spi_master.h\"\n\
         #include \"driver/twai.h\"\n\
         #include \"driver/uart.h\"\n\
         #include \"lq_platform.h\"\n\
         #include \"lq_hw_input.h\"\n\
         \n\
         static spi_device_handle_t spi_handle;\n"
            .to_string()
    }

    fn isr_wrapper(&self, input: &HwInput) -> Option<String> {
        let name = &input.name;
        let code = match input.bus {
            HwBus::Adc => format!(
                "/* ADC read for {name} */\n\
                 void lq_adc_read_{name}(void)\n\
                 {{\n    \
                     int value = adc1_get_raw(ADC1_CHANNEL_{ch});\n    \
                     {push}\n\
                 }}\n",
                ch = input.channel_or(0),
                push = push(input, "value"),
            ),
            HwBus::Spi => format!(
                "/* SPI read for {name} */\n\
                 void lq_spi_read_{name}(void)\n\
                 {{\n    \
                     uint16_t rx = 0;\n    \
                     spi_transaction_t trans = {{ .length = 16, .rxlength = 16, .rx_buffer = &rx }};\n    \
                     if (spi_device_transmit(spi_handle, &trans) == ESP_OK) {{\n        \
                         {push}\n    \
                     }}\n\
                 }}\n",
                push = push(input, "rx"),
            ),
            HwBus::Can => format!(
                "/* TWAI receive for {name} (PGN {pgn}) */\n\
                 void lq_can_receive_{name}(void)\n\
                 {{\n    \
                     twai_message_t msg;\n    \
                     if (twai_receive(&msg, 0) != ESP_OK || !msg.extd || msg.rtr) {{\n        \
                         return;\n    \
                     }}\n    \
                     if (((msg.identifier >> 8) & 0x3FFFF) == {pgn}u) {{\n        \
                         int32_t value = {value};\n        \
                         {push}\n    \
                     }}\n\
                 }}\n",
                pgn = input.pgn_or_zero(),
                value = le_i32("msg.data", 0),
                push = push(input, "value"),
            ),
            HwBus::Gpio => format!(
                "/* GPIO level for {name} */\n\
                 void lq_gpio_read_{name}(void)\n\
                 {{\n    \
                     int level = gpio_get_level(GPIO_NUM_{pin});\n    \
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
                     if (i2c_master_read_from_device(I2C_NUM_{n}, 0x{addr:02X}, rx, 2, 10) == ESP_OK) {{\n        \
                         uint16_t value = (uint16_t)((rx[0] << 8) | rx[1]);\n        \
                         {push}\n    \
                     }}\n\
                 }}\n",
                n = input.instance_or(0),
                addr = input.i2c_address.unwrap_or(0x50),
                push = push(input, "value"),
            ),
            HwBus::Uart => format!(
                "/* UART byte for {name} */\n\
                 void lq_uart_read_{name}(void)\n\
                 {{\n    \
                     uint8_t value;\n    \
                     if (uart_read_bytes(UART_NUM_{n}, &value, 1, 0) == 1) {{\n        \
                         {push}\n    \
                     }}\n\
                 }}\n",
                n = input.instance_or(1),
                push = push(input, "value"),
            ),
            HwBus::Sensor => return None,
        };
        Some(code)
    }

    fn peripheral_init(&self, inputs: &[HwInput]) -> String {
        let mut code = init_open("ESP32");

        let gpio = on_bus(inputs, HwBus::Gpio);
        if !gpio.is_empty() {
            init_section(&mut code, "GPIO");
            for input in gpio {
                let pin = input.pin_or(0);
                code.push_str(&format!(
                    "    gpio_set_direction(GPIO_NUM_{pin}, GPIO_MODE_INPUT);\n    \
                     gpio_set_pull_mode(GPIO_NUM_{pin}, GPIO_PULLUP_ONLY);\n"
                ));
            }
        }

        let adc = on_bus(inputs, HwBus::Adc);
        if !adc.is_empty() {
            init_section(&mut code, "ADC");
            code.push_str("    adc1_config_width(ADC_WIDTH_BIT_12);\n");
            for input in adc {
                code.push_str(&format!(
                    "    adc1_config_channel_atten(ADC1_CHANNEL_{}, ADC_ATTEN_DB_11);\n",
                    input.channel_or(0)
                ));
            }
        }

        let i2c = on_bus(inputs, HwBus::I2c);
        if let Some(first) = i2c.first() {
            let n = first.instance_or(0);
            init_section(&mut code, "I2C");
            code.push_str(&format!(
                "    i2c_config_t i2c_conf = {{\n        \
                     .mode = I2C_MODE_MASTER,\n        \
                     .sda_io_num = GPIO_NUM_21,\n        \
                     .scl_io_num = GPIO_NUM_22,\n        \
                     .sda_pullup_en = GPIO_PULLUP_ENABLE,\n        \
                     .scl_pullup_en = GPIO_PULLUP_ENABLE,\n        \
                     .master.clk_speed = 100000,\n    \
                 }};\n    \
                 i2c_param_config(I2C_NUM_{n}, &i2c_conf);\n    \
                 i2c_driver_install(I2C_NUM_{n}, I2C_MODE_MASTER, 0, 0, 0);\n"
            ));
        }

        let uart = on_bus(inputs, HwBus::Uart);
        if let Some(first) = uart.first() {
            let n = first.instance_or(1);
            init_section(&mut code, "UART");
            code.push_str(&format!(
                "    uart_config_t uart_conf = {{\n        \
                     .baud_rate = 115200,\n        \
                     .data_bits = UART_DATA_8_BITS,\n        \
                     .parity = UART_PARITY_DISABLE,\n        \
                     .stop_bits = UART_STOP_BITS_1,\n        \
                     .flow_ctrl = UART_HW_FLOWCTRL_DISABLE,\n    \
                 }};\n    \
                 uart_param_config(UART_NUM_{n}, &uart_conf);\n    \
                 uart_set_pin(UART_NUM_{n}, 17, 16, UART_PIN_NO_CHANGE, UART_PIN_NO_CHANGE);\n    \
                 uart_driver_install(UART_NUM_{n}, 256, 0, 0, NULL, 0);\n"
            ));
        }

        if !on_bus(inputs, HwBus::Spi).is_empty() {
            init_section(&mut code, "SPI");
            code.push_str(
                "    spi_bus_config_t bus_cfg = {\n        \
                     .mosi_io_num = 23,\n        \
                     .miso_io_num = 19,\n        \
                     .sclk_io_num = 18,\n        \
                     .quadwp_io_num = -1,\n        \
                     .quadhd_io_num = -1,\n    \
                 };\n    \
                 spi_device_interface_config_t dev_cfg = {\n        \
                     .clock_speed_hz = 1000000,\n        \
                     .mode = 0,\n        \
                     .spics_io_num = 5,\n        \
                     .queue_size = 1,\n    \
                 };\n    \
                 spi_bus_initialize(HSPI_HOST, &bus_cfg, 1);\n    \
                 spi_bus_add_device(HSPI_HOST, &dev_cfg, &spi_handle);\n",
            );
        }

        if !on_bus(inputs, HwBus::Can).is_empty() {
            init_section(&mut code, "CAN (TWAI)");
            code.push_str(
                "    twai_general_config_t g_config = TWAI_GENERAL_CONFIG_DEFAULT(GPIO_NUM_21, GPIO_NUM_22, TWAI_MODE_NORMAL);\n    \
                 twai_timing_config_t t_config = TWAI_TIMING_CONFIG_250KBITS();\n    \
                 twai_filter_config_t f_config = TWAI_FILTER_CONFIG_ACCEPT_ALL();\n    \
                 if (twai_driver_install(&g_config, &t_config, &f_config) == ESP_OK) {\n        \
                     twai_start();\n    \
                 }\n",
            );
        }

        code.push_str("}\n");
        code
    }
}
