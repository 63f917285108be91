//! STM32 HAL backend.
//!
//! HAL completion callbacks are weak symbols that may be overridden once per
//! program, so each bus gets one shared callback that fans out to every
//! input on the interrupting instance.

use lq_core::HwBus;

use super::{by_instance, init_open, init_section, le_i32, push};
use crate::input::{on_bus, HwInput};
use crate::platform::{Platform, PlatformBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct Stm32;

const ADC_DEFAULT: i64 = 1;
const SPI_DEFAULT: i64 = 1;
const CAN_DEFAULT: i64 = 1;
const I2C_DEFAULT: i64 = 1;
const UART_DEFAULT: i64 = 2;

impl PlatformBackend for Stm32 {
    fn platform(&self) -> Platform {
        Platform::Stm32
    }

    fn platform_header(&self) -> String {
        "/* STM32 HAL */\n\
         #include \"stm32f4xx_hal.h\"  /* adjust for the STM32 family in use */\n\
         #include \"lq_platform.h\"\n\
         #include \"lq_hw_input.h\"\n"
            .to_string()
    }

    fn isr_wrapper(&self, input: &HwInput) -> Option<String> {
        let name = &input.name;
        let code = match input.bus {
            HwBus::Adc => {
                let n = input.instance_or(ADC_DEFAULT);
                format!(
                    "/* Polled ADC read for {name} */\n\
                     void lq_adc_read_{name}(void)\n\
                     {{\n    \
                         HAL_ADC_Start(&hadc{n});\n    \
                         if (HAL_ADC_PollForConversion(&hadc{n}, 1) == HAL_OK) {{\n        \
                             uint16_t value = (uint16_t)HAL_ADC_GetValue(&hadc{n});\n        \
                             {}\n    \
                         }}\n\
                     }}\n",
                    push(input, "value")
                )
            }
            HwBus::Spi => format!(
                "/* SPI sample for {name} */\n\
                 static void lq_spi_rx_{name}(uint16_t value)\n\
                 {{\n    {}\n}}\n",
                push(input, "value")
            ),
            HwBus::Can => format!(
                "/* CAN receive for {name} (PGN {pgn}) */\n\
                 static void lq_can_rx_{name}(uint32_t ext_id, const uint8_t *data)\n\
                 {{\n    \
                     if (((ext_id >> 8) & 0x3FFFF) == {pgn}u) {{\n        \
                         int32_t value = {value};\n        \
                         {push}\n    \
                     }}\n\
                 }}\n",
                pgn = input.pgn_or_zero(),
                value = le_i32("data", 0),
                push = push(input, "value"),
            ),
            HwBus::Gpio => format!(
                "/* GPIO level for {name} */\n\
                 void lq_gpio_read_{name}(void)\n\
                 {{\n    \
                     GPIO_PinState state = HAL_GPIO_ReadPin(GPIO{port}, GPIO_PIN_{pin});\n    \
                     {push}\n\
                 }}\n",
                port = input.port_or("A"),
                pin = input.pin_or(0),
                push = push(input, "(state == GPIO_PIN_SET)"),
            ),
            HwBus::I2c => format!(
                "/* I2C read for {name} */\n\
                 void lq_i2c_read_{name}(void)\n\
                 {{\n    \
                     uint8_t rx[2];\n    \
                     if (HAL_I2C_Master_Receive(&hi2c{n}, 0x{addr:02X} << 1, rx, 2, 10) == HAL_OK) {{\n        \
                         uint16_t value = (uint16_t)((rx[0] << 8) | rx[1]);\n        \
                         {push}\n    \
                     }}\n\
                 }}\n",
                n = input.instance_or(I2C_DEFAULT),
                addr = input.i2c_address.unwrap_or(0x50),
                push = push(input, "value"),
            ),
            HwBus::Uart => format!(
                "/* UART byte for {name} */\n\
                 static void lq_uart_rx_{name}(uint8_t value)\n\
                 {{\n    {}\n}}\n",
                push(input, "value")
            ),
            HwBus::Sensor => return None,
        };
        Some(code)
    }

    fn shared_handlers(&self, inputs: &[HwInput]) -> Option<String> {
        let mut code = String::new();

        let adc = by_instance(inputs, HwBus::Adc, ADC_DEFAULT);
        if !adc.is_empty() {
            for (n, group) in &adc {
                code.push_str(&format!("static uint16_t lq_adc{n}_buf[{}];\n", group.len()));
            }
            code.push_str(
                "\n/* ADC DMA conversion complete */\n\
                 void HAL_ADC_ConvCpltCallback(ADC_HandleTypeDef *hadc)\n{\n",
            );
            for (n, group) in &adc {
                code.push_str(&format!("    if (hadc->Instance == ADC{n}) {{\n"));
                for (rank, input) in group.iter().enumerate() {
                    let sample = format!("lq_adc{n}_buf[{rank}]");
                    code.push_str(&format!("        {}\n", push(input, &sample)));
                }
                code.push_str("    }\n");
            }
            code.push_str("}\n\n");
        }

        let spi = by_instance(inputs, HwBus::Spi, SPI_DEFAULT);
        if !spi.is_empty() {
            for n in spi.keys() {
                code.push_str(&format!("static uint16_t lq_spi{n}_rx;\n"));
            }
            code.push_str(
                "\n/* SPI receive complete */\n\
                 void HAL_SPI_RxCpltCallback(SPI_HandleTypeDef *hspi)\n{\n",
            );
            for (n, group) in &spi {
                code.push_str(&format!("    if (hspi->Instance == SPI{n}) {{\n"));
                for input in group {
                    code.push_str(&format!("        lq_spi_rx_{}(lq_spi{n}_rx);\n", input.name));
                }
                code.push_str(&format!(
                    "        HAL_SPI_Receive_IT(hspi, (uint8_t *)&lq_spi{n}_rx, 1);\n    }}\n"
                ));
            }
            code.push_str("}\n\n");
        }

        let can = by_instance(inputs, HwBus::Can, CAN_DEFAULT);
        if !can.is_empty() {
            code.push_str(
                "/* CAN FIFO0 message pending */\n\
                 void HAL_CAN_RxFifo0MsgPendingCallback(CAN_HandleTypeDef *hcan)\n{\n    \
                     CAN_RxHeaderTypeDef header;\n    \
                     uint8_t data[8];\n\n    \
                     if (HAL_CAN_GetRxMessage(hcan, CAN_RX_FIFO0, &header, data) != HAL_OK || header.IDE != CAN_ID_EXT) {\n        \
                         return;\n    \
                     }\n",
            );
            for (n, group) in &can {
                code.push_str(&format!("    if (hcan->Instance == CAN{n}) {{\n"));
                for input in group {
                    code.push_str(&format!("        lq_can_rx_{}(header.ExtId, data);\n", input.name));
                }
                code.push_str("    }\n");
            }
            code.push_str("}\n\n");
        }

        let uart = by_instance(inputs, HwBus::Uart, UART_DEFAULT);
        if !uart.is_empty() {
            for n in uart.keys() {
                code.push_str(&format!("static uint8_t lq_uart{n}_rx;\n"));
            }
            code.push_str(
                "\n/* UART receive complete */\n\
                 void HAL_UART_RxCpltCallback(UART_HandleTypeDef *huart)\n{\n",
            );
            for (n, group) in &uart {
                code.push_str(&format!("    if (huart == &huart{n}) {{\n"));
                for input in group {
                    code.push_str(&format!("        lq_uart_rx_{}(lq_uart{n}_rx);\n", input.name));
                }
                code.push_str(&format!(
                    "        HAL_UART_Receive_IT(huart, &lq_uart{n}_rx, 1);\n    }}\n"
                ));
            }
            code.push_str("}\n\n");
        }

        if code.is_empty() {
            None
        } else {
            Some(code.trim_end().to_string() + "\n")
        }
    }

    fn peripheral_init(&self, inputs: &[HwInput]) -> String {
        let mut code = String::new();

        // Handles come from CubeMX; declare only the ones this program touches.
        let handles = [
            (HwBus::Adc, ADC_DEFAULT, "ADC_HandleTypeDef", "hadc"),
            (HwBus::Spi, SPI_DEFAULT, "SPI_HandleTypeDef", "hspi"),
            (HwBus::Can, CAN_DEFAULT, "CAN_HandleTypeDef", "hcan"),
            (HwBus::I2c, I2C_DEFAULT, "I2C_HandleTypeDef", "hi2c"),
            (HwBus::Uart, UART_DEFAULT, "UART_HandleTypeDef", "huart"),
        ];
        for (bus, default, ty, prefix) in handles {
            for n in by_instance(inputs, bus, default).keys() {
                code.push_str(&format!("extern {ty} {prefix}{n};\n"));
            }
        }
        if !code.is_empty() {
            code.push('\n');
        }

        code.push_str(&init_open("STM32"));

        let gpio = on_bus(inputs, HwBus::Gpio);
        if !gpio.is_empty() {
            init_section(&mut code, "GPIO");
            code.push_str("    GPIO_InitTypeDef gpio = {0};\n");
            for input in gpio {
                code.push_str(&format!(
                    "    gpio.Pin = GPIO_PIN_{pin};\n    \
                     gpio.Mode = GPIO_MODE_INPUT;\n    \
                     gpio.Pull = GPIO_NOPULL;\n    \
                     HAL_GPIO_Init(GPIO{port}, &gpio);  /* {name} */\n",
                    pin = input.pin_or(0),
                    port = input.port_or("A"),
                    name = input.name,
                ));
            }
        }

        let adc = by_instance(inputs, HwBus::Adc, ADC_DEFAULT);
        if !adc.is_empty() {
            init_section(&mut code, "ADC (DMA scan)");
            for (n, group) in &adc {
                code.push_str(&format!(
                    "    HAL_ADC_Start_DMA(&hadc{n}, (uint32_t *)lq_adc{n}_buf, {});\n",
                    group.len()
                ));
            }
        }

        let i2c = on_bus(inputs, HwBus::I2c);
        if !i2c.is_empty() {
            init_section(&mut code, "I2C");
            for input in i2c {
                code.push_str(&format!(
                    "    /* I2C{} ready for device 0x{:02X} ({}) */\n",
                    input.instance_or(I2C_DEFAULT),
                    input.i2c_address.unwrap_or(0x50),
                    input.name
                ));
            }
        }

        let spi = by_instance(inputs, HwBus::Spi, SPI_DEFAULT);
        if !spi.is_empty() {
            init_section(&mut code, "SPI");
            for n in spi.keys() {
                code.push_str(&format!(
                    "    HAL_SPI_Receive_IT(&hspi{n}, (uint8_t *)&lq_spi{n}_rx, 1);\n"
                ));
            }
        }

        let uart = by_instance(inputs, HwBus::Uart, UART_DEFAULT);
        if !uart.is_empty() {
            init_section(&mut code, "UART");
            for n in uart.keys() {
                code.push_str(&format!("    HAL_UART_Receive_IT(&huart{n}, &lq_uart{n}_rx, 1);\n"));
            }
        }

        let can = on_bus(inputs, HwBus::Can);
        if !can.is_empty() {
            init_section(&mut code, "CAN (one filter bank per PGN)");
            code.push_str("    CAN_FilterTypeDef filter = {0};\n");
            for (bank, input) in can.iter().enumerate() {
                let pgn = input.pgn_or_zero();
                code.push_str(&format!(
                    "    filter.FilterIdHigh = (uint32_t)((({pgn}u << 8) << 3) >> 16);\n    \
                     filter.FilterIdLow = (uint32_t)((({pgn}u << 8) << 3) & 0xFFFF) | CAN_ID_EXT;\n    \
                     filter.FilterMaskIdHigh = (uint32_t)(((0x3FFFFu << 8) << 3) >> 16);\n    \
                     filter.FilterMaskIdLow = (uint32_t)(((0x3FFFFu << 8) << 3) & 0xFFFF) | CAN_ID_EXT;\n    \
                     filter.FilterFIFOAssignment = CAN_RX_FIFO0;\n    \
                     filter.FilterBank = {bank};\n    \
                     filter.FilterMode = CAN_FILTERMODE_IDMASK;\n    \
                     filter.FilterScale = CAN_FILTERSCALE_32BIT;\n    \
                     filter.FilterActivation = ENABLE;\n    \
                     HAL_CAN_ConfigFilter(&hcan{n}, &filter);  /* {name} */\n",
                    n = input.instance_or(CAN_DEFAULT),
                    name = input.name,
                ));
            }
            for n in by_instance(inputs, HwBus::Can, CAN_DEFAULT).keys() {
                code.push_str(&format!(
                    "    HAL_CAN_Start(&hcan{n});\n    \
                     HAL_CAN_ActivateNotification(&hcan{n}, CAN_IT_RX_FIFO0_MSG_PENDING);\n"
                ));
            }
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
    fn adc_callback_is_shared_between_inputs() {
        let inputs = inputs(TWO_ADC);
        let shared = Stm32.shared_handlers(&inputs).unwrap();
        assert_eq!(shared.matches("void HAL_ADC_ConvCpltCallback").count(), 1);
        assert!(shared.contains("lq_hw_push(0, (uint32_t)lq_adc1_buf[0]);"));
        assert!(shared.contains("lq_hw_push(1, (uint32_t)lq_adc1_buf[1]);"));
        assert!(shared.contains("static uint16_t lq_adc1_buf[2];"));

        let init = Stm32.peripheral_init(&inputs);
        assert!(init.contains("HAL_ADC_Start_DMA(&hadc1, (uint32_t *)lq_adc1_buf, 2);"));
        assert!(init.contains("extern ADC_HandleTypeDef hadc1;"));
    }

    #[test]
    fn can_wrapper_filters_on_pgn() {
        let inputs = inputs(EVERY_BUS);
        let wrapper = Stm32.isr_wrapper(&inputs[2]).unwrap();
        assert!(wrapper.contains("static void lq_can_rx_speed(uint32_t ext_id, const uint8_t *data)"));
        assert!(wrapper.contains("== 65265u"));
        assert!(wrapper.contains("lq_hw_push(2, (uint32_t)value);"));
    }

    #[test]
    fn init_configures_only_present_families() {
        let inputs = inputs(TWO_ADC);
        let init = Stm32.peripheral_init(&inputs);
        assert!(init.contains("/* ADC (DMA scan) */"));
        for absent in ["SPI", "UART", "CAN", "GPIO", "I2C"] {
            assert!(!init.contains(&format!("/* {absent}")), "{absent} should be absent");
        }
        assert!(Stm32.shared_handlers(&[]).is_none());
    }

    #[test]
    fn every_bus_except_sensor_has_a_wrapper() {
        let inputs = inputs(EVERY_BUS);
        for input in &inputs {
            let wrapper = Stm32.isr_wrapper(input);
            assert_eq!(wrapper.is_some(), input.bus != HwBus::Sensor, "{}", input.name);
        }
        let gpio = Stm32.isr_wrapper(&inputs[3]).unwrap();
        assert!(gpio.contains("HAL_GPIO_ReadPin(GPIOC, GPIO_PIN_7)"));
        let i2c = Stm32.isr_wrapper(&inputs[4]).unwrap();
        assert!(i2c.contains("0x48 << 1"));
    }
}
