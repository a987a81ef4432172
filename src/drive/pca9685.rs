use rppal::i2c::I2c;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use super::DriveError;

const MODE1: u8 = 0x00;
const PRESCALE: u8 = 0xFE;
const LED0_ON_L: u8 = 0x06;

const MODE1_SLEEP: u8 = 0x10;
const MODE1_RESTART: u8 = 0x80;
const MODE1_AUTO_INCREMENT: u8 = 0x20;

const OSCILLATOR_HZ: f64 = 25_000_000.0;

/// Number of counts per PWM period on the chip.
pub const PWM_RESOLUTION: u16 = 4096;

/// Minimal PCA9685 16-channel PWM driver, just enough for motor throttle.
pub struct Pca9685 {
    i2c: I2c,
}

impl Pca9685 {
    /// Opens the chip on the given bus/address and programs the PWM frequency.
    pub fn new(bus: u8, address: u16, frequency_hz: f64) -> Result<Self, DriveError> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;
        info!(
            "Opened PCA9685 on i2c bus {} at address {:#04x}",
            bus, address
        );

        let mut chip = Self { i2c };
        chip.set_frequency(frequency_hz)?;
        Ok(chip)
    }

    /// Programs the prescaler. The chip only accepts prescale writes while
    /// asleep, so the output is briefly stopped.
    fn set_frequency(&mut self, frequency_hz: f64) -> Result<(), DriveError> {
        let prescale = (OSCILLATOR_HZ / (f64::from(PWM_RESOLUTION) * frequency_hz)).round() - 1.0;
        let prescale = prescale.clamp(3.0, 255.0) as u8;
        debug!(
            "Setting PCA9685 frequency to {} Hz (prescale {})",
            frequency_hz, prescale
        );

        self.i2c.smbus_write_byte(MODE1, MODE1_SLEEP)?;
        self.i2c.smbus_write_byte(PRESCALE, prescale)?;
        self.i2c.smbus_write_byte(MODE1, MODE1_AUTO_INCREMENT)?;
        thread::sleep(Duration::from_micros(500));
        self.i2c
            .smbus_write_byte(MODE1, MODE1_RESTART | MODE1_AUTO_INCREMENT)?;
        Ok(())
    }

    /// Sets the on/off counts for one channel.
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), DriveError> {
        let register = LED0_ON_L + 4 * channel;
        self.i2c.block_write(
            register,
            &[
                (on & 0xFF) as u8,
                (on >> 8) as u8,
                (off & 0xFF) as u8,
                (off >> 8) as u8,
            ],
        )?;
        Ok(())
    }
}
