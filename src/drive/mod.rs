//! Tank-drive actuation: consumes snapshot stick values at its own cadence
//! and turns them into direction-pin levels plus PWM duty on the motor
//! controller. Reads the snapshot, never blocks the synchronizer.

pub mod pca9685;

use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, info};

use crate::config::DriveConfig;
use pca9685::Pca9685;

const RIGHT_CHANNEL: u8 = 0;
const LEFT_CHANNEL: u8 = 1;

/// Duty ceiling in PCA9685 counts. Full scale is 4096 but the controller is
/// never driven past 4000.
const DUTY_CAP: u16 = 4000;

/// Full raw deflection of a stick axis.
const STICK_FULL_SCALE: f64 = 127.0;

// Drive errors
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),

    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

/// Converts a raw stick deflection into a signed throttle percentage.
///
/// Magnitude is `round(|value| / 127 * 100)` saturated at 100, with the sign
/// of the deflection preserved (negative means reverse).
pub fn throttle_percent(value: i32) -> i32 {
    // unsigned_abs: the stream may carry any i32 bit pattern, including MIN.
    let magnitude = ((value.unsigned_abs() as f64 / STICK_FULL_SCALE) * 100.0).round() as i32;
    let magnitude = magnitude.min(100);
    if value < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Converts a throttle magnitude in [0, 100] into PCA9685 off-counts.
pub fn duty_from_percent(percent: i32) -> u16 {
    let counts = (f64::from(pca9685::PWM_RESOLUTION) * percent as f64 * 0.01) as u16;
    counts.min(DUTY_CAP)
}

/// One side of the drivetrain: an H-bridge direction pair plus a PWM channel.
struct MotorSide {
    forward: OutputPin,
    reverse: OutputPin,
    channel: u8,
}

impl MotorSide {
    fn apply(&mut self, pwm: &mut Pca9685, percent: i32) -> Result<(), DriveError> {
        let duty = duty_from_percent(percent.abs());
        if percent < 0 {
            self.forward.set_low();
            self.reverse.set_high();
        } else {
            self.forward.set_high();
            self.reverse.set_low();
        }
        pwm.set_pwm(self.channel, 0, duty)?;
        Ok(())
    }

    fn stop(&mut self, pwm: &mut Pca9685) -> Result<(), DriveError> {
        self.forward.set_low();
        self.reverse.set_low();
        pwm.set_pwm(self.channel, 0, 0)?;
        Ok(())
    }
}

/// Differential drive over two motors.
pub struct TankDrive {
    pwm: Pca9685,
    left: MotorSide,
    right: MotorSide,
}

impl TankDrive {
    pub fn new(config: &DriveConfig) -> Result<Self, DriveError> {
        let pwm = Pca9685::new(config.i2c_bus, config.pca9685_address, config.pwm_frequency_hz)?;

        let gpio = Gpio::new()?;
        let left = MotorSide {
            forward: gpio.get(config.left_forward_pin)?.into_output(),
            reverse: gpio.get(config.left_reverse_pin)?.into_output(),
            channel: LEFT_CHANNEL,
        };
        let right = MotorSide {
            forward: gpio.get(config.right_forward_pin)?.into_output(),
            reverse: gpio.get(config.right_reverse_pin)?.into_output(),
            channel: RIGHT_CHANNEL,
        };

        info!("Tank drive initialized");
        Ok(Self { pwm, left, right })
    }

    /// Applies signed throttle percentages to both sides.
    pub fn update(&mut self, left_percent: i32, right_percent: i32) -> Result<(), DriveError> {
        debug!(
            "Drive update: left {}%, right {}%",
            left_percent, right_percent
        );
        self.left.apply(&mut self.pwm, left_percent)?;
        self.right.apply(&mut self.pwm, right_percent)?;
        Ok(())
    }

    /// Drops both direction pairs and zeroes the duty on both channels.
    pub fn stop(&mut self) -> Result<(), DriveError> {
        info!("Stopping drive");
        self.left.stop(&mut self.pwm)?;
        self.right.stop(&mut self.pwm)?;
        Ok(())
    }
}
