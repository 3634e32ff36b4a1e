//! Board adapter: bridges GPIO pins to the domain board ports.
//!
//! [`GpioBoard`] is generic over `embedded_hal` digital pins, so the same
//! code drives `esp_idf_hal::gpio::PinDriver` on the device and plain mock
//! pins in host tests. This is the only module that knows pin polarity:
//! inputs are active-low, LEDs and relays active-high.
//!
//! Pin errors never reach the domain. A failed read logs and reads as
//! inactive; a failed write logs and is dropped.

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use log::warn;

use crate::app::ports::{Input, InputPort, Led, OutputPort, Relay};

/// Input pins, one per [`Input`] role.
pub struct BoardInputs<I> {
    pub buzz_mode_switch: I,
    pub ack_buzz_switch: I,
    pub ack_switch: I,
    pub ring: I,
}

/// Output pins. `leds` follows [`Led::ALL`] order.
pub struct BoardOutputs<O> {
    pub leds: [O; 5],
    pub buzzer_relay: O,
    pub ext_bell_relay: O,
    pub heartbeat: O,
}

/// Concrete board behind [`InputPort`] and [`OutputPort`].
pub struct GpioBoard<I, O> {
    inputs: BoardInputs<I>,
    outputs: BoardOutputs<O>,
}

impl<I: InputPin, O: OutputPin> GpioBoard<I, O> {
    pub fn new(inputs: BoardInputs<I>, outputs: BoardOutputs<O>) -> Self {
        Self { inputs, outputs }
    }

    fn input_pin(&mut self, input: Input) -> &mut I {
        match input {
            Input::BuzzModeSwitch => &mut self.inputs.buzz_mode_switch,
            Input::AckBuzzSwitch => &mut self.inputs.ack_buzz_switch,
            Input::AckSwitch => &mut self.inputs.ack_switch,
            Input::Ring => &mut self.inputs.ring,
        }
    }

    fn led_pin(&mut self, led: Led) -> &mut O {
        let idx = match led {
            Led::Power => 0,
            Led::AckAutoBuzz => 1,
            Led::Spare => 2,
            Led::Error => 3,
            Led::Doorbell => 4,
        };
        &mut self.outputs.leds[idx]
    }

    fn drive(pin: &mut O, name: &str, on: bool) {
        if let Err(e) = pin.set_state(PinState::from(on)) {
            warn!("Board: write to {} failed: {:?}", name, e);
        }
    }
}

impl<I: InputPin, O: OutputPin> InputPort for GpioBoard<I, O> {
    fn is_active(&mut self, input: Input) -> bool {
        match self.input_pin(input).is_low() {
            Ok(low) => low,
            Err(e) => {
                warn!("Board: read of {:?} failed: {:?}", input, e);
                false
            }
        }
    }
}

impl<I: InputPin, O: OutputPin> OutputPort for GpioBoard<I, O> {
    fn set_led(&mut self, led: Led, on: bool) {
        Self::drive(self.led_pin(led), "LED", on);
    }

    fn set_relay(&mut self, relay: Relay, energized: bool) {
        let pin = match relay {
            Relay::Buzzer => &mut self.outputs.buzzer_relay,
            Relay::ExtBell => &mut self.outputs.ext_bell_relay,
        };
        Self::drive(pin, "relay", energized);
    }

    fn set_heartbeat(&mut self, on: bool) {
        Self::drive(&mut self.outputs.heartbeat, "heartbeat LED", on);
    }
}
