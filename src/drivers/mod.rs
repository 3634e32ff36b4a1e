//! Input conditioning, LED rendering, board initialisation and restart.

pub mod debounce;
pub mod hw_init;
pub mod restart;
pub mod status_leds;
