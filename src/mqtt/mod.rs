//! MQTT transport: the packet codec and the broker hosted on the device.
//!
//! ```text
//!   desktop clients ──TCP──▶ LocalBroker ──MessageBus──▶ ProtocolHandler
//!                              │
//!                              └── packet (encode / streaming decode)
//! ```

pub mod broker;
pub mod packet;

pub use broker::{BrokerError, LocalBroker};
