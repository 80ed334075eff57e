//! Transport layer.
//!
//! - `port`: transport-neutral message event, target origin, outbound port.
//! - `bus`: listener registry with explicit subscriptions.
//! - `registry`, `codec`, `ws`: the WebSocket relay that carries frames
//!   between peer documents and the bus.

pub mod bus;
pub mod codec;
pub mod port;
pub mod registry;
pub mod ws;

pub use bus::{MessageBus, Subscription};
pub use port::{MessageEvent, OutboundPort, PeerId, TargetOrigin, OPAQUE_ORIGIN};
pub use registry::{PeerConnection, PeerRegistry};
