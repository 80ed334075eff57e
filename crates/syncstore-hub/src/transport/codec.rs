//! Decode-once codec for the WebSocket relay.
//!
//! - Text frames => `MessageEvent` stamped with the connection's id and origin
//! - Binary frames are not part of the protocol and are ignored
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;

use super::port::{MessageEvent, PeerId};

#[derive(Debug)]
pub enum Inbound {
    Event(MessageEvent),
    Ping(Vec<u8>),
    Pong,
    Close,
    Ignored,
}

pub fn decode(msg: Message, peer: PeerId, origin: &str) -> Inbound {
    match msg {
        Message::Text(s) => Inbound::Event(MessageEvent::new(peer, origin, s)),
        Message::Binary(_) => Inbound::Ignored,
        Message::Ping(v) => Inbound::Ping(v),
        Message::Pong(_) => Inbound::Pong,
        Message::Close(_) => Inbound::Close,
    }
}

/// Frame size used for the per-message limit.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) | Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}
