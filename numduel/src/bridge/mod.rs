//! Wire formats shared by the host and its peer.
//!
//! - **protocol**: [`protocol::Event`] plus the control-channel messages
//! - **record**: fixed-size binary records for byte-stream transports
//! - **codec**: length-delimited JSON framing for the control channel

pub mod codec;
pub mod protocol;
pub mod record;
