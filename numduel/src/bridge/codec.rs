//! Framed JSON codec for the host/peer control channel.
//!
//! A 4-byte length prefix frames each message; the body is serde_json.
//! Works over any AsyncRead/AsyncWrite (child stdio, pipes, sockets).

use std::io;
use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Control messages are tiny; anything larger is a corrupted stream.
const MAX_CONTROL_FRAME: usize = 64 * 1024;

pub struct ControlCodec<T> {
    frames: LengthDelimitedCodec,
    _message: PhantomData<T>,
}

impl<T> Default for ControlCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ControlCodec<T> {
    pub fn new() -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .max_frame_length(MAX_CONTROL_FRAME)
                .new_codec(),
            _message: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Decoder for ControlCodec<T> {
    type Item = T;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.frames.decode(src)? else {
            return Ok(None);
        };
        serde_json::from_slice(&frame)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl<T: Serialize> Encoder<T> for ControlCodec<T> {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body =
            serde_json::to_vec(&item).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        tracing::trace!(frame_bytes = body.len(), "Encoding control frame");
        self.frames.encode(Bytes::from(body), dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::{ControlRequest, ControlResponse};
    use crate::transport::PeerTransportInfo;

    #[test]
    fn init_survives_framing() {
        let mut codec = ControlCodec::<ControlRequest>::new();
        let mut buf = BytesMut::new();

        let req = ControlRequest::Init {
            max_number: 40,
            seed: Some(3),
            transport: PeerTransportInfo::Signal { host_pid: 99 },
        };
        codec.encode(req, &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();

        match decoded {
            ControlRequest::Init {
                max_number,
                seed,
                transport: PeerTransportInfo::Signal { host_pid },
            } => {
                assert_eq!(max_number, 40);
                assert_eq!(seed, Some(3));
                assert_eq!(host_pid, 99);
            }
            other => panic!("unexpected request: {other:?}"),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut codec = ControlCodec::<ControlResponse>::new();
        let mut full = BytesMut::new();
        codec
            .encode(ControlResponse::Finished { rounds_played: 4 }, &mut full)
            .unwrap();

        let mut partial = full.split_to(full.len() - 3);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.unsplit(full);
        let decoded = codec.decode(&mut partial).unwrap().unwrap();
        assert!(matches!(
            decoded,
            ControlResponse::Finished { rounds_played: 4 }
        ));
    }

    #[test]
    fn garbage_body_is_invalid_data() {
        let mut codec = ControlCodec::<ControlResponse>::new();
        let mut buf = BytesMut::new();
        codec
            .frames
            .encode(Bytes::from_static(b"not json"), &mut buf)
            .unwrap();

        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
