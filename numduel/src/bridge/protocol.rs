//! Message types exchanged between the host process and its peer.
//!
//! Two channels:
//! - **Game transport** (signals or FIFOs): [`Event`]s that drive rounds.
//! - **Control channel** (peer stdin/stdout): startup configuration and the
//!   peer's final report.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::round::Role;
use crate::transport::PeerTransportInfo;

/// Unit of game communication between the two participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Guesser to thinker.
    Guess { value: u32 },

    /// Thinker to guesser, one per guess.
    Verdict { correct: bool, attempts: u32 },

    /// Ends the receiver's participation immediately.
    Terminate,

    /// Host to peer: round `round` starts and the receiver plays `role`.
    Begin { round: u32, role: Role },

    /// Peer to host: the announced round and role are accepted.
    Ready { round: u32 },
}

impl Event {
    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Guess { .. } => "guess",
            Self::Verdict { .. } => "verdict",
            Self::Terminate => "terminate",
            Self::Begin { .. } => "begin",
            Self::Ready { .. } => "ready",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guess { value } => write!(f, "guess({value})"),
            Self::Verdict { correct, attempts } => {
                write!(f, "verdict(correct={correct}, attempts={attempts})")
            }
            Self::Terminate => f.write_str("terminate"),
            Self::Begin { round, role } => write!(f, "begin(round={round}, role={role})"),
            Self::Ready { round } => write!(f, "ready(round={round})"),
        }
    }
}

/// Control messages from host to peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Sent immediately after spawn (must be the first message).
    Init {
        max_number: u32,
        seed: Option<u64>,
        transport: PeerTransportInfo,
    },
}

/// Control messages from peer to host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlResponse {
    /// Game transport is open; the host may start announcing rounds.
    Ready,

    /// Peer saw `Terminate` and is about to exit.
    Finished { rounds_played: u32 },

    /// Peer could not set up or play; it exits right after sending this.
    Failed { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn init_signal_serializes() {
        let req = ControlRequest::Init {
            max_number: 50,
            seed: None,
            transport: PeerTransportInfo::Signal { host_pid: 4242 },
        };
        insta::assert_json_snapshot!(req, @r#"
        {
          "type": "init",
          "max_number": 50,
          "seed": null,
          "transport": {
            "kind": "signal",
            "host_pid": 4242
          }
        }
        "#);
    }

    #[test]
    fn init_fifo_serializes() {
        let req = ControlRequest::Init {
            max_number: 9,
            seed: Some(7),
            transport: PeerTransportInfo::Fifo {
                inbound: PathBuf::from("/tmp/numduel-1/to-peer.fifo"),
                outbound: PathBuf::from("/tmp/numduel-1/to-host.fifo"),
            },
        };
        insta::assert_json_snapshot!(req, @r#"
        {
          "type": "init",
          "max_number": 9,
          "seed": 7,
          "transport": {
            "kind": "fifo",
            "inbound": "/tmp/numduel-1/to-peer.fifo",
            "outbound": "/tmp/numduel-1/to-host.fifo"
          }
        }
        "#);
    }

    #[test]
    fn finished_serializes() {
        let resp = ControlResponse::Finished { rounds_played: 10 };
        insta::assert_json_snapshot!(resp, @r#"
        {
          "type": "finished",
          "rounds_played": 10
        }
        "#);
    }

    #[test]
    fn ready_serializes() {
        insta::assert_json_snapshot!(ControlResponse::Ready, @r#"
        {
          "type": "ready"
        }
        "#);
    }

    #[test]
    fn event_display_names_fields() {
        let begin = Event::Begin {
            round: 3,
            role: Role::Guesser,
        };
        assert_eq!(begin.to_string(), "begin(round=3, role=guesser)");
        assert_eq!(begin.name(), "begin");
        assert_eq!(
            Event::Verdict {
                correct: false,
                attempts: 2
            }
            .to_string(),
            "verdict(correct=false, attempts=2)"
        );
    }
}
