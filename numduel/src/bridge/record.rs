//! Fixed-size binary record carried by the FIFO transport.
//!
//! Every [`Event`] occupies exactly [`RECORD_LEN`] bytes: four little-endian
//! `u32` words `kind`, `value`, `attempts`, `flags`. A reader never has to
//! look ahead to find a record boundary.

use std::io;

use tokio_util::bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::bridge::protocol::Event;
use crate::round::Role;

pub const RECORD_LEN: usize = 16;

const KIND_GUESS: u32 = 1;
const KIND_VERDICT: u32 = 2;
const KIND_TERMINATE: u32 = 3;
const KIND_BEGIN: u32 = 4;
const KIND_READY: u32 = 5;

/// Verdict: the guess was correct. Begin: the receiver thinks this round.
const FLAG_SET: u32 = 1;

/// Raw record layout, before any meaning is attached to the words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Record {
    pub kind: u32,
    pub value: u32,
    pub attempts: u32,
    pub flags: u32,
}

impl Record {
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(RECORD_LEN);
        dst.put_u32_le(self.kind);
        dst.put_u32_le(self.value);
        dst.put_u32_le(self.attempts);
        dst.put_u32_le(self.flags);
    }

    /// Consume one record from the front of `src`. Caller guarantees length.
    fn read_from(src: &mut BytesMut) -> Self {
        Self {
            kind: src.get_u32_le(),
            value: src.get_u32_le(),
            attempts: src.get_u32_le(),
            flags: src.get_u32_le(),
        }
    }
}

impl From<Event> for Record {
    fn from(event: Event) -> Self {
        match event {
            Event::Guess { value } => Self {
                kind: KIND_GUESS,
                value,
                ..Self::default()
            },
            Event::Verdict { correct, attempts } => Self {
                kind: KIND_VERDICT,
                attempts,
                flags: if correct { FLAG_SET } else { 0 },
                ..Self::default()
            },
            Event::Terminate => Self {
                kind: KIND_TERMINATE,
                ..Self::default()
            },
            Event::Begin { round, role } => Self {
                kind: KIND_BEGIN,
                value: round,
                flags: if role == Role::Thinker { FLAG_SET } else { 0 },
                ..Self::default()
            },
            Event::Ready { round } => Self {
                kind: KIND_READY,
                value: round,
                ..Self::default()
            },
        }
    }
}

impl TryFrom<Record> for Event {
    type Error = io::Error;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        if record.flags & !FLAG_SET != 0 {
            return Err(invalid(format!("unknown record flags {:#x}", record.flags)));
        }
        let set = record.flags & FLAG_SET != 0;

        let event = match record.kind {
            KIND_GUESS => Event::Guess {
                value: record.value,
            },
            KIND_VERDICT => Event::Verdict {
                correct: set,
                attempts: record.attempts,
            },
            KIND_TERMINATE => Event::Terminate,
            KIND_BEGIN => Event::Begin {
                round: record.value,
                role: if set { Role::Thinker } else { Role::Guesser },
            },
            KIND_READY => Event::Ready {
                round: record.value,
            },
            other => return Err(invalid(format!("unknown record kind {other}"))),
        };
        Ok(event)
    }
}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Codec turning a byte stream into [`Event`]s, one record at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl Decoder for RecordCodec {
    type Item = Event;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < RECORD_LEN {
            src.reserve(RECORD_LEN - src.len());
            return Ok(None);
        }
        Event::try_from(Record::read_from(src)).map(Some)
    }
}

impl Encoder<Event> for RecordCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Event, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Record::from(item).write_to(dst);
        Ok(())
    }
}
