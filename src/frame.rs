use byteorder::{BigEndian, WriteBytesExt};

use crate::buffer::Buffer;
use crate::config::FrameLimits;
use crate::error::{CoreError, CoreResult};

const MAGIC: u8 = b'F';

/// A fully parsed, still-opaque frame: the serialized envelope plus the value bytes
/// that followed it on the wire, per `spec.md` §6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedFrame {
    pub message_bytes: Vec<u8>,
    pub value_bytes: Vec<u8>,
}

/// Serialize `(message_bytes, value_bytes)` into the wire layout:
/// `'F' ‖ be32(|message|) ‖ be32(|value|) ‖ message ‖ value`.
pub(crate) fn encode(message_bytes: &[u8], value_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(9 + message_bytes.len() + value_bytes.len());
    out.push(MAGIC);
    out.write_u32::<BigEndian>(message_bytes.len() as u32)
        .expect("writing into a Vec never fails");
    out.write_u32::<BigEndian>(value_bytes.len() as u32)
        .expect("writing into a Vec never fails");
    out.extend_from_slice(message_bytes);
    out.extend_from_slice(value_bytes);
    out
}

#[derive(Debug, Clone)]
enum ParserState {
    AwaitMagic,
    AwaitMessageLen,
    AwaitValueLen { message_len: u32 },
    AwaitMessage { message_len: u32, value_len: u32 },
    AwaitValue { message_bytes: Vec<u8>, value_len: u32 },
    Failed,
}

/// Resumable incremental parser for inbound frames, per `spec.md` §4.C. Each call to
/// `poll` consumes the minimum bytes needed to advance one state; if the supplied
/// buffer doesn't hold enough bytes yet, the buffer and parser state are both left
/// untouched so the caller can feed it more data and call again. A bad magic byte or an
/// oversize length latches the parser into `Failed`, which is sticky: every subsequent
/// `poll` call returns the same framing error without consuming anything further.
pub(crate) struct FrameParser {
    state: ParserState,
    limits: FrameLimits,
}

impl FrameParser {
    pub(crate) fn new(limits: FrameLimits) -> FrameParser {
        FrameParser { state: ParserState::AwaitMagic, limits }
    }

    /// True iff a frame is partway through being parsed (i.e. the parser isn't sitting
    /// at a fresh frame boundary). Lets the Receiver distinguish "nothing in flight,
    /// the stream is quiescent" (`Idle`) from "a partial frame is buffered, the host
    /// must wait for readability before the rest of it can arrive" (`IoWait`).
    pub(crate) fn is_awaiting_frame(&self) -> bool {
        !matches!(self.state, ParserState::AwaitMagic)
    }

    pub(crate) fn poll(&mut self, buffer: &mut Buffer) -> CoreResult<Option<ParsedFrame>> {
        loop {
            match &self.state {
                ParserState::Failed => {
                    return Err(CoreError::Framing("parser is latched in a failed state".into()));
                }
                ParserState::AwaitMagic => match buffer.take(1) {
                    None => return Ok(None),
                    Some(bytes) => {
                        if bytes[0] != MAGIC {
                            self.state = ParserState::Failed;
                            return Err(CoreError::Framing(format!(
                                "invalid magic byte {:#x}, expected {:#x}",
                                bytes[0], MAGIC
                            )));
                        }
                        self.state = ParserState::AwaitMessageLen;
                    }
                },
                ParserState::AwaitMessageLen => match buffer.take(4) {
                    None => return Ok(None),
                    Some(bytes) => {
                        let message_len = u32::from_be_bytes(bytes.try_into().unwrap());
                        if message_len > self.limits.max_message_len {
                            self.state = ParserState::Failed;
                            return Err(CoreError::Framing(format!(
                                "message_length {} exceeds limit {}",
                                message_len, self.limits.max_message_len
                            )));
                        }
                        self.state = ParserState::AwaitValueLen { message_len };
                    }
                },
                ParserState::AwaitValueLen { message_len } => {
                    let message_len = *message_len;
                    match buffer.take(4) {
                        None => return Ok(None),
                        Some(bytes) => {
                            let value_len = u32::from_be_bytes(bytes.try_into().unwrap());
                            if value_len > self.limits.max_value_len {
                                self.state = ParserState::Failed;
                                return Err(CoreError::Framing(format!(
                                    "value_length {} exceeds limit {}",
                                    value_len, self.limits.max_value_len
                                )));
                            }
                            self.state = ParserState::AwaitMessage { message_len, value_len };
                        }
                    }
                }
                ParserState::AwaitMessage { message_len, value_len } => {
                    let (message_len, value_len) = (*message_len, *value_len);
                    match buffer.take(message_len as usize) {
                        None => return Ok(None),
                        Some(message_bytes) => {
                            self.state = ParserState::AwaitValue { message_bytes, value_len };
                        }
                    }
                }
                ParserState::AwaitValue { value_len, .. } => {
                    let value_len = *value_len;
                    match buffer.take(value_len as usize) {
                        None => return Ok(None),
                        Some(value_bytes) => {
                            let message_bytes = match std::mem::replace(&mut self.state, ParserState::AwaitMagic) {
                                ParserState::AwaitValue { message_bytes, .. } => message_bytes,
                                _ => unreachable!(),
                            };
                            return Ok(Some(ParsedFrame { message_bytes, value_bytes }));
                        }
                    }
                }
            }
        }
    }
}
