//! Wisp frame codec (RFC-less, see the Wisp protocol's own wire definition)
//!
//! A Wisp packet is a typed, length-implicit binary record: one byte of
//! packet type, four little-endian bytes of stream id, then an opaque
//! payload whose length is whatever remains of the WebSocket message.

use thiserror::Error;

/// Minimum length of any well-formed Wisp packet (type + stream id).
pub const HEADER_LEN: usize = 5;

/// Wisp packet types (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Connect,
    Data,
    Continue,
    Close,
}

impl PacketType {
    fn to_byte(self) -> u8 {
        match self {
            PacketType::Connect => 0x01,
            PacketType::Data => 0x02,
            PacketType::Continue => 0x03,
            PacketType::Close => 0x04,
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(PacketType::Connect),
            0x02 => Ok(PacketType::Data),
            0x03 => Ok(PacketType::Continue),
            0x04 => Ok(PacketType::Close),
            other => Err(CodecError::UnknownType(other)),
        }
    }
}

/// Stream kind carried in a CONNECT payload's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Tcp,
    Udp,
}

impl TryFrom<u8> for StreamKind {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(StreamKind::Tcp),
            0x02 => Ok(StreamKind::Udp),
            _ => Err(CodecError::Malformed),
        }
    }
}

/// CLOSE reason codes (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Normal,
    NetworkError,
    Invalid,
    Unreachable,
    Timeout,
    Refused,
}

impl CloseReason {
    pub fn to_byte(self) -> u8 {
        match self {
            CloseReason::Normal => 0x02,
            CloseReason::NetworkError => 0x03,
            CloseReason::Invalid => 0x41,
            CloseReason::Unreachable => 0x42,
            CloseReason::Timeout => 0x43,
            CloseReason::Refused => 0x44,
        }
    }
}

/// A decoded Wisp packet borrowing its payload from the input buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Packet<'a> {
    pub kind: PacketType,
    pub stream_id: u32,
    pub payload: &'a [u8],
}

/// Errors `decode` can report. The dispatcher treats both the same way:
/// drop the frame and log at debug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame shorter than {HEADER_LEN} bytes")]
    Malformed,
    #[error("unknown packet type byte: {0:#04x}")]
    UnknownType(u8),
}

/// Encode a Wisp packet. Never fails: `type` and `id` are always
/// representable, and `payload` is copied verbatim.
pub fn encode(kind: PacketType, stream_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push(kind.to_byte());
    buf.extend_from_slice(&stream_id.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Decode a Wisp packet from a byte buffer. `payload` borrows from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Packet<'_>, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Malformed);
    }
    let kind = PacketType::try_from(bytes[0])?;
    let stream_id = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    Ok(Packet {
        kind,
        stream_id,
        payload: &bytes[HEADER_LEN..],
    })
}

/// Encode the CONTINUE credit payload (4-byte LE unsigned).
pub fn encode_continue(stream_id: u32, credit: u32) -> Vec<u8> {
    encode(PacketType::Continue, stream_id, &credit.to_le_bytes())
}

/// Encode a CLOSE frame with the given reason.
pub fn encode_close(stream_id: u32, reason: CloseReason) -> Vec<u8> {
    encode(PacketType::Close, stream_id, &[reason.to_byte()])
}

/// Parsed CONNECT payload: stream kind, port, hostname.
#[derive(Debug)]
pub struct ConnectRequest<'a> {
    pub kind: StreamKind,
    pub port: u16,
    pub host: &'a str,
}

/// Parse a CONNECT packet's payload: 1 byte kind, 2 bytes LE port,
/// remaining bytes raw UTF-8 hostname.
pub fn parse_connect(payload: &[u8]) -> Result<ConnectRequest<'_>, CodecError> {
    if payload.len() < 4 {
        return Err(CodecError::Malformed);
    }
    let kind = StreamKind::try_from(payload[0])?;
    let port = u16::from_le_bytes([payload[1], payload[2]]);
    let host = std::str::from_utf8(&payload[3..]).map_err(|_| CodecError::Malformed)?;
    Ok(ConnectRequest { kind, port, host })
}
