//! Transport-level frames.

use tentacle_types::StreamId;

/// Current wire schema version, first byte of every frame header.
pub const PROTOCOL_VERSION: u8 = 1;

/// Header length in bytes: version (1) + sequence (8) + payload length (4).
pub const HEADER_LEN: usize = 13;

/// One transport-level unit carrying an encoded command.
///
/// Frames are created by the transport, consumed by the decoder and
/// discarded after decode. The sequence number is monotonic per
/// stream; the stream id is attached by the receiving session (it is
/// not carried on the wire — a connection is a stream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Schema version from the frame header.
    pub version: u8,
    /// Sequence number, monotonic within the stream.
    pub seq: u64,
    /// Originating stream.
    pub stream: StreamId,
    /// Encoded payload bytes.
    pub payload: Vec<u8>,
}

impl CommandFrame {
    /// Creates a frame with the current protocol version.
    #[must_use]
    pub fn new(seq: u64, stream: StreamId, payload: Vec<u8>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            seq,
            stream,
            payload,
        }
    }

    /// Builds the header bytes for a payload of `len` bytes.
    #[must_use]
    pub fn header(version: u8, seq: u64, len: u32) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0] = version;
        header[1..9].copy_from_slice(&seq.to_be_bytes());
        header[9..13].copy_from_slice(&len.to_be_bytes());
        header
    }

    /// Parses a header into `(version, seq, payload_len)`.
    #[must_use]
    pub fn parse_header(header: &[u8; HEADER_LEN]) -> (u8, u64, u32) {
        let version = header[0];
        let mut seq = [0u8; 8];
        seq.copy_from_slice(&header[1..9]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&header[9..13]);
        (version, u64::from_be_bytes(seq), u32::from_be_bytes(len))
    }

    /// Serializes this frame to raw wire bytes (header + payload).
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&Self::header(
            self.version,
            self.seq,
            self.payload.len() as u32,
        ));
        out.extend_from_slice(&self.payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = CommandFrame::header(PROTOCOL_VERSION, 42, 1024);
        let (version, seq, len) = CommandFrame::parse_header(&header);
        assert_eq!(version, PROTOCOL_VERSION);
        assert_eq!(seq, 42);
        assert_eq!(len, 1024);
    }

    #[test]
    fn wire_bytes_layout() {
        let frame = CommandFrame::new(7, StreamId::new(), b"abc".to_vec());
        let wire = frame.to_wire();
        assert_eq!(wire.len(), HEADER_LEN + 3);
        assert_eq!(wire[0], PROTOCOL_VERSION);
        assert_eq!(&wire[HEADER_LEN..], b"abc");
    }
}
