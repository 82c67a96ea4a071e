//! Message framing of the simulation link.
//!
//! Every message starts with a fixed 64-byte header holding a JSON object,
//! padded with NUL (or space) bytes:
//!
//! ```text
//! {"Size":<payload bytes>,"MaxPacket":<largest packet>,"IDs":<packet count>}
//! ```
//!
//! The payload follows as `IDs` back-to-back packets of `MaxPacket` bytes
//! (the last one shorter). A header with `Size == 0` is a heartbeat.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::{self, ErrorKind};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const HEADER_LEN: usize = 64;

/// Largest payload accepted from the link (256 MiB).
pub const MAX_PAYLOAD_BYTES: u64 = 256 << 20;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame header: {0}")]
    Header(#[from] serde_json::Error),

    #[error("frame header is {0} bytes, limit is {HEADER_LEN}")]
    HeaderTooLong(usize),

    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD_BYTES} byte limit")]
    TooLarge(u64),

    #[error("MaxPacket is 0 for a {0} byte payload")]
    ZeroPacket(u64),

    #[error("{size} bytes in packets of {max_packet} need {expected} packets, header says {actual}")]
    PacketCount {
        size: u64,
        max_packet: u64,
        expected: u64,
        actual: u64,
    },

    #[error("no data for {0:?}")]
    Idle(Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "MaxPacket")]
    pub max_packet: u64,
    #[serde(rename = "IDs")]
    pub packets: u64,
}

impl FrameHeader {
    /// Header for sending `size` bytes in packets of at most `max_packet`.
    pub fn for_payload(size: u64, max_packet: u64) -> Self {
        let packets = if size == 0 { 0 } else { size.div_ceil(max_packet.max(1)) };
        Self {
            size,
            max_packet,
            packets,
        }
    }

    pub fn heartbeat() -> Self {
        Self::for_payload(0, 0)
    }

    pub fn is_heartbeat(&self) -> bool {
        self.size == 0
    }

    pub fn parse(raw: &[u8; HEADER_LEN]) -> Result<Self, FrameError> {
        let end = raw
            .iter()
            .rposition(|&b| b != 0 && b != b' ')
            .map_or(0, |i| i + 1);
        let header: FrameHeader = serde_json::from_slice(&raw[..end])?;
        header.validate()?;
        Ok(header)
    }

    pub fn encode(&self) -> Result<[u8; HEADER_LEN], FrameError> {
        let json = serde_json::to_vec(self)?;
        if json.len() > HEADER_LEN {
            return Err(FrameError::HeaderTooLong(json.len()));
        }
        let mut out = [0u8; HEADER_LEN];
        out[..json.len()].copy_from_slice(&json);
        Ok(out)
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        if self.size > MAX_PAYLOAD_BYTES {
            return Err(FrameError::TooLarge(self.size));
        }
        if self.size == 0 {
            return Ok(());
        }
        if self.max_packet == 0 {
            return Err(FrameError::ZeroPacket(self.size));
        }
        let expected = self.size.div_ceil(self.max_packet);
        if expected != self.packets {
            return Err(FrameError::PacketCount {
                size: self.size,
                max_packet: self.max_packet,
                expected,
                actual: self.packets,
            });
        }
        Ok(())
    }

    /// Length of every packet, in arrival order.
    pub fn packet_lengths(&self) -> impl Iterator<Item = usize> {
        let (size, max) = (self.size, self.max_packet.max(1));
        (0..self.packets).map(move |i| (size - i * max).min(max) as usize)
    }
}

/// One message read off the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Heartbeat,
    Payload(Vec<u8>),
}

async fn within<T>(idle: Duration, io: impl Future<Output = io::Result<T>>) -> Result<T, FrameError> {
    tokio::time::timeout(idle, io)
        .await
        .map_err(|_| FrameError::Idle(idle))?
        .map_err(FrameError::from)
}

/// Reads the next message. Returns `Ok(None)` if the stream ends cleanly
/// between messages. Every read must make progress within `idle`.
pub async fn read_frame<R>(reader: &mut R, idle: Duration) -> Result<Option<Frame>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut raw = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = within(idle, reader.read(&mut raw[filled..])).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated frame header").into());
        }
        filled += n;
    }

    let header = FrameHeader::parse(&raw)?;
    if header.is_heartbeat() {
        return Ok(Some(Frame::Heartbeat));
    }

    let mut payload = vec![0u8; header.size as usize];
    let mut start = 0;
    for len in header.packet_lengths() {
        within(idle, reader.read_exact(&mut payload[start..start + len])).await?;
        start += len;
    }
    log::trace!("Reassembled {} bytes from {} packets", header.size, header.packets);

    Ok(Some(Frame::Payload(payload)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(1);

    fn message(payload: &[u8], max_packet: u64) -> Vec<u8> {
        let header = FrameHeader::for_payload(payload.len() as u64, max_packet);
        let mut out = header.encode().unwrap().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn header_parses_padded_json() {
        let mut raw = [b' '; HEADER_LEN];
        let json = br#"{"Size":10,"MaxPacket":4,"IDs":3}"#;
        raw[..json.len()].copy_from_slice(json);
        let h = FrameHeader::parse(&raw).unwrap();
        assert_eq!(h, FrameHeader { size: 10, max_packet: 4, packets: 3 });
        assert_eq!(h.packet_lengths().collect::<Vec<_>>(), vec![4, 4, 2]);
    }

    #[test]
    fn header_rejects_inconsistent_packet_count() {
        let h = FrameHeader { size: 10, max_packet: 4, packets: 2 };
        let raw = h.encode().unwrap();
        assert!(matches!(
            FrameHeader::parse(&raw),
            Err(FrameError::PacketCount { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn header_rejects_oversized_payload() {
        let h = FrameHeader::for_payload(MAX_PAYLOAD_BYTES + 1, 1 << 20);
        assert!(matches!(h.validate(), Err(FrameError::TooLarge(_))));
        assert!(matches!(
            FrameHeader { size: 5, max_packet: 0, packets: 1 }.validate(),
            Err(FrameError::ZeroPacket(5))
        ));
    }

    #[test]
    fn header_rejects_garbage() {
        let raw = [b'x'; HEADER_LEN];
        assert!(matches!(FrameHeader::parse(&raw), Err(FrameError::Header(_))));
    }

    #[tokio::test]
    async fn reassembles_multi_packet_payload() {
        let payload: Vec<u8> = (0..=255).collect();
        let mut stream = message(&payload, 100);
        stream.extend(FrameHeader::heartbeat().encode().unwrap());
        stream.extend(message(b"tail", 1024));

        let mut reader = stream.as_slice();
        assert_eq!(
            read_frame(&mut reader, IDLE).await.unwrap(),
            Some(Frame::Payload(payload))
        );
        assert_eq!(read_frame(&mut reader, IDLE).await.unwrap(), Some(Frame::Heartbeat));
        assert_eq!(
            read_frame(&mut reader, IDLE).await.unwrap(),
            Some(Frame::Payload(b"tail".to_vec()))
        );
        assert_eq!(read_frame(&mut reader, IDLE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn truncated_stream_is_an_error() {
        let stream = message(&[1, 2, 3, 4, 5], 2);
        let mut reader = &stream[..HEADER_LEN + 3];
        assert!(matches!(
            read_frame(&mut reader, IDLE).await,
            Err(FrameError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof
        ));

        let mut reader = &stream[..10];
        assert!(matches!(read_frame(&mut reader, IDLE).await, Err(FrameError::Io(_))));
    }

    #[tokio::test]
    async fn silent_link_hits_idle_deadline() {
        let (mut client, _server) = tokio::io::duplex(64);
        let err = read_frame(&mut client, Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, FrameError::Idle(_)));
    }
}
