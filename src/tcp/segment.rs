use crate::tcp::errors::TcpError;
use crate::tcp::tcp_flags::TcpFlags;
use crate::tcp::wrap32::Wrap32;

/// Fixed-size segment header: sequence number, acknowledgment number
/// (meaningful only when the ACK flag is set), advertised window and flags.
///
/// Ports and checksums belong to the layers below and are not carried here.
#[derive(Debug, Clone, PartialEq)]
pub struct TcpHeader {
    pub seq_no: Wrap32,
    pub ack_no: Wrap32,
    pub window: u16,
    pub flags: TcpFlags,
}

impl Default for TcpHeader {
    fn default() -> Self {
        TcpHeader {
            seq_no: Wrap32::new(0),
            ack_no: Wrap32::new(0),
            window: 0,
            flags: TcpFlags::empty(),
        }
    }
}

/// The unit handed to and received from the unreliable datagram channel.
#[derive(Debug, Clone, PartialEq)]
pub struct TcpSegment {
    pub header: TcpHeader,
    pub payload: Vec<u8>,
}

impl TcpSegment {
    pub const HEADER_LEN: usize = 12;

    pub fn new(header: TcpHeader, payload: Vec<u8>) -> Self {
        TcpSegment { header, payload }
    }

    /// How much sequence space this segment occupies. SYN and FIN each
    /// consume one unit on top of the payload bytes.
    pub fn sequence_length(&self) -> u64 {
        let mut len = self.payload.len() as u64;
        if self.header.flags.contains(TcpFlags::SYN) {
            len += 1;
        }
        if self.header.flags.contains(TcpFlags::FIN) {
            len += 1;
        }
        len
    }

    /// Convert the segment into its wire form:
    /// `[seq:4][ack:4][window:2][flags:1][reserved:1]` followed by the payload,
    /// all integers big-endian. The payload length is implied by the datagram
    /// length.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.header.seq_no.value().to_be_bytes());
        buf.extend_from_slice(&self.header.ack_no.value().to_be_bytes());
        buf.extend_from_slice(&self.header.window.to_be_bytes());
        buf.push(self.header.flags.bits());
        buf.push(0);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse a segment from its wire form.
    pub fn parse(buf: &[u8]) -> Result<Self, TcpError> {
        if buf.len() < Self::HEADER_LEN {
            return Err(TcpError::TruncatedSegment {
                expected: Self::HEADER_LEN,
                found: buf.len(),
            });
        }

        let seq_no = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let ack_no = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let window = u16::from_be_bytes([buf[8], buf[9]]);
        let flags = TcpFlags::from_bits_truncate(buf[10]);

        Ok(TcpSegment {
            header: TcpHeader {
                seq_no: Wrap32::new(seq_no),
                ack_no: Wrap32::new(ack_no),
                window,
                flags,
            },
            payload: buf[Self::HEADER_LEN..].to_vec(),
        })
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_length() {
        let mut seg = TcpSegment::new(TcpHeader::default(), b"abc".to_vec());
        assert_eq!(seg.sequence_length(), 3);

        seg.header.flags = TcpFlags::SYN;
        assert_eq!(seg.sequence_length(), 4);

        seg.header.flags = TcpFlags::SYN | TcpFlags::FIN;
        assert_eq!(seg.sequence_length(), 5);

        let empty_ack = TcpSegment::new(
            TcpHeader {
                flags: TcpFlags::ACK,
                ..Default::default()
            },
            vec![],
        );
        assert_eq!(empty_ack.sequence_length(), 0);
    }

    #[test]
    fn test_serialize_parse_roundtrip() {
        let seg = TcpSegment::new(
            TcpHeader {
                seq_no: Wrap32::new(0xdeadbeef),
                ack_no: Wrap32::new(0x01020304),
                window: 4096,
                flags: TcpFlags::ACK | TcpFlags::FIN,
            },
            b"payload".to_vec(),
        );

        let wire = seg.serialize();
        assert_eq!(wire.len(), TcpSegment::HEADER_LEN + 7);
        assert_eq!(TcpSegment::parse(&wire).unwrap(), seg);
    }

    #[test]
    fn test_parse_known_bytes() {
        // seq 0x00000001, ack 0x000003e9, window 0xffff, SYN|ACK, no payload
        let wire = hex::decode("00000001000003e9ffff1200").unwrap();
        let seg = TcpSegment::parse(&wire).unwrap();
        assert_eq!(seg.header.seq_no, Wrap32::new(1));
        assert_eq!(seg.header.ack_no, Wrap32::new(1001));
        assert_eq!(seg.header.window, u16::MAX);
        assert_eq!(seg.header.flags, TcpFlags::SYN | TcpFlags::ACK);
        assert!(seg.payload.is_empty());
    }

    #[test]
    fn test_parse_truncated() {
        let err = TcpSegment::parse(&[0u8; 5]).unwrap_err();
        assert_eq!(
            err,
            TcpError::TruncatedSegment {
                expected: 12,
                found: 5
            }
        );
    }
}
