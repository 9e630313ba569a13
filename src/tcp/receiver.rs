use crate::tcp::byte_stream::ByteStream;
use crate::tcp::reassembler::Reassembler;
use crate::tcp::segment::TcpSegment;
use crate::tcp::tcp_flags::TcpFlags;
use crate::tcp::wrap32::Wrap32;

/// The receiving half of a connection.
///
/// Latches the peer's ISN from the first SYN, translates wire sequence
/// numbers into stream offsets, and feeds payloads to a `Reassembler`. From
/// the reassembled stream it derives the acknowledgment number and the window
/// to advertise back to the peer.
#[derive(Debug)]
pub struct TcpReceiver {
    isn: Option<Wrap32>,
    capacity: usize,
    reassembler: Reassembler,
}

impl TcpReceiver {
    pub fn new(capacity: usize) -> Self {
        TcpReceiver {
            isn: None,
            capacity,
            reassembler: Reassembler::new(ByteStream::new(capacity)),
        }
    }

    pub fn segment_received(&mut self, seg: &TcpSegment) {
        let syn = seg.header.flags.contains(TcpFlags::SYN);
        if syn && self.isn.is_none() {
            self.isn = Some(seg.header.seq_no);
        }
        // Nothing to anchor sequence numbers to before the SYN
        let Some(isn) = self.isn else {
            return;
        };

        // The last reassembled byte is the best guess at the stream position
        let checkpoint = self.reassembler.stream_out().bytes_written() + 1;
        let abs_seqno = seg.header.seq_no.unwrap(isn, checkpoint);
        if !syn && abs_seqno == 0 {
            // Claims the ISN's slot without carrying SYN: stale, drop it
            return;
        }

        // The SYN occupies absolute slot 0 but is not a stream byte
        let stream_index = if syn && abs_seqno == 0 { 0 } else { abs_seqno - 1 };
        let is_last = seg.header.flags.contains(TcpFlags::FIN);
        self.reassembler.insert(stream_index, &seg.payload, is_last);
    }

    /// The acknowledgment number to send: one past everything reassembled so
    /// far, counting the SYN and (once the stream has ended) the FIN slots.
    /// `None` until the peer's SYN has arrived.
    pub fn ackno(&self) -> Option<Wrap32> {
        let isn = self.isn?;
        let mut abs = self.reassembler.stream_out().bytes_written() + 1;
        if self.reassembler.stream_out().input_ended() {
            abs += 1;
        }
        Some(Wrap32::wrap(abs, isn))
    }

    /// Remaining room in the receive buffer. Unclamped; fitting it into the
    /// 16-bit wire field is the connection's concern.
    pub fn window_size(&self) -> u64 {
        let first_unacceptable = self.reassembler.stream_out().bytes_read() + self.capacity as u64;
        first_unacceptable - self.reassembler.stream_out().bytes_written()
    }

    pub fn unassembled_bytes(&self) -> u64 {
        self.reassembler.unassembled_bytes()
    }

    pub fn stream_out(&self) -> &ByteStream {
        self.reassembler.stream_out()
    }

    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        self.reassembler.stream_out_mut()
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcp::segment::TcpHeader;

    fn seg(seq_no: u32, flags: TcpFlags, payload: &[u8]) -> TcpSegment {
        TcpSegment::new(
            TcpHeader {
                seq_no: Wrap32::new(seq_no),
                flags,
                ..Default::default()
            },
            payload.to_vec(),
        )
    }

    #[test]
    fn test_no_ackno_before_syn() {
        let mut rx = TcpReceiver::new(4000);
        assert_eq!(rx.ackno(), None);

        // Data before the SYN has nothing to anchor to
        rx.segment_received(&seg(5, TcpFlags::empty(), b"early"));
        assert_eq!(rx.stream_out().bytes_written(), 0);
    }

    #[test]
    fn test_syn_latches_isn() {
        let mut rx = TcpReceiver::new(4000);
        rx.segment_received(&seg(1000, TcpFlags::SYN, b""));
        assert_eq!(rx.ackno(), Some(Wrap32::new(1001)));
        assert_eq!(rx.window_size(), 4000);
    }

    #[test]
    fn test_data_advances_ackno() {
        let mut rx = TcpReceiver::new(4000);
        rx.segment_received(&seg(1000, TcpFlags::SYN, b""));
        rx.segment_received(&seg(1001, TcpFlags::empty(), b"abcd"));
        assert_eq!(rx.ackno(), Some(Wrap32::new(1005)));
        assert_eq!(rx.window_size(), 3996);
        assert_eq!(rx.stream_out_mut().read(4), b"abcd");
        assert_eq!(rx.window_size(), 4000);
    }

    #[test]
    fn test_syn_with_payload() {
        let mut rx = TcpReceiver::new(4000);
        rx.segment_received(&seg(1000, TcpFlags::SYN, b"hi"));
        assert_eq!(rx.ackno(), Some(Wrap32::new(1003)));
        assert_eq!(rx.stream_out_mut().read(2), b"hi");
    }

    #[test]
    fn test_out_of_order_segment_held() {
        let mut rx = TcpReceiver::new(4000);
        rx.segment_received(&seg(1000, TcpFlags::SYN, b""));
        rx.segment_received(&seg(1005, TcpFlags::empty(), b"efgh"));
        assert_eq!(rx.ackno(), Some(Wrap32::new(1001)));
        assert_eq!(rx.unassembled_bytes(), 4);

        rx.segment_received(&seg(1001, TcpFlags::empty(), b"abcd"));
        assert_eq!(rx.ackno(), Some(Wrap32::new(1009)));
        assert_eq!(rx.unassembled_bytes(), 0);
    }

    #[test]
    fn test_fin_adds_sequence_slot() {
        let mut rx = TcpReceiver::new(4000);
        rx.segment_received(&seg(1000, TcpFlags::SYN, b""));
        rx.segment_received(&seg(1001, TcpFlags::FIN, b"bye"));

        assert!(rx.stream_out().input_ended());
        // 1000 (SYN) + 3 bytes + 1 (FIN) + 1
        assert_eq!(rx.ackno(), Some(Wrap32::new(1005)));
    }

    #[test]
    fn test_fin_held_until_gap_filled() {
        let mut rx = TcpReceiver::new(4000);
        rx.segment_received(&seg(1000, TcpFlags::SYN, b""));
        rx.segment_received(&seg(1003, TcpFlags::FIN, b"cd"));
        assert!(!rx.stream_out().input_ended());
        assert_eq!(rx.ackno(), Some(Wrap32::new(1001)));

        rx.segment_received(&seg(1001, TcpFlags::empty(), b"ab"));
        assert!(rx.stream_out().input_ended());
        assert_eq!(rx.ackno(), Some(Wrap32::new(1006)));
    }

    #[test]
    fn test_segment_past_fin_ignored() {
        // A duplicating or hostile channel can deliver payload claiming
        // sequence space past an already-delivered FIN; it must vanish
        // without touching the stream
        let mut rx = TcpReceiver::new(4000);
        rx.segment_received(&seg(1000, TcpFlags::SYN, b""));
        rx.segment_received(&seg(1001, TcpFlags::FIN, b"ab"));
        assert!(rx.stream_out().input_ended());
        assert_eq!(rx.ackno(), Some(Wrap32::new(1004)));

        rx.segment_received(&seg(1003, TcpFlags::empty(), b"cd"));
        assert_eq!(rx.unassembled_bytes(), 0);
        assert_eq!(rx.stream_out().bytes_written(), 2);
        assert_eq!(rx.ackno(), Some(Wrap32::new(1004)));
        assert_eq!(rx.stream_out_mut().read(2), b"ab");
    }

    #[test]
    fn test_isn_near_wraparound() {
        let mut rx = TcpReceiver::new(4000);
        rx.segment_received(&seg(u32::MAX - 1, TcpFlags::SYN, b""));
        rx.segment_received(&seg(u32::MAX, TcpFlags::empty(), b"ab"));
        assert_eq!(rx.ackno(), Some(Wrap32::new(1)));
        assert_eq!(rx.stream_out_mut().read(2), b"ab");
    }

    #[test]
    fn test_duplicate_segment_ignored() {
        let mut rx = TcpReceiver::new(4000);
        rx.segment_received(&seg(1000, TcpFlags::SYN, b""));
        rx.segment_received(&seg(1001, TcpFlags::empty(), b"abcd"));
        rx.segment_received(&seg(1001, TcpFlags::empty(), b"abcd"));
        assert_eq!(rx.stream_out().bytes_written(), 4);
        assert_eq!(rx.ackno(), Some(Wrap32::new(1005)));
    }
}
