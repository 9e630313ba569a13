use crate::tcp::byte_stream::ByteStream;
use crate::tcp::config::TcpConfig;
use crate::tcp::segment::{TcpHeader, TcpSegment};
use crate::tcp::tcp_flags::TcpFlags;
use crate::tcp::timer::RetransmissionTimer;
use crate::tcp::wrap32::Wrap32;
use rand::Rng;
use std::collections::VecDeque;
use tracing::debug;

/// The sending half of a connection.
///
/// Reads from its outbound `ByteStream`, cuts the bytes into segments that
/// respect the peer's advertised window and the maximum payload size, and
/// keeps every segment outstanding until the cumulative acknowledgment covers
/// it. The oldest outstanding segment is retransmitted when the timer fires,
/// with exponential backoff.
///
/// Sequence accounting is done in absolute 64-bit space; wire values are
/// wrapped only when a segment is built and unwrapped as soon as an
/// acknowledgment arrives, so no wraparound-sensitive comparison exists here.
#[derive(Debug)]
pub struct TcpSender {
    isn: Wrap32,
    next_seqno: u64,  // Absolute seqno of the next byte to send
    acked_seqno: u64, // Highest absolute seqno cumulatively acknowledged
    window_size: u16, // Peer's advertised window; 0 is probed as if it were 1
    fin_sent: bool,
    stream: ByteStream,
    outgoing: VecDeque<TcpSegment>,
    outstanding: VecDeque<(u64, TcpSegment)>, // (absolute start seqno, segment)
    timer: RetransmissionTimer,
    initial_rto: u64,
    consecutive_retransmissions: u32,
    max_payload_size: usize,
}

impl TcpSender {
    pub fn new<R: Rng>(cfg: &TcpConfig, rng: &mut R) -> Self {
        let isn = cfg.fixed_isn.unwrap_or_else(|| Wrap32::new(rng.gen()));
        TcpSender {
            isn,
            next_seqno: 0,
            acked_seqno: 0,
            window_size: 0,
            fin_sent: false,
            stream: ByteStream::new(cfg.send_capacity),
            outgoing: VecDeque::new(),
            outstanding: VecDeque::new(),
            timer: RetransmissionTimer::new(cfg.rt_timeout),
            initial_rto: cfg.rt_timeout,
            consecutive_retransmissions: 0,
            max_payload_size: cfg.max_payload_size,
        }
    }

    /// Emit as many segments as the window allows.
    ///
    /// The first segment of the connection carries SYN; once the stream hits
    /// end-of-input and the FIN slot fits the remaining window, the final
    /// segment carries FIN and the sender stops producing.
    pub fn fill_window(&mut self) {
        if self.fin_sent {
            return;
        }
        // A zero window is probed with a single unit of sequence space
        let window = if self.window_size == 0 {
            1
        } else {
            self.window_size as u64
        };
        let upper_seqno = self.acked_seqno + window;

        while self.next_seqno < upper_seqno {
            let room = (upper_seqno - self.next_seqno) as usize;
            let mut num_bytes = room.min(self.max_payload_size);
            let window_limited = num_bytes == room;
            let syn = self.next_seqno == 0;
            if window_limited && syn {
                num_bytes -= 1; // The SYN slot spends one unit of the window
            }

            let payload = self.stream.read(num_bytes);

            let mut flags = TcpFlags::empty();
            if syn {
                flags |= TcpFlags::SYN;
            }
            // FIN rides along only if its sequence slot still fits
            if self.stream.eof() && (!window_limited || num_bytes > payload.len()) {
                flags |= TcpFlags::FIN;
            }

            let seg = TcpSegment::new(
                TcpHeader {
                    seq_no: Wrap32::wrap(self.next_seqno, self.isn),
                    flags,
                    ..Default::default()
                },
                payload,
            );
            let len = seg.sequence_length();
            if len == 0 {
                break;
            }
            self.outgoing.push_back(seg.clone());
            self.outstanding.push_back((self.next_seqno, seg));
            self.next_seqno += len;
            self.timer.start();

            if flags.contains(TcpFlags::FIN) {
                self.fin_sent = true;
                break;
            }
        }
    }

    /// Process the peer's cumulative acknowledgment and advertised window.
    ///
    /// Acknowledgments for sequence space never sent are ignored. A strictly
    /// advancing acknowledgment resets the timeout and the backoff counter;
    /// segments fully covered by it drop off the front of the outstanding
    /// queue.
    pub fn ack_received(&mut self, ackno: Wrap32, window: u16) {
        let abs_ackno = ackno.unwrap(self.isn, self.next_seqno);
        if abs_ackno > self.next_seqno {
            return;
        }

        let advanced = abs_ackno > self.acked_seqno;
        if advanced {
            self.acked_seqno = abs_ackno;
            self.timer.set_timeout(self.initial_rto);
            self.timer.reset();
            self.consecutive_retransmissions = 0;
        }
        self.window_size = window;

        while let Some((start, seg)) = self.outstanding.front() {
            if start + seg.sequence_length() <= self.acked_seqno {
                self.outstanding.pop_front();
            } else {
                break;
            }
        }
        if self.outstanding.is_empty() {
            self.timer.stop();
        } else if advanced {
            self.timer.start();
        }

        if window > 0 {
            self.fill_window();
        }
    }

    /// Advance the retransmission timer. On expiry the oldest outstanding
    /// segment is queued again; the timeout doubles only when the peer's
    /// window is open (or nothing has been acknowledged yet), since a closed
    /// window is the peer's doing and must not snowball the backoff.
    pub fn tick(&mut self, ms: u64) {
        self.timer.tick(ms);
        if !self.timer.expired() {
            return;
        }

        if let Some((start, seg)) = self.outstanding.front() {
            debug!(abs_seqno = *start, "retransmitting oldest outstanding segment");
            self.outgoing.push_back(seg.clone());
        }
        if self.window_size != 0 || self.acked_seqno == 0 {
            self.consecutive_retransmissions += 1;
            self.timer.set_timeout(self.timer.timeout() * 2);
        }
        self.timer.reset();
        self.timer.start();
    }

    /// Queue a segment that occupies no sequence space, for acknowledgments
    /// and probes. The connection stamps ack and window fields on the way out.
    pub fn send_empty_segment(&mut self) {
        let seg = TcpSegment::new(
            TcpHeader {
                seq_no: Wrap32::wrap(self.next_seqno, self.isn),
                ..Default::default()
            },
            vec![],
        );
        self.outgoing.push_back(seg);
    }

    /// Hand the next produced segment to the caller, transferring ownership.
    pub fn pop_outgoing(&mut self) -> Option<TcpSegment> {
        self.outgoing.pop_front()
    }

    pub fn bytes_in_flight(&self) -> u64 {
        self.next_seqno - self.acked_seqno
    }

    pub fn consecutive_retransmissions(&self) -> u32 {
        self.consecutive_retransmissions
    }

    pub fn fin_sent(&self) -> bool {
        self.fin_sent
    }

    pub fn next_seqno(&self) -> u64 {
        self.next_seqno
    }

    pub fn isn(&self) -> Wrap32 {
        self.isn
    }

    pub fn stream_in(&self) -> &ByteStream {
        &self.stream
    }

    pub fn stream_in_mut(&mut self) -> &mut ByteStream {
        &mut self.stream
    }
}

// -- Unit tests --
