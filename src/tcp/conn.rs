use crate::tcp::byte_stream::ByteStream;
use crate::tcp::config::TcpConfig;
use crate::tcp::receiver::TcpReceiver;
use crate::tcp::segment::{TcpHeader, TcpSegment};
use crate::tcp::sender::TcpSender;
use crate::tcp::tcp_flags::TcpFlags;
use rand::Rng;
use std::collections::VecDeque;
use tracing::warn;

/// One TCP connection: a `TcpSender` and `TcpReceiver` composed into a single
/// state machine.
///
/// The connection is cooperatively driven. Segments arrive through
/// `segment_received`, the application pushes bytes with `write` and
/// half-closes with `end_input_stream`, and time advances only through
/// `tick`. Produced segments accumulate in an internal queue the host drains
/// with `pop_segment` and hands to the datagram channel.
#[derive(Debug)]
pub struct TcpConnection {
    cfg: TcpConfig,
    sender: TcpSender,
    receiver: TcpReceiver,
    outgoing: VecDeque<TcpSegment>,
    time_ms: u64,
    last_segment_received_ms: u64,
    linger_after_streams_finish: bool,
    active: bool,
}

impl TcpConnection {
    pub fn new<R: Rng>(cfg: TcpConfig, rng: &mut R) -> Self {
        let sender = TcpSender::new(&cfg, rng);
        let receiver = TcpReceiver::new(cfg.recv_capacity);
        TcpConnection {
            cfg,
            sender,
            receiver,
            outgoing: VecDeque::new(),
            time_ms: 0,
            last_segment_received_ms: 0,
            linger_after_streams_finish: true,
            active: true,
        }
    }

    /// Begin the handshake by letting the sender emit its SYN.
    pub fn connect(&mut self) {
        self.sender.fill_window();
        self.flush(false);
        self.evaluate_close();
    }

    /// Process a segment that arrived from the peer.
    pub fn segment_received(&mut self, seg: &TcpSegment) {
        if !self.active {
            return;
        }
        self.last_segment_received_ms = self.time_ms;

        // RST short-circuits everything
        if seg.header.flags.contains(TcpFlags::RST) {
            self.reset_streams();
            return;
        }

        self.receiver.segment_received(seg);

        // The peer closed its side before we finished ours: once we are done
        // there is nothing left worth waiting for
        if self.receiver.stream_out().input_ended() && !self.sender.fin_sent() {
            self.linger_after_streams_finish = false;
        }
        self.evaluate_close();

        if seg.header.flags.contains(TcpFlags::ACK) {
            self.sender
                .ack_received(seg.header.ack_no, seg.header.window);
            self.sender.fill_window();
            self.flush(false);
        }

        // Anything occupying sequence space must draw at least one reply
        if seg.sequence_length() > 0 {
            self.sender.fill_window();
            if !self.flush(false) {
                self.sender.send_empty_segment();
            }
            self.flush(false);
        }
        self.evaluate_close();
    }

    /// Push application bytes into the outbound stream. Returns how many were
    /// accepted; the rest must be retried once the buffer drains.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if !self.active {
            return 0;
        }
        let written = self.sender.stream_in_mut().write(data);
        self.sender.fill_window();
        self.flush(false);
        self.evaluate_close();
        written
    }

    /// Half-close: no more application bytes will be written.
    pub fn end_input_stream(&mut self) {
        if !self.active {
            return;
        }
        self.sender.stream_in_mut().end_input();
        self.sender.fill_window();
        self.flush(false);
        self.evaluate_close();
    }

    /// Inject elapsed time. Drives retransmission and, past the retry budget,
    /// the abort path.
    pub fn tick(&mut self, ms: u64) {
        if !self.active {
            return;
        }
        self.time_ms += ms;
        self.sender.tick(ms);

        if self.sender.consecutive_retransmissions() > self.cfg.max_retx_attempts {
            warn!(
                attempts = self.sender.consecutive_retransmissions(),
                "retransmission budget exhausted, aborting connection"
            );
            self.abort();
            return;
        }

        self.flush(false);
        self.evaluate_close();
    }

    /// Take the next segment bound for the peer, if any.
    pub fn pop_segment(&mut self) -> Option<TcpSegment> {
        self.outgoing.pop_front()
    }

    /// Whether the connection may still do useful work.
    pub fn active(&self) -> bool {
        self.active
    }

    pub fn bytes_in_flight(&self) -> u64 {
        self.sender.bytes_in_flight()
    }

    pub fn unassembled_bytes(&self) -> u64 {
        self.receiver.unassembled_bytes()
    }

    pub fn remaining_outbound_capacity(&self) -> usize {
        self.sender.stream_in().remaining_capacity()
    }

    pub fn time_since_last_segment_received(&self) -> u64 {
        self.time_ms - self.last_segment_received_ms
    }

    /// The reassembled inbound stream, for the application to read.
    pub fn inbound_stream(&self) -> &ByteStream {
        self.receiver.stream_out()
    }

    pub fn inbound_stream_mut(&mut self) -> &mut ByteStream {
        self.receiver.stream_out_mut()
    }

    /// The outbound stream the application writes into.
    pub fn outbound_stream(&self) -> &ByteStream {
        self.sender.stream_in()
    }

    /// Drain the sender's produced segments into the connection queue,
    /// stamping each with the current ack, window and (optionally) RST.
    fn flush(&mut self, rst: bool) -> bool {
        let mut sent = false;
        while let Some(mut seg) = self.sender.pop_outgoing() {
            sent = true;
            Self::stamp(&self.receiver, &mut seg.header, rst);
            self.outgoing.push_back(seg);
        }
        sent
    }

    fn stamp(receiver: &TcpReceiver, header: &mut TcpHeader, rst: bool) {
        if let Some(ackno) = receiver.ackno() {
            header.ack_no = ackno;
            header.flags |= TcpFlags::ACK;
        }
        header.window = receiver.window_size().min(u16::MAX as u64) as u16;
        if rst {
            header.flags |= TcpFlags::RST;
        }
    }

    /// Terminal, idempotent teardown: make sure one RST-stamped segment goes
    /// out, then latch both streams into the error state.
    fn abort(&mut self) {
        self.sender.fill_window();
        if !self.flush(true) {
            self.sender.send_empty_segment();
        }
        self.flush(true);
        self.reset_streams();
    }

    fn reset_streams(&mut self) {
        self.receiver.stream_out_mut().set_error();
        self.sender.stream_in_mut().set_error();
        self.active = false;
    }

    /// The shutdown prerequisites, as a pure function of the two halves:
    /// inbound stream ended and fully reassembled, FIN sent, nothing in
    /// flight.
    fn fully_finished(receiver: &TcpReceiver, sender: &TcpSender) -> bool {
        receiver.stream_out().input_ended()
            && receiver.unassembled_bytes() == 0
            && sender.fin_sent()
            && sender.bytes_in_flight() == 0
    }

    /// Re-evaluated after every event. With lingering disabled the connection
    /// retires the moment the prerequisites hold; otherwise it waits out a
    /// grace period since the last received segment, long enough to absorb a
    /// retransmitted final segment from the peer.
    fn evaluate_close(&mut self) {
        if !Self::fully_finished(&self.receiver, &self.sender) {
            return;
        }
        let lingered_out = self.time_since_last_segment_received()
            >= self.cfg.linger_factor * self.cfg.rt_timeout;
        if !self.linger_after_streams_finish || lingered_out {
            self.active = false;
        }
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        if self.active {
            warn!("unclean shutdown of TcpConnection, sending RST");
            self.abort();
        }
    }
}

// -- Unit tests --
