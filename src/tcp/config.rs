use crate::tcp::wrap32::Wrap32;

/// Static per-connection tuning knobs.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Capacity of the outbound (application write) byte stream.
    pub send_capacity: usize,
    /// Capacity of the inbound (reassembled) byte stream.
    pub recv_capacity: usize,
    /// Initial retransmission timeout in milliseconds.
    pub rt_timeout: u64,
    /// Consecutive retransmissions tolerated before the connection aborts.
    pub max_retx_attempts: u32,
    /// Largest payload placed in a single segment, sized to dodge
    /// fragmentation at the link layer.
    pub max_payload_size: usize,
    /// Fixed ISN instead of a random one. Test use only.
    pub fixed_isn: Option<Wrap32>,
    /// After a clean close, linger for this multiple of `rt_timeout` since
    /// the last received segment before retiring the connection.
    pub linger_factor: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        TcpConfig {
            send_capacity: 64000,
            recv_capacity: 64000,
            rt_timeout: 1000,
            max_retx_attempts: 8,
            max_payload_size: 1000,
            fixed_isn: None,
            linger_factor: 10,
        }
    }
}
