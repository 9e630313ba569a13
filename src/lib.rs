pub mod tcp;

pub use tcp::byte_stream::ByteStream;
pub use tcp::conn::TcpConnection;
pub use tcp::config::TcpConfig;
pub use tcp::errors::TcpError;
pub use tcp::reassembler::Reassembler;
pub use tcp::receiver::TcpReceiver;
pub use tcp::segment::{TcpHeader, TcpSegment};
pub use tcp::sender::TcpSender;
pub use tcp::tcp_flags::TcpFlags;
pub use tcp::timer::RetransmissionTimer;
pub use tcp::wrap32::Wrap32;
