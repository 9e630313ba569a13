pub mod byte_stream;
pub mod config;
pub mod conn;
pub mod errors;
pub mod reassembler;
pub mod receiver;
pub mod segment;
pub mod sender;
pub mod tcp_flags;
pub mod timer;
pub mod wrap32;

// -- Re-export structs for more concise usage

pub use byte_stream::ByteStream;
pub use config::TcpConfig;
pub use conn::TcpConnection;
pub use errors::TcpError;
pub use reassembler::Reassembler;
pub use receiver::TcpReceiver;
pub use segment::{TcpHeader, TcpSegment};
pub use sender::TcpSender;
pub use tcp_flags::TcpFlags;
pub use timer::RetransmissionTimer;
pub use wrap32::Wrap32;
