use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TcpError {
    #[error("segment truncated: need {expected} bytes, got {found}")]
    TruncatedSegment { expected: usize, found: usize },
}
