use std::time::Duration;

use thiserror::Error;

use crate::block::BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HexError {
	#[error("invalid hex character")]
	InvalidCharacter,
	#[error("odd number of hex digits")]
	OddLength,
}

/// Reasons a candidate message is turned away. Each one ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
	#[error("candidate is not valid hex: {0}")]
	InvalidEncoding(HexError),
	#[error("candidate is {got_blocks} blocks, max is {max_blocks}")]
	CandidateTooLong { max_blocks: usize, got_blocks: usize },
	#[error("candidate digest does not match the target")]
	HashMismatch,
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("oracle input must be {} bytes, got {len}", BLOCK_SIZE)]
	InvalidBlockLength { len: usize },
	#[error("no candidate within {0:?}")]
	Timeout(Duration),
	#[error("cannot {action} from the {from} state")]
	Transition { action: &'static str, from: &'static str },
	#[error("invalid configuration: {0}")]
	Config(String),
	#[error("json: {0}")]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
