use crate::block::{block_count, from_hex, BLOCK_SIZE};
use crate::error::{Error, Rejection, Result};
use crate::hash::digest;
use crate::session::Session;

/// One verification attempt.
///
/// `AwaitingCandidate -> Verifying -> {Accepted, Rejected}`, with a shortcut
/// from `AwaitingCandidate` straight to `Rejected` for input that never
/// deserves a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
	AwaitingCandidate,
	Verifying { candidate: Vec<u8> },
	Accepted,
	Rejected(Rejection),
}

impl Verification {
	pub fn start() -> Self {
		Self::AwaitingCandidate
	}

	/// Takes the raw wire bytes of a candidate. The length cap is checked on
	/// the hex text before decoding, and again on the decoded bytes.
	pub fn receive(self, wire: &[u8], max_blocks: usize) -> Result<Self> {
		if !matches!(self, Self::AwaitingCandidate) {
			return Err(self.transition_error("receive a candidate"));
		}
		let max_len = max_blocks * BLOCK_SIZE;
		let text = wire.trim_ascii();

		if text.len() > 2 * max_len {
			return Ok(Self::Rejected(Rejection::CandidateTooLong {
				max_blocks,
				got_blocks: block_count(text.len().div_ceil(2)),
			}));
		}
		let candidate = match from_hex(text) {
			Ok(candidate) => candidate,
			Err(err) => return Ok(Self::Rejected(Rejection::InvalidEncoding(err))),
		};
		if candidate.len() > max_len {
			return Ok(Self::Rejected(Rejection::CandidateTooLong {
				max_blocks,
				got_blocks: block_count(candidate.len()),
			}));
		}
		Ok(Self::Verifying { candidate })
	}

	pub fn verify(self, session: &Session) -> Result<Self> {
		let candidate = match self {
			Self::Verifying { candidate } => candidate,
			other => return Err(other.transition_error("verify")),
		};
		if digest(session.oracle(), &candidate) == *session.target_digest() {
			Ok(Self::Accepted)
		} else {
			Ok(Self::Rejected(Rejection::HashMismatch))
		}
	}

	/// Runs a fresh attempt all the way to a terminal state.
	pub fn settle(session: &Session, wire: &[u8]) -> Result<Self> {
		let state = Self::start().receive(wire, session.max_blocks())?;
		if state.is_terminal() {
			return Ok(state);
		}
		state.verify(session)
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Accepted | Self::Rejected(_))
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::AwaitingCandidate => "awaiting-candidate",
			Self::Verifying { .. }  => "verifying",
			Self::Accepted          => "accepted",
			Self::Rejected(_)       => "rejected",
		}
	}

	fn transition_error(&self, action: &'static str) -> Error {
		Error::Transition { action, from: self.name() }
	}
}
