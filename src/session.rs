use std::collections::HashSet;

use rand::{CryptoRng, RngCore};
use serde::Serialize;

use crate::block::{block_count, to_hex, Block, BLOCK_SIZE};
use crate::config::{ChallengeParams, Disclosure};
use crate::hash::digest;
use crate::oracle::Oracle;

/// One disclosed `(x, f(x))` sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakedPair {
	pub x: Block,
	pub fx: Block,
}

#[derive(Serialize)]
struct HexPair {
	x: String,
	fx: String,
}

impl Serialize for LeakedPair {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		HexPair { x: to_hex(self.x), fx: to_hex(self.fx) }.serialize(serializer)
	}
}

/// Per-connection challenge state. Nothing here is shared between connections.
#[derive(Debug)]
pub struct Session {
	oracle: Oracle,
	target: Vec<u8>,
	target_digest: Block,
	pairs: Vec<LeakedPair>,
	max_blocks: usize,
	disclosure: Disclosure,
}

impl Session {
	pub fn generate<R: RngCore + CryptoRng>(params: &ChallengeParams, rng: &mut R) -> Self {
		let mut target = vec![0; params.target_block_count() * BLOCK_SIZE];
		rng.fill_bytes(&mut target);
		Self::with_target(params, target, rng)
	}

	/// Builds a session around a caller-chosen target message. The key and
	/// the leaked pairs are still drawn from `rng`.
	pub fn with_target<R: RngCore + CryptoRng>(params: &ChallengeParams, target: Vec<u8>, rng: &mut R) -> Self {
		let mut key = [0; BLOCK_SIZE];
		rng.fill_bytes(&mut key);
		let oracle = Oracle::new(&key);

		let target_digest = digest(&oracle, &target);
		let pairs = leak_pairs(&oracle, params.pair_count, rng);

		Self {
			oracle,
			target,
			target_digest,
			pairs,
			max_blocks: params.max_blocks,
			disclosure: params.disclosure,
		}
	}

	pub fn oracle(&self) -> &Oracle {
		&self.oracle
	}

	pub fn target_digest(&self) -> &Block {
		&self.target_digest
	}

	pub fn pairs(&self) -> &[LeakedPair] {
		&self.pairs
	}

	pub fn max_blocks(&self) -> usize {
		self.max_blocks
	}

	pub fn max_len(&self) -> usize {
		self.max_blocks * BLOCK_SIZE
	}

	pub fn target_blocks(&self) -> usize {
		block_count(self.target.len())
	}

	/// The target plaintext, only available in the weaker disclosure mode.
	pub fn disclosed_target(&self) -> Option<&[u8]> {
		match self.disclosure {
			Disclosure::DigestOnly    => None,
			Disclosure::WithPlaintext => Some(&self.target),
		}
	}
}

fn leak_pairs<R: RngCore>(oracle: &Oracle, count: usize, rng: &mut R) -> Vec<LeakedPair> {
	let mut seen = HashSet::with_capacity(count);
	let mut pairs = Vec::with_capacity(count);
	while pairs.len() < count {
		let mut x = [0; BLOCK_SIZE];
		rng.fill_bytes(&mut x);
		if !seen.insert(x) {
			continue;
		}
		pairs.push(LeakedPair { x, fx: oracle.encrypt(&x) });
	}
	pairs
}
