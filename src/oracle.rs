use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::cipher::generic_array::GenericArray;

use crate::block::{Block, BLOCK_SIZE};
use crate::error::{Error, Result};

/// The keyed permutation `f`: one AES-128 block encryption, no IV, no chaining.
///
/// Only the expanded cipher is kept; the raw key is dropped once the cipher
/// is built.
pub struct Oracle {
	cipher: Aes128,
}

impl Oracle {
	pub fn new(key: &Block) -> Self {
		Self { cipher: Aes128::new(GenericArray::from_slice(key)) }
	}

	pub fn encrypt(&self, block: &Block) -> Block {
		let mut b = GenericArray::clone_from_slice(block);
		self.cipher.encrypt_block(&mut b);
		let mut out = [0; BLOCK_SIZE];
		out.copy_from_slice(&b);
		out
	}

	/// Untyped entry point for callers holding a byte slice.
	pub fn apply(&self, input: &[u8]) -> Result<Block> {
		let block: &Block = input.try_into()
			.map_err(|_| Error::InvalidBlockLength { len: input.len() })?;
		Ok(self.encrypt(block))
	}
}

impl std::fmt::Debug for Oracle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("Oracle { .. }")
	}
}
