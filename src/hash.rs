use crate::block::{xor, zero_padded_blocks, Block, ZERO_BLOCK};
use crate::oracle::Oracle;

/// `h_i = m_i ^ f(h_{i-1} ^ m_i)`
pub fn step(oracle: &Oracle, prev: &Block, msg_block: &Block) -> Block {
	let inner = xor(prev, msg_block);
	let out = oracle.encrypt(&inner);
	xor(msg_block, &out)
}

/// Iterated hash over the zero-padded message, starting from the zero block.
pub fn digest(oracle: &Oracle, message: &[u8]) -> Block {
	zero_padded_blocks(message).fold(ZERO_BLOCK, |state, block| step(oracle, &state, &block))
}
