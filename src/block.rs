use crate::error::HexError;

pub const BLOCK_SIZE: usize = 16;
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8;

pub type Block = [u8; BLOCK_SIZE];

pub const ZERO_BLOCK: Block = [0; BLOCK_SIZE];

pub fn xor(b1: &Block, b2: &Block) -> Block {
	let mut res = ZERO_BLOCK;
	for (r, (x, y)) in res.iter_mut().zip(std::iter::zip(b1, b2)) {
		*r = x ^ y;
	}
	res
}

/// Splits `message` into blocks, filling the tail of the last one with zero
/// bytes. There is no length suffix, so `m` and `m || 0x00..` share blocks
/// whenever they round up to the same boundary.
pub fn zero_padded_blocks(message: &[u8]) -> impl Iterator<Item = Block> + '_ {
	message.chunks(BLOCK_SIZE).map(|chunk| {
		let mut block = ZERO_BLOCK;
		block[..chunk.len()].copy_from_slice(chunk);
		block
	})
}

pub fn block_count(len: usize) -> usize {
	len.div_ceil(BLOCK_SIZE)
}

pub fn from_hex<T: AsRef<[u8]>>(hstr: T) -> Result<Vec<u8>, HexError> {
	hex::decode(hstr).map_err(|err| match err {
		hex::FromHexError::InvalidHexCharacter {..} => HexError::InvalidCharacter,
		// InvalidStringLength only comes out of decode_to_slice
		hex::FromHexError::OddLength |
		hex::FromHexError::InvalidStringLength      => HexError::OddLength,
	})
}

pub fn to_hex<T: AsRef<[u8]>>(bytes: T) -> String {
	hex::encode(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn xor_is_bytewise() {
		let mut a = ZERO_BLOCK;
		let mut b = ZERO_BLOCK;
		a[0] = 0x1c;
		b[0] = 0x68;
		a[15] = 0xff;
		assert_eq!(0x74, xor(&a, &b)[0]);
		assert_eq!(0xff, xor(&a, &b)[15]);
		assert_eq!(ZERO_BLOCK, xor(&a, &a));
	}

	#[test]
	fn padding_fills_last_block_with_zeros() {
		let blocks: Vec<_> = zero_padded_blocks(&[7u8; 17]).collect();
		assert_eq!(2, blocks.len());
		assert_eq!([7u8; 16], blocks[0]);
		let mut tail = ZERO_BLOCK;
		tail[0] = 7;
		assert_eq!(tail, blocks[1]);
	}

	#[test]
	fn empty_message_has_no_blocks() {
		assert_eq!(0, zero_padded_blocks(&[]).count());
		assert_eq!(0, block_count(0));
		assert_eq!(1, block_count(1));
		assert_eq!(1, block_count(16));
		assert_eq!(2, block_count(17));
	}

	#[test]
	fn hex_errors_are_classified() {
		assert_eq!(Err(HexError::InvalidCharacter), from_hex("nothex"));
		assert_eq!(Err(HexError::OddLength), from_hex("not-hex"));
		assert_eq!(Ok(vec![0xde, 0xad]), from_hex("dEaD"));
		assert_eq!("dead", to_hex([0xde, 0xad]));
	}
}
