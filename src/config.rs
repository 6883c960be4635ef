use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::block::BLOCK_BITS;
use crate::error::{Error, Result};

pub const DEFAULT_FLAG: &str = "flag{Matr1x_M4ster_Beat5_App3nd_Att4ck}";
pub const FLAG_ENV: &str = "GZCTF_FLAG";

/// What the banner reveals about the target message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Disclosure {
	/// Only the target digest. Appending to a message you never see is not an option.
	#[default]
	DigestOnly,
	/// Digest and target plaintext. Weaker: it baits the append attack.
	WithPlaintext,
}

/// Knobs that shape a single challenge session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChallengeParams {
	pub max_blocks: usize,
	/// Length of the random target. Defaults to `max_blocks`.
	pub target_blocks: Option<usize>,
	pub pair_count: usize,
	pub disclosure: Disclosure,
}

impl Default for ChallengeParams {
	fn default() -> Self {
		Self {
			max_blocks: 135,
			target_blocks: None,
			// enough for an over-determined system over GF(2)^128
			pair_count: 300,
			disclosure: Disclosure::DigestOnly,
		}
	}
}

impl ChallengeParams {
	pub fn target_block_count(&self) -> usize {
		self.target_blocks.unwrap_or(self.max_blocks)
	}

	pub fn validate(&self) -> Result<()> {
		if self.max_blocks == 0 {
			return Err(Error::Config("max_blocks must be at least 1".into()));
		}
		if self.target_block_count() > self.max_blocks {
			return Err(Error::Config(format!(
				"target_blocks {} exceeds max_blocks {}", self.target_block_count(), self.max_blocks
			)));
		}
		if self.pair_count <= 2 * BLOCK_BITS {
			return Err(Error::Config(format!(
				"pair_count {} must exceed {}", self.pair_count, 2 * BLOCK_BITS
			)));
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
	pub listen: SocketAddr,
	#[serde(flatten)]
	pub challenge: ChallengeParams,
	pub timeout_secs: u64,
	/// Cap on wire bytes read for the candidate, before any decoding.
	pub read_limit: usize,
	pub flag: Option<String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			listen: SocketAddr::from(([0, 0, 0, 0], 9999)),
			challenge: ChallengeParams::default(),
			timeout_secs: 60,
			read_limit: 64 * 1024,
			flag: None,
		}
	}
}

impl Config {
	pub fn from_file(path: &Path) -> Result<Self> {
		let reader = BufReader::new(File::open(path)?);
		Ok(serde_json::from_reader(reader)?)
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}

	/// Explicit config wins, then the environment, then the built-in flag.
	pub fn resolve_flag(&self) -> String {
		self.flag.clone()
			.or_else(|| std::env::var(FLAG_ENV).ok())
			.unwrap_or_else(|| DEFAULT_FLAG.to_owned())
	}

	pub fn validate(&self) -> Result<()> {
		self.challenge.validate()?;
		if self.timeout_secs == 0 {
			return Err(Error::Config("timeout_secs must be at least 1".into()));
		}
		// the cap has to fit a maximal hex candidate plus its line ending
		let needed = self.challenge.max_blocks * 32 + 2;
		if self.read_limit < needed {
			return Err(Error::Config(format!(
				"read_limit {} cannot hold a {}-block candidate ({needed} bytes)",
				self.read_limit, self.challenge.max_blocks
			)));
		}
		Ok(())
	}
}
