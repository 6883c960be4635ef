pub mod block;
pub mod config;
pub mod error;
pub mod hash;
pub mod oracle;
pub mod protocol;
pub mod server;
pub mod session;

pub use block::{Block, BLOCK_SIZE};
pub use config::{ChallengeParams, Config, Disclosure};
pub use error::{Error, HexError, Rejection, Result};
pub use hash::{digest, step};
pub use oracle::Oracle;
pub use protocol::Verification;
pub use session::{LeakedPair, Session};
