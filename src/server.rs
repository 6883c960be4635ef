use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::OsRng;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::block::to_hex;
use crate::config::{ChallengeParams, Config, Disclosure};
use crate::error::{Error, Rejection, Result};
use crate::protocol::Verification;
use crate::session::Session;

const RULE: &str = "--------------------------------------------------";

/// Read-only state shared by every connection worker.
pub struct Settings {
	pub challenge: ChallengeParams,
	pub flag: String,
	pub timeout: Duration,
	pub read_limit: usize,
}

impl Settings {
	pub fn from_config(config: &Config) -> Self {
		Self {
			challenge: config.challenge.clone(),
			flag: config.resolve_flag(),
			timeout: config.timeout(),
			read_limit: config.read_limit,
		}
	}
}

pub async fn run(config: Config, shutdown: impl Future<Output = ()>) -> Result<()> {
	config.validate()?;
	if config.challenge.disclosure == Disclosure::WithPlaintext {
		warn!("target plaintext disclosure is on; this is the weaker challenge mode");
	}
	let listener = TcpListener::bind(config.listen).await?;
	info!(
		addr = %listener.local_addr()?,
		max_blocks = config.challenge.max_blocks,
		pairs = config.challenge.pair_count,
		"listening"
	);
	serve(listener, Arc::new(Settings::from_config(&config)), shutdown).await
}

/// Accepts until `shutdown` resolves. A failing connection never stops the loop.
pub async fn serve(listener: TcpListener, settings: Arc<Settings>, shutdown: impl Future<Output = ()>) -> Result<()> {
	tokio::pin!(shutdown);
	loop {
		tokio::select! {
			res = listener.accept() => {
				let (stream, peer) = match res {
					Ok(conn) => conn,
					Err(err) => {
						warn!(%err, "accept failed");
						continue;
					}
				};
				let settings = Arc::clone(&settings);
				tokio::spawn(async move {
					handle_connection(stream, peer, &settings).await;
				});
			}
			_ = &mut shutdown => {
				info!("shutting down");
				return Ok(());
			}
		}
	}
}

async fn handle_connection<S>(stream: S, peer: SocketAddr, settings: &Settings)
where S: AsyncRead + AsyncWrite + Unpin {
	debug!(%peer, "accepted");
	match serve_connection(stream, settings).await {
		Ok(Verification::Accepted) => info!(%peer, "forgery accepted"),
		Ok(Verification::Rejected(reason)) => info!(%peer, %reason, "candidate rejected"),
		Ok(state) => warn!(%peer, state = state.name(), "session ended early"),
		Err(err @ Error::Timeout(_)) => info!(%peer, %err, "connection timed out"),
		Err(err) => warn!(%peer, %err, "connection failed"),
	}
}

/// Runs one full challenge on `stream` under a fresh session, then closes it.
pub async fn serve_connection<S>(stream: S, settings: &Settings) -> Result<Verification>
where S: AsyncRead + AsyncWrite + Unpin {
	let session = Session::generate(&settings.challenge, &mut OsRng);
	debug!(target_blocks = session.target_blocks(), pairs = session.pairs().len(), "session created");
	serve_session(stream, &session, settings).await
}

pub async fn serve_session<S>(mut stream: S, session: &Session, settings: &Settings) -> Result<Verification>
where S: AsyncRead + AsyncWrite + Unpin {
	let res = match tokio::time::timeout(settings.timeout, exchange(&mut stream, session, settings)).await {
		Ok(res) => res,
		Err(_) => return Err(Error::Timeout(settings.timeout)),
	};
	if let Err(err) = &res {
		if !matches!(err, Error::Io(_)) {
			let _ = send_line(&mut stream, &format!("[!] Error: {err}")).await;
		}
	}
	let _ = stream.shutdown().await;
	res
}

async fn exchange<S>(stream: &mut S, session: &Session, settings: &Settings) -> Result<Verification>
where S: AsyncRead + AsyncWrite + Unpin {
	stream.write_all(banner(session)?.as_bytes()).await?;
	stream.flush().await?;

	let mut wire = Vec::new();
	BufReader::new((&mut *stream).take(settings.read_limit as u64))
		.read_until(b'\n', &mut wire)
		.await?;

	let outcome = Verification::settle(session, &wire)?;
	for line in outcome_lines(&outcome, &settings.flag) {
		send_line(stream, &line).await?;
	}
	stream.flush().await?;
	Ok(outcome)
}

pub fn banner(session: &Session) -> Result<String> {
	let mut lines = vec![
		"=== Hash Collision: Hard Mode (Length Restricted) ===".to_owned(),
		format!("Find a second preimage with LENGTH <= {} bytes.", session.max_len()),
		"Hint: The simple append strategy will make the message too long!".to_owned(),
		RULE.to_owned(),
		format!("[+] Target Hash (Hex): {}", to_hex(session.target_digest())),
	];
	if let Some(target) = session.disclosed_target() {
		lines.push(format!("[+] Target Message (Hex): {}", to_hex(target)));
	}
	lines.push(format!("[+] Leaked Pairs ({}):", session.pairs().len()));
	lines.push(serde_json::to_string(session.pairs())?);
	lines.push(RULE.to_owned());
	lines.push("[-] Input your forged message (Hex): ".to_owned());

	let mut out = lines.join("\n");
	out.push('\n');
	Ok(out)
}

pub fn outcome_lines(state: &Verification, flag: &str) -> Vec<String> {
	match state {
		Verification::Accepted => vec![format!("[+] Flag: {flag}")],
		Verification::Rejected(Rejection::InvalidEncoding(_)) => vec!["[!] Invalid Hex.".to_owned()],
		Verification::Rejected(Rejection::CandidateTooLong { max_blocks, got_blocks }) => vec![
			format!("[!] Fail: Message too long! Max {max_blocks} blocks."),
			format!("    Your length: {got_blocks} blocks."),
		],
		Verification::Rejected(Rejection::HashMismatch) => vec!["[!] Fail. Hash mismatch.".to_owned()],
		other => vec![format!("[!] Error: verification stopped in the {} state", other.name())],
	}
}

async fn send_line<S: AsyncWrite + Unpin>(stream: &mut S, line: &str) -> Result<()> {
	stream.write_all(line.as_bytes()).await?;
	stream.write_all(b"\n").await?;
	Ok(())
}
