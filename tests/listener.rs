use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use matrix_hash_challenge::block::{from_hex, to_hex, xor, Block, BLOCK_BITS};
use matrix_hash_challenge::server::{serve, Settings};
use matrix_hash_challenge::ChallengeParams;

#[derive(Deserialize)]
struct Pair {
	x: String,
	fx: String,
}

struct Banner {
	digest: Block,
	pairs: Vec<(Block, Block)>,
}

fn block(hex: &str) -> Block {
	from_hex(hex).unwrap().try_into().unwrap()
}

async fn start() -> (std::net::SocketAddr, oneshot::Sender<()>) {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let settings = Arc::new(Settings {
		challenge: ChallengeParams::default(),
		flag: "flag{listener}".to_owned(),
		timeout: Duration::from_secs(10),
		read_limit: 64 * 1024,
	});
	let (stop, stopped) = oneshot::channel::<()>();
	tokio::spawn(serve(listener, settings, async {
		let _ = stopped.await;
	}));
	(addr, stop)
}

/// Reads the banner up to the prompt and returns the rest of the stream.
async fn read_banner(stream: TcpStream) -> (Banner, BufReader<TcpStream>) {
	let mut reader = BufReader::new(stream);
	let mut digest = None;
	let mut pairs = None;
	loop {
		let mut line = String::new();
		assert!(reader.read_line(&mut line).await.unwrap() > 0, "banner ended early");
		if let Some(hex) = line.trim().strip_prefix("[+] Target Hash (Hex): ") {
			digest = Some(block(hex));
		} else if line.starts_with("[{") {
			let parsed: Vec<Pair> = serde_json::from_str(line.trim()).unwrap();
			pairs = Some(parsed.iter().map(|p| (block(&p.x), block(&p.fx))).collect());
		} else if line.starts_with("[-] Input your forged message") {
			break;
		}
	}
	(Banner { digest: digest.unwrap(), pairs: pairs.unwrap() }, reader)
}

/// Picking block `m_j = h_{j-1} ^ x_i` forces the cipher input to a leaked
/// `x_i`, so `h_j = h_{j-1} ^ x_i ^ f(x_i)`. The target is then a GF(2)
/// combination of the `x_i ^ f(x_i)`, solved by elimination over a basis.
fn forge(banner: &Banner) -> Vec<u8> {
	let n = banner.pairs.len();
	let deltas: Vec<u128> = banner.pairs.iter()
		.map(|(x, fx)| u128::from_be_bytes(xor(x, fx)))
		.collect();

	let mut basis: Vec<Option<(u128, Vec<bool>)>> = vec![None; BLOCK_BITS];
	for (i, &delta) in deltas.iter().enumerate() {
		let mut v = delta;
		let mut mask = vec![false; n];
		mask[i] = true;
		for bit in (0..BLOCK_BITS).rev() {
			if (v >> bit) & 1 == 0 {
				continue;
			}
			if basis[bit].is_none() {
				basis[bit] = Some((v, mask));
				break;
			}
			let (bv, bm) = basis[bit].as_ref().unwrap();
			v ^= bv;
			mask.iter_mut().zip(bm).for_each(|(m, b)| *m ^= b);
		}
	}

	let mut t = u128::from_be_bytes(banner.digest);
	let mut selected = vec![false; n];
	for bit in (0..BLOCK_BITS).rev() {
		if (t >> bit) & 1 == 1 {
			let (bv, bm) = basis[bit].as_ref().expect("leaked pairs should span GF(2)^128");
			t ^= bv;
			selected.iter_mut().zip(bm).for_each(|(s, b)| *s ^= b);
		}
	}
	assert_eq!(0, t);

	let mut state = [0u8; 16];
	let mut message = Vec::new();
	for (i, _) in selected.iter().enumerate().filter(|(_, s)| **s) {
		let (x, fx) = &banner.pairs[i];
		let m = xor(&state, x);
		message.extend_from_slice(&m);
		state = xor(&m, fx);
	}
	assert_eq!(banner.digest, state);
	message
}

async fn submit(mut reader: BufReader<TcpStream>, candidate: &str) -> String {
	reader.get_mut().write_all(format!("{candidate}\n").as_bytes()).await.unwrap();
	let mut out = String::new();
	reader.read_to_string(&mut out).await.unwrap();
	out
}

#[tokio::test]
async fn matrix_forgery_wins_within_the_cap() {
	let (addr, _stop) = start().await;
	let (banner, reader) = read_banner(TcpStream::connect(addr).await.unwrap()).await;
	assert_eq!(300, banner.pairs.len());

	let forged = forge(&banner);
	assert!(forged.len() <= 135 * 16);
	assert_eq!("[+] Flag: flag{listener}\n", submit(reader, &to_hex(&forged)).await);
}

#[tokio::test]
async fn sessions_are_isolated() {
	let (addr, _stop) = start().await;
	let (first, first_reader) = read_banner(TcpStream::connect(addr).await.unwrap()).await;
	let (second, second_reader) = read_banner(TcpStream::connect(addr).await.unwrap()).await;
	assert_ne!(first.digest, second.digest);
	assert_ne!(first.pairs[0], second.pairs[0]);

	// a forgery is bound to the key of the session it was built from
	let forged = forge(&first);
	assert_eq!("[!] Fail. Hash mismatch.\n", submit(second_reader, &to_hex(&forged)).await);
	assert_eq!("[+] Flag: flag{listener}\n", submit(first_reader, &to_hex(&forged)).await);
}

#[tokio::test]
async fn listener_survives_abrupt_clients() {
	let (addr, _stop) = start().await;
	drop(TcpStream::connect(addr).await.unwrap());
	let (_, reader) = read_banner(TcpStream::connect(addr).await.unwrap()).await;
	drop(reader);

	let (_, reader) = read_banner(TcpStream::connect(addr).await.unwrap()).await;
	assert_eq!("[!] Invalid Hex.\n", submit(reader, "not-hex").await);
}
