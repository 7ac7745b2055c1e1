//! Re-frames the JSON values on stdin as one JSON array on stdout.
//!
//! Input is read in small chunks and decoded as it arrives; with an ignore
//! level of 1 a top-level array on stdin is unwrapped into its elements
//! before they are encoded again.
//!
//! Run with
//!
//! ```bash
//! echo '[{"a":1}, {"b":[2,3]}] {"c":null}' \
//!   | RUST_LOG=jsonflow=debug cargo run -p jsonflow --example rechunk -- 1
//! ```

use std::io::{self, Read, Write};

use bytes::Bytes;
use futures::{StreamExt, executor::block_on};
use jsonflow::{
    decode, encode,
    flow::{from_iter, into_stream},
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let ignore_level = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 0,
    };

    let mut chunks = Vec::new();
    let mut stdin = io::stdin().lock();
    let mut buf = [0u8; 16];
    loop {
        let n = stdin.read(&mut buf)?;
        if n == 0 {
            break;
        }
        chunks.push(Bytes::copy_from_slice(&buf[..n]));
    }

    let values = decode(from_iter(chunks)).ignore_level(ignore_level).prefetch(4);
    let mut output = into_stream(encode(values).chunk_capacity(32), 1);
    let mut stdout = io::stdout().lock();
    block_on(async {
        while let Some(chunk) = output.next().await {
            stdout.write_all(&chunk?)?;
        }
        writeln!(stdout)?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
