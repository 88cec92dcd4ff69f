//! Command-line client
//!
//! Sends the command given on argv as one request frame, reads one
//! response frame, and pretty-prints the decoded value tree. Exits
//! non-zero on usage, I/O, or protocol errors.

use cobaltdb::protocol::{decode_response, Value, DEFAULT_PORT, HEADER_SIZE, MAX_MSG_LEN};
use std::env;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::process;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let tokens: Vec<String> = env::args().skip(1).collect();
    if tokens.is_empty() {
        return Err("usage: client <command> [args...]".into());
    }

    let request = encode_request(&tokens)?;

    let mut stream = TcpStream::connect(("127.0.0.1", DEFAULT_PORT))?;
    stream.write_all(&request)?;

    let mut header = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header)?;
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_MSG_LEN {
        return Err("response is too long".into());
    }

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body)?;

    let value = decode_response(&body)?;
    print_value(&value, 0);
    Ok(())
}

/// Encode argv tokens as one framed request.
fn encode_request(tokens: &[String]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut payload = (tokens.len() as u32).to_le_bytes().to_vec();
    for token in tokens {
        payload.extend_from_slice(&(token.len() as u32).to_le_bytes());
        payload.extend_from_slice(token.as_bytes());
    }
    if payload.len() > MAX_MSG_LEN {
        return Err("request is too long".into());
    }

    let mut frame = (payload.len() as u32).to_le_bytes().to_vec();
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn print_value(value: &Value, depth: usize) {
    let pad = "  ".repeat(depth);
    match value {
        Value::Nil => println!("{}(nil)", pad),
        Value::Err { code, msg } => println!("{}(err) {} {}", pad, code, msg),
        Value::Str(s) => println!("{}(str) {}", pad, String::from_utf8_lossy(s)),
        Value::Int(i) => println!("{}(int) {}", pad, i),
        Value::Dbl(d) => println!("{}(dbl) {}", pad, d),
        Value::Arr(items) => {
            println!("{}(arr) len={}", pad, items.len());
            for item in items {
                print_value(item, depth + 1);
            }
        }
    }
}
