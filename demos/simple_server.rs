//! Simple SSE broadcast server
//!
//! Run with: cargo run --example simple_server [BIND_ADDR] [--tone]
//!
//! Examples:
//!   cargo run --example simple_server                    # binds to 0.0.0.0:8080
//!   cargo run --example simple_server localhost          # binds to 127.0.0.1:8080
//!   cargo run --example simple_server 127.0.0.1:9000     # binds to 127.0.0.1:9000
//!   cargo run --example simple_server localhost --tone   # plus a built-in test tone
//!
//! ## Subscribing
//!
//!   curl -N http://localhost:8080/sse
//!
//! ## Publishing
//!
//!   curl --data-binary @frame.pcm http://localhost:8080/publish
//!
//! With `--tone`, the server itself produces 20ms frames of a 440Hz sine wave
//! (16-bit little-endian PCM, 8kHz mono), so subscribers see data without an
//! external producer.

use std::f32::consts::PI;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chunkcast::{ServerConfig, SseServer, SubscriberRegistry};

const DEFAULT_PORT: u16 = 8080;
const SAMPLE_RATE: u32 = 8_000;
const FRAME_MS: u64 = 20;
const TONE_HZ: f32 = 440.0;

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8080
/// - "localhost:9000" -> 127.0.0.1:9000
/// - "127.0.0.1" -> 127.0.0.1:8080
/// - "0.0.0.0:8080" -> 0.0.0.0:8080
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: simple_server [BIND_ADDR] [--tone]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8080)");
    eprintln!("  --tone       Broadcast a generated 440Hz test tone");
}

/// Broadcast sine wave PCM frames forever
async fn run_tone(registry: Arc<SubscriberRegistry>) {
    let samples_per_frame = (SAMPLE_RATE as u64 * FRAME_MS / 1000) as usize;
    let mut ticker = tokio::time::interval(Duration::from_millis(FRAME_MS));
    let mut phase = 0.0f32;
    let step = 2.0 * PI * TONE_HZ / SAMPLE_RATE as f32;

    loop {
        ticker.tick().await;

        let mut frame = Vec::with_capacity(samples_per_frame * 2);
        for _ in 0..samples_per_frame {
            let sample = (phase.sin() * i16::MAX as f32 * 0.5) as i16;
            frame.extend_from_slice(&sample.to_le_bytes());
            phase = (phase + step) % (2.0 * PI);
        }

        registry.broadcast(frame);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let tone = args.iter().any(|a| a == "--tone");
    let bind_addr = match args.iter().find(|a| !a.starts_with("--")) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chunkcast=debug".parse()?)
                .add_directive("simple_server=debug".parse()?),
        )
        .init();

    let server = SseServer::new(ServerConfig::with_addr(bind_addr));
    let config = server.config();

    println!("Starting SSE broadcast server on {}", server.bind_addr());
    println!();
    println!("Subscribe: curl -N http://{}{}", server.bind_addr(), config.subscribe_path);
    println!(
        "Publish:   curl --data-binary @frame.pcm http://{}{}",
        server.bind_addr(),
        config.publish_path
    );
    println!();

    if tone {
        tokio::spawn(run_tone(Arc::clone(server.registry())));
        println!("Broadcasting {}Hz test tone", TONE_HZ);
    }

    let result = server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await;

    if let Err(e) = result {
        eprintln!("Server error: {}", e);
    }

    Ok(())
}
