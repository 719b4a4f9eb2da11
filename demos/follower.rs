// ABOUTME: Room follower demo
// ABOUTME: Connects to a host, mirrors its metronome, and logs beats and status

use beatlink::protocol::client;
use beatlink::room::{run_follower, FollowerSession};
use beatlink::scheduler::LogEmitter;
use beatlink::{Config, Metronome, MonotonicClock, SyncEngine};
use clap::Parser;
use std::path::PathBuf;

/// Follow a metronome room
#[derive(Parser, Debug)]
#[command(name = "follower")]
#[command(about = "Join a shared metronome room and play along", long_about = None)]
struct Args {
    /// WebSocket URL of the room host
    #[arg(short, long, default_value = "ws://127.0.0.1:8927")]
    server: String,

    /// Optional JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let clock = MonotonicClock::new();
    let emitter = LogEmitter::new(clock, config.sound_set.clone());
    let mut metronome = Metronome::with_config(clock, Box::new(emitter), &config);
    metronome.subscribe(|beat: u32| log::debug!("beat {}", beat));

    println!("Connecting to {}...", args.server);
    let mut link = client::connect(&args.server).await?;
    println!("Connected!");

    let sync = SyncEngine::new(config.probe_interval_seconds, config.probe_timeout_seconds);
    let mut session = FollowerSession::join(metronome, Box::new(link.transport), sync);

    run_follower(&mut session, &mut link.inbound).await;

    let sync = session.sync().clock_sync();
    println!(
        "Left room ({}); last offset {:.4}s, quality {:?}",
        session.status(),
        sync.offset(),
        sync.quality()
    );
    Ok(())
}
