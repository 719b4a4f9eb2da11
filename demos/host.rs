// ABOUTME: Room host demo
// ABOUTME: Accepts WebSocket followers and reads control commands from stdin

use beatlink::protocol::client;
use beatlink::room::{run_host, Control, HostEvent, HostRoom};
use beatlink::scheduler::LogEmitter;
use beatlink::{Config, Metronome, MonotonicClock};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Host a metronome room
#[derive(Parser, Debug)]
#[command(name = "host")]
#[command(about = "Host a shared metronome room over WebSocket", long_about = None)]
struct Args {
    /// Address to accept followers on
    #[arg(short, long, default_value = "127.0.0.1:8927")]
    bind: String,

    /// Optional JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial tempo (overrides the config file)
    #[arg(short, long)]
    tempo: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(tempo) = args.tempo {
        config.tempo_bpm = tempo;
        config.validate()?;
    }

    let clock = MonotonicClock::new();
    let emitter = LogEmitter::new(clock, config.sound_set.clone());
    let mut room = HostRoom::new(Metronome::with_config(clock, Box::new(emitter), &config));

    let (events_tx, mut events) = mpsc::unbounded_channel();

    let listener = TcpListener::bind(&args.bind).await?;
    println!("Room open on ws://{}", args.bind);
    println!("Commands: tempo <bpm> | play | stop | sig <beats> | sub <1|2|4> | accent on|off | sound <id> | reset | leave");

    let accept_tx = events_tx.clone();
    tokio::spawn(async move {
        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    eprintln!("Accept failed: {}", e);
                    continue;
                }
            };
            let events = accept_tx.clone();
            tokio::spawn(async move {
                let mut link = match client::accept(stream).await {
                    Ok(link) => link,
                    Err(e) => {
                        eprintln!("Handshake failed: {}", e);
                        return;
                    }
                };
                let peer = uuid::Uuid::new_v4();
                if events
                    .send(HostEvent::Joined {
                        peer,
                        transport: link.transport,
                    })
                    .is_err()
                {
                    return;
                }
                while let Some(message) = link.inbound.recv().await {
                    if events.send(HostEvent::Message { peer, message }).is_err() {
                        return;
                    }
                }
                let _ = events.send(HostEvent::Left { peer });
            });
        }
    });

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match line.parse::<Control>() {
                Ok(control) => {
                    let leaving = control == Control::Leave;
                    if events_tx.send(HostEvent::Control(control)).is_err() || leaving {
                        return;
                    }
                }
                Err(e) => eprintln!("{}", e),
            }
        }
        let _ = events_tx.send(HostEvent::Control(Control::Leave));
    });

    run_host(&mut room, &mut events).await;
    println!("Room closed");
    Ok(())
}
