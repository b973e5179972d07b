mod headless_audio;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use headless_audio::HeadlessAudio;
use huddle::client::{CallEvent, ClientConfig, DEFAULT_RELAY_URL, HuddleClient, LinkState};
use huddle::model::{Participant, Roster};
use huddle::server::RelayConfig;
use huddle::{ParticipantId, RoomCode};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle", version, about = "Voice rooms over a polling signaling relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        #[arg(long, env = "HUDDLE_HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        #[arg(short, long, env = "HUDDLE_PORT", default_value_t = 3000)]
        port: u16,

        /// Drop members that stop polling for this many seconds.
        #[arg(long, env = "HUDDLE_MEMBER_TTL_SECS")]
        member_ttl_secs: Option<u64>,

        #[arg(long, env = "HUDDLE_REAP_INTERVAL_SECS", default_value_t = 10)]
        reap_interval_secs: u64,
    },

    /// Join a room and its call, sending silence.
    Join {
        #[arg(long, env = "HUDDLE_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
        relay: String,

        #[arg(short, long)]
        room: Option<String>,

        #[arg(long)]
        id: Option<String>,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(long, default_value_t = 1000)]
        tick_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("huddle=info,huddle_server=info,huddle_client=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Cli::parse().command {
        Commands::Serve {
            host,
            port,
            member_ttl_secs,
            reap_interval_secs,
        } => {
            let config = RelayConfig {
                host,
                port,
                member_ttl: member_ttl_secs.map(Duration::from_secs),
                reap_interval: Duration::from_secs(reap_interval_secs),
            };
            println!(
                "{} {}",
                "📡 Huddle relay on".green().bold(),
                config.addr().to_string().bold()
            );
            huddle::server::serve(config).await
        }
        Commands::Join {
            relay,
            room,
            id,
            name,
            tick_ms,
        } => {
            let room = match room {
                Some(room) => room,
                None => Input::<String>::new()
                    .with_prompt("Room code")
                    .interact_text()
                    .context("No room code given")?,
            };
            let id = id.map(ParticipantId::from).unwrap_or_else(ParticipantId::random);
            let name = name.unwrap_or_else(|| id.to_string());
            let config = ClientConfig {
                tick_interval: Duration::from_millis(tick_ms),
                ..ClientConfig::with_relay_url(relay)
            };
            join(RoomCode::from(room), Participant::new(id, name), config).await
        }
    }
}

async fn join(room: RoomCode, me: Participant, config: ClientConfig) -> Result<()> {
    let (client, mut events) =
        HuddleClient::connect(me.clone(), config, Arc::new(HeadlessAudio::new()))?;

    let roster = client
        .join_room(room.clone())
        .await
        .with_context(|| format!("Failed to join room {room}"))?;
    println!(
        "{} {} as {}",
        "🚪 Joined".green().bold(),
        room.to_string().bold(),
        me.display_name.cyan()
    );
    print_roster(&roster);

    client.start_call(&room).await?;
    println!("{}", "Press Ctrl-C to hang up.".dimmed());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("{}", "👋 Leaving...".yellow());
    client.shutdown().await;
    Ok(())
}

fn print_roster(roster: &Roster) {
    for entry in &roster.members {
        let marker = if entry.in_call() {
            "●".green()
        } else {
            "○".dimmed()
        };
        println!("   {} {} ({})", marker, entry.participant.display_name, entry.id());
    }
}

fn print_event(event: &CallEvent) {
    match event {
        CallEvent::RosterChanged { roster, .. } => {
            println!("{} v{}", "Roster".cyan().bold(), roster.version);
            print_roster(roster);
        }
        CallEvent::CallStarted { room } => {
            println!("{} {}", "📞 In call:".green().bold(), room)
        }
        CallEvent::CallEnded { room } => println!("{} {}", "Call ended:".yellow(), room),
        CallEvent::LinkStateChanged {
            participant, state, ..
        } => {
            let label = match state {
                LinkState::New => "new".dimmed(),
                LinkState::Negotiating => "negotiating".yellow(),
                LinkState::Connected => "connected".green().bold(),
                LinkState::Closed => "closed".red(),
            };
            println!("   {} {}", participant, label);
        }
        CallEvent::Degraded { .. } => {
            println!("{}", "⚠ No peer is reachable right now".red().bold())
        }
        CallEvent::Recovered { .. } => println!("{}", "Peers reachable again".green()),
    }
}
