use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use duet_pairing::PairingConfig;
use duet_relay::auth::HmacTokenGate;
use duet_relay::server::{self, RelayConfig, RelayState};

#[derive(Parser)]
#[command(name = "duet-relay", about = "Pairing and relay server for duet")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// How long a pairing code stays joinable, in seconds.
    #[arg(long, default_value_t = 600)]
    pairing_ttl: i64,

    /// Close connections after this many seconds without traffic.
    #[arg(long, default_value_t = 300)]
    idle_timeout: u64,

    /// Seconds between expiry-reaper passes.
    #[arg(long, default_value_t = 60)]
    reaper_interval: u64,

    /// Shared secret for bearer-token verification. Falls back to the
    /// DUET_RELAY_SECRET environment variable.
    #[arg(long)]
    secret: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duet_relay=info,duet_pairing=info".into()),
        )
        .init();

    let args = Args::parse();
    let secret = args
        .secret
        .or_else(|| std::env::var("DUET_RELAY_SECRET").ok())
        .unwrap_or_else(|| {
            eprintln!("a token secret is required (--secret or DUET_RELAY_SECRET)");
            std::process::exit(1);
        });

    let config = RelayConfig {
        pairing: PairingConfig {
            ttl: chrono::Duration::seconds(args.pairing_ttl),
            ..PairingConfig::default()
        },
        idle_timeout: Duration::from_secs(args.idle_timeout),
        reaper_interval: Duration::from_secs(args.reaper_interval),
        ..RelayConfig::default()
    };
    let state = RelayState::new(Arc::new(HmacTokenGate::new(secret)), config);

    let listener = server::bind(&format!("0.0.0.0:{}", args.port))
        .await
        .expect("failed to bind TCP listener");
    server::run(listener, state).await;
}
