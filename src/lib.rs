use {
    anyhow::{Error, ensure},
    arguments::Arguments,
    backend::{BackendError, BackendKind, CpuBackend, Found, HashBackend},
    bitcoin::{
        BlockHash, Network, Target,
        block::Header,
        consensus,
        hashes::{Hash, sha256d},
    },
    clap::{Parser, ValueEnum},
    decay::DecayingRate,
    derive_more::Display,
    engine::Engine,
    hashrate::HashRate,
    job::Job,
    options::Options,
    parking_lot::Mutex,
    rand::Rng,
    reject_tracker::RejectTracker,
    serde::{Deserialize, Serialize},
    serde_json::json,
    snafu::{ResultExt, Snafu},
    std::{
        env,
        fmt::{self, Formatter},
        io,
        ops::RangeInclusive,
        process,
        str::FromStr,
        sync::Arc,
        time::{Duration, Instant},
    },
    stratum::{
        Difficulty, Extranonce, Id, JobId, MerkleNode, Nbits, Nonce, Notify, Ntime, PrevHash,
        Version, format_si, merkle_root, parse_si, round_significant,
    },
    target::{Targets, Verdict, hash_difficulty, nbits_to_target, target_to_difficulty},
    template::HeaderTemplate,
    tokio::{
        runtime::Runtime,
        sync::{broadcast, mpsc, watch},
        task::{self, JoinHandle, JoinSet},
        time::{MissedTickBehavior, interval, sleep},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    tracing_appender::non_blocking,
    tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt},
    upstream::{Share, UpstreamEvent, UpstreamHandle},
};

pub use {
    autotune::{DifficultyTuner, suggested_difficulty},
    backend::create as create_backend,
    engine::MinerEvent,
    metrics::{Metrics, Stats},
    miner::Miner,
    reconnect::ReconnectPolicy,
    settings::Settings,
    state::ConnectionState,
    upstream::{Upstream, UpstreamError},
};

mod arguments;
pub mod autotune;
pub mod backend;
mod decay;
pub mod engine;
pub mod hashrate;
pub mod job;
mod logs;
pub mod metrics;
pub mod miner;
mod options;
pub mod reconnect;
pub mod reject_tracker;
pub mod settings;
mod signal;
pub mod state;
mod system_utils;
pub mod target;
pub mod template;
pub mod upstream;

pub const USER_AGENT: &str = concat!("solominer/", env!("CARGO_PKG_VERSION"));

type Result<T = (), E = Error> = std::result::Result<T, E>;

pub fn main() {
    let _guard = logs::init();

    let args = Arguments::parse();

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to create tokio runtime: {err}");
            process::exit(1);
        }
    };

    runtime.block_on(async {
        let cancel_token = signal::setup_signal_handler();

        match args.run(cancel_token).await {
            Err(err) => {
                eprintln!("error: {err}");

                for (i, cause) in err.chain().skip(1).enumerate() {
                    if i == 0 {
                        eprintln!();
                        eprintln!("because:");
                    }
                    eprintln!("- {cause}");
                }

                if env::var_os("RUST_BACKTRACE")
                    .map(|val| val == "1")
                    .unwrap_or_default()
                {
                    eprintln!();
                    eprintln!("{}", err.backtrace());
                }

                process::exit(1);
            }
            Ok(()) => {
                process::exit(0);
            }
        }
    });
}
