use super::*;

#[derive(Clone, Default, Debug, Parser)]
pub struct Options {
    #[arg(long, env = "SOLOMINER_ADDRESS", help = "Mine to <ADDRESS>.")]
    pub address: String,

    #[arg(
        long,
        short = 'p',
        env = "SOLOMINER_POOL",
        help = "Connect to pool <HOST>. [default: public-pool.io]"
    )]
    pub pool: Option<String>,

    #[arg(long, env = "SOLOMINER_PORT", help = "Connect to pool <PORT>. [default: 3333]")]
    pub port: Option<u16>,

    #[arg(long, env = "SOLOMINER_WORKER", help = "Identify as <WORKER>. [default: SoloMiner]")]
    pub worker: Option<String>,

    #[arg(long, env = "SOLOMINER_PASSWORD", help = "Authorize with <PASSWORD>.")]
    pub password: Option<String>,

    #[arg(
        long,
        value_enum,
        env = "SOLOMINER_NETWORK",
        help = "Mine on <NETWORK>. [default: bitcoin]"
    )]
    pub network: Option<Chain>,

    #[arg(
        long,
        value_enum,
        env = "SOLOMINER_BACKEND",
        help = "Hash with <BACKEND>. [default: parallel]"
    )]
    pub backend: Option<BackendKind>,

    #[arg(
        long,
        env = "SOLOMINER_THREADS",
        help = "Use <THREADS> hashing threads. [default: all cores]"
    )]
    pub threads: Option<usize>,

    #[arg(long, env = "SOLOMINER_BATCH_SIZE", help = "Hash <BATCH_SIZE> nonces per batch.")]
    pub batch_size: Option<u32>,

    #[arg(
        long,
        env = "SOLOMINER_TIMEOUT",
        help = "Give up on pool requests after <TIMEOUT> seconds."
    )]
    pub timeout: Option<f64>,

    #[arg(
        long,
        env = "SOLOMINER_RECONNECT_BASE",
        help = "Wait <RECONNECT_BASE> seconds after the first failure."
    )]
    pub reconnect_base: Option<f64>,

    #[arg(
        long,
        env = "SOLOMINER_RECONNECT_MAX",
        help = "Never wait more than <RECONNECT_MAX> seconds between attempts."
    )]
    pub reconnect_max: Option<f64>,

    #[arg(
        long,
        env = "SOLOMINER_RECONNECT_JITTER",
        help = "Add up to <RECONNECT_JITTER> random seconds to reconnect delays."
    )]
    pub reconnect_jitter: Option<f64>,

    #[arg(
        long,
        env = "SOLOMINER_KEEPALIVE",
        help = "Ping the pool after <KEEPALIVE> idle seconds."
    )]
    pub keepalive: Option<f64>,

    #[arg(
        long,
        env = "SOLOMINER_INACTIVITY_TIMEOUT",
        help = "Reconnect after <INACTIVITY_TIMEOUT> silent seconds."
    )]
    pub inactivity_timeout: Option<f64>,

    #[arg(
        long,
        env = "SOLOMINER_WARMUP",
        help = "Measure hashrate for <WARMUP> seconds before tuning difficulty."
    )]
    pub warmup: Option<f64>,

    #[arg(
        long,
        env = "SOLOMINER_SHARE_INTERVAL",
        help = "Aim for one share every <SHARE_INTERVAL> seconds."
    )]
    pub share_interval: Option<f64>,

    #[arg(
        long,
        env = "SOLOMINER_START_DIFF",
        help = "Suggest <START_DIFF> right after authorizing."
    )]
    pub start_diff: Option<f64>,

    #[arg(
        long,
        env = "SOLOMINER_RESYNC_AFTER",
        help = "Resync with the pool after <RESYNC_AFTER> consecutive rejects."
    )]
    pub resync_after: Option<u32>,
}

/// Network names accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Chain {
    #[value(alias = "mainnet")]
    Bitcoin,
    #[value(alias = "testnet3")]
    Testnet,
    Testnet4,
    Signet,
    Regtest,
}

impl From<Chain> for Network {
    fn from(chain: Chain) -> Self {
        match chain {
            Chain::Bitcoin => Network::Bitcoin,
            Chain::Testnet => Network::Testnet,
            Chain::Testnet4 => Network::Testnet4,
            Chain::Signet => Network::Signet,
            Chain::Regtest => Network::Regtest,
        }
    }
}

impl From<Options> for Settings {
    fn from(options: Options) -> Self {
        let defaults = Settings::default();

        Settings {
            host: options.pool.unwrap_or(defaults.host),
            port: options.port.unwrap_or(defaults.port),
            address: options.address,
            worker: options.worker.unwrap_or(defaults.worker),
            password: options.password,
            network: options.network.map(Network::from).unwrap_or(defaults.network),
            backend: options.backend.unwrap_or(defaults.backend),
            threads: options.threads,
            batch_size: options.batch_size,
            timeout: options.timeout.unwrap_or(defaults.timeout),
            reconnect_base: options.reconnect_base.unwrap_or(defaults.reconnect_base),
            reconnect_max: options.reconnect_max.unwrap_or(defaults.reconnect_max),
            reconnect_jitter: options.reconnect_jitter.unwrap_or(defaults.reconnect_jitter),
            keepalive_interval: options.keepalive.unwrap_or(defaults.keepalive_interval),
            inactivity_timeout: options
                .inactivity_timeout
                .unwrap_or(defaults.inactivity_timeout),
            warmup: options.warmup.unwrap_or(defaults.warmup),
            target_share_interval: options
                .share_interval
                .unwrap_or(defaults.target_share_interval),
            initial_difficulty: options.start_diff.or(defaults.initial_difficulty),
            resync_after_rejects: options
                .resync_after
                .unwrap_or(defaults.resync_after_rejects),
        }
    }
}
