use super::*;

const DEFAULT_CPU_BATCH_SIZE: u32 = 1 << 16;
const DEFAULT_PARALLEL_BATCH_SIZE: u32 = 1 << 22;

/// Resolved configuration. Immutable once the miner starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub address: String,
    pub worker: String,
    pub password: Option<String>,
    pub network: Network,
    pub backend: BackendKind,
    pub threads: Option<usize>,
    pub batch_size: Option<u32>,
    pub timeout: f64,
    pub reconnect_base: f64,
    pub reconnect_max: f64,
    pub reconnect_jitter: f64,
    pub keepalive_interval: f64,
    pub inactivity_timeout: f64,
    pub warmup: f64,
    pub target_share_interval: f64,
    pub initial_difficulty: Option<f64>,
    pub resync_after_rejects: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "public-pool.io".into(),
            port: 3333,
            address: String::new(),
            worker: "SoloMiner".into(),
            password: None,
            network: Network::Bitcoin,
            backend: BackendKind::default(),
            threads: None,
            batch_size: None,
            timeout: 30.0,
            reconnect_base: 5.0,
            reconnect_max: 120.0,
            reconnect_jitter: 5.0,
            keepalive_interval: 60.0,
            inactivity_timeout: 120.0,
            warmup: 15.0,
            target_share_interval: 20.0,
            initial_difficulty: Some(0.5),
            resync_after_rejects: 5,
        }
    }
}

fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

impl Settings {
    /// `host:port`
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pools identify solo miners by payout address, optionally suffixed with a worker name.
    pub fn username(&self) -> String {
        if self.worker.is_empty() {
            self.address.clone()
        } else {
            format!("{}.{}", self.address, self.worker)
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
            .filter(|threads| *threads > 0)
            .unwrap_or_else(system_utils::get_cpu_count)
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size.filter(|size| *size > 0).unwrap_or(match self.backend {
            BackendKind::Cpu => DEFAULT_CPU_BATCH_SIZE,
            BackendKind::Parallel => DEFAULT_PARALLEL_BATCH_SIZE,
        })
    }

    pub fn timeout(&self) -> Duration {
        seconds(self.timeout)
    }

    pub fn reconnect_base(&self) -> Duration {
        seconds(self.reconnect_base)
    }

    pub fn reconnect_max(&self) -> Duration {
        seconds(self.reconnect_max)
    }

    pub fn reconnect_jitter(&self) -> Duration {
        seconds(self.reconnect_jitter)
    }

    pub fn keepalive_interval(&self) -> Duration {
        seconds(self.keepalive_interval)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        seconds(self.inactivity_timeout)
    }

    pub fn warmup(&self) -> Duration {
        seconds(self.warmup)
    }

    pub fn target_share_interval(&self) -> Duration {
        seconds(self.target_share_interval)
    }

    pub fn initial_difficulty(&self) -> Option<Difficulty> {
        self.initial_difficulty
            .filter(|difficulty| difficulty.is_finite() && *difficulty > 0.0)
            .map(Difficulty::from)
    }

    pub fn validate(&self) -> Result {
        ensure!(!self.host.is_empty(), "pool host must not be empty");
        ensure!(self.port != 0, "pool port must not be zero");
        ensure!(!self.address.is_empty(), "mining address must not be empty");
        ensure!(
            !self.timeout().is_zero(),
            "timeout must be greater than zero"
        );
        ensure!(
            !self.target_share_interval().is_zero(),
            "target share interval must be greater than zero"
        );
        ensure!(
            self.resync_after_rejects > 0,
            "reject resync threshold must be at least 1"
        );
        Ok(())
    }
}
