use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_WORKER_QUEUE_SIZE: usize = 64;
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Server configuration. All state is in-memory; there is nothing to
/// persist and no environment is consulted.
#[derive(Debug, Clone)]
pub struct Config {
    pub workers: usize,
    pub worker_queue_size: usize,
    pub udp_addresses: Vec<String>,
    pub tcp_addresses: Vec<String>,
    pub upstream_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: DEFAULT_WORKERS,
            worker_queue_size: DEFAULT_WORKER_QUEUE_SIZE,
            udp_addresses: vec![],
            tcp_addresses: vec![],
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}
