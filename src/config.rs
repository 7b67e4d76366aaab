use crate::error::{Error, Result};
use std::str::FromStr;

/// Upper bound on worker threads a single pool may own.
pub const MAX_WORKERS: usize = 1024;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

const ENV_WORKERS: &str = "FIXPOOL_WORKERS";
const ENV_QUEUE_CAPACITY: &str = "FIXPOOL_QUEUE_CAPACITY";
const ENV_THREAD_NAME: &str = "FIXPOOL_THREAD_NAME";
const ENV_STACK_SIZE: &str = "FIXPOOL_STACK_SIZE";
const ENV_PIN_WORKERS: &str = "FIXPOOL_PIN_WORKERS";

#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: Option<usize>,
    /// Maximum number of queued (not yet dispatched) tasks.
    pub queue_capacity: usize,
    pub pin_workers: bool,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            pin_workers: false,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "fixpool-worker".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Default config with `FIXPOOL_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        ConfigBuilder::from_env().build()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > MAX_WORKERS {
                return Err(Error::config(format!(
                    "num_threads too large (max {})",
                    MAX_WORKERS
                )));
            }
        }

        if self.thread_name_prefix.contains('\0') {
            return Err(Error::config("thread_name_prefix must not contain NUL"));
        }

        if self.stack_size == Some(0) {
            return Err(Error::config("stack_size must be > 0"));
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.num_threads
            .unwrap_or_else(|| num_cpus::get().min(MAX_WORKERS))
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from defaults and apply any `FIXPOOL_*` variables that parse.
    pub fn from_env() -> Self {
        let mut builder = Self::new();

        if let Some(n) = env_get::<usize>(ENV_WORKERS) {
            builder = builder.num_threads(n);
        }
        if let Some(cap) = env_get::<usize>(ENV_QUEUE_CAPACITY) {
            builder = builder.queue_capacity(cap);
        }
        if let Ok(prefix) = std::env::var(ENV_THREAD_NAME) {
            builder = builder.thread_name_prefix(prefix);
        }
        if let Some(size) = env_get::<usize>(ENV_STACK_SIZE) {
            builder = builder.stack_size(size);
        }
        if let Some(pin) = env_get_bool(ENV_PIN_WORKERS) {
            builder = builder.pin_workers(pin);
        }

        builder
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.config.pin_workers = pin;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn env_get<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_get_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
