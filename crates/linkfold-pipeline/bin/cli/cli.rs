use clap::{Parser, Subcommand, ValueEnum};
use linkfold_cache::{FilterConfig, FilterSizing};
use linkfold_core::shortcode::{BASE62_SYMBOLS, DEFAULT_WIDTH};
use linkfold_core::{Alphabet, CodeFormat, CoreError};
use linkfold_pipeline::PipelineConfig;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const STORAGE_BACKEND_ENV: &str = "LINKFOLD_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "LINKFOLD_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "LINKFOLD_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "LINKFOLD_REDIS_URL";
pub const FILTER_CAPACITY_ENV: &str = "LINKFOLD_FILTER_CAPACITY";
pub const FILTER_BITS_ENV: &str = "LINKFOLD_FILTER_BITS";
pub const FILTER_FP_RATE_ENV: &str = "LINKFOLD_FILTER_FP_RATE";
pub const FILTER_HASHES_ENV: &str = "LINKFOLD_FILTER_HASHES";
pub const CODE_WIDTH_ENV: &str = "LINKFOLD_CODE_WIDTH";
pub const CODE_ALPHABET_ENV: &str = "LINKFOLD_CODE_ALPHABET";
pub const CACHE_TTL_ENV: &str = "LINKFOLD_CACHE_TTL_SECS";
pub const STORE_TIMEOUT_ENV: &str = "LINKFOLD_STORE_TIMEOUT_MS";
pub const CACHE_TIMEOUT_ENV: &str = "LINKFOLD_CACHE_TIMEOUT_MS";
pub const BASE_URL_ENV: &str = "LINKFOLD_BASE_URL";
pub const LOG_FORMAT_ENV: &str = "LINKFOLD_LOG_FORMAT";

pub const DEFAULT_FILTER_CAPACITY: usize = 10_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 604_800;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "moka")]
    Moka,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten one or more URLs and print `code<TAB>url` per line.
    Shorten {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Resolve one or more codes and print `code<TAB>target` per line.
    Resolve {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Print stored count, filter parameters and cache TTL as JSON.
    Stats,
}

#[derive(Debug, Parser)]
#[command(name = "linkfold", about = "Deterministic URL shortener")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = FILTER_CAPACITY_ENV, default_value_t = DEFAULT_FILTER_CAPACITY)]
    pub filter_capacity: usize,

    /// Bitmap size. Defaults to 96 KiB worth of bits.
    #[arg(long, env = FILTER_BITS_ENV, conflicts_with = "filter_fp_rate")]
    pub filter_bits: Option<u64>,

    /// Size the bitmap for this false-positive rate instead of a bit count.
    #[arg(long, env = FILTER_FP_RATE_ENV)]
    pub filter_fp_rate: Option<f64>,

    /// Fixed hash-function count. Derived from bits and capacity when unset.
    #[arg(long, env = FILTER_HASHES_ENV)]
    pub filter_hashes: Option<u32>,

    #[arg(long, env = CODE_WIDTH_ENV, default_value_t = DEFAULT_WIDTH)]
    pub code_width: usize,

    #[arg(long, env = CODE_ALPHABET_ENV, default_value = BASE62_SYMBOLS)]
    pub code_alphabet: String,

    #[arg(long, env = CACHE_TTL_ENV, default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,

    #[arg(long, env = STORE_TIMEOUT_ENV, default_value_t = DEFAULT_STORE_TIMEOUT_MS)]
    pub store_timeout_ms: u64,

    #[arg(long, env = CACHE_TIMEOUT_ENV, default_value_t = DEFAULT_CACHE_TIMEOUT_MS)]
    pub cache_timeout_ms: u64,

    /// When set, `shorten` prints full short URLs instead of bare codes.
    #[arg(long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

impl CLI {
    pub fn code_format(&self) -> Result<CodeFormat, CoreError> {
        CodeFormat::new(Alphabet::new(self.code_alphabet.as_str())?, self.code_width)
    }

    pub fn filter_config(&self) -> FilterConfig {
        let sizing = match (self.filter_fp_rate, self.filter_bits) {
            (Some(rate), _) => FilterSizing::FalsePositiveRate(rate),
            (None, Some(bits)) => FilterSizing::Bits(bits),
            (None, None) => FilterSizing::default(),
        };
        FilterConfig {
            capacity: self.filter_capacity,
            sizing,
            hash_count: self.filter_hashes,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::builder()
            .cache_ttl(Duration::from_secs(self.cache_ttl_secs))
            .store_timeout(Duration::from_millis(self.store_timeout_ms))
            .cache_timeout(Duration::from_millis(self.cache_timeout_ms))
            .build()
    }
}
