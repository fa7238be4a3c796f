//! Cache and membership-filter implementations for the resolution pipeline.

pub mod bloom;
pub mod moka;
pub mod redis;

pub use self::moka::MokaUrlCache;
pub use self::redis::RedisUrlCache;
pub use bloom::{BloomMembershipFilter, FilterConfig, FilterSizing};
