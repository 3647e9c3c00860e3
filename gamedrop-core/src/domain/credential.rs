//! Credential hashing parameters

use serde::{Deserialize, Serialize};

/// Default Argon2id parameters for stored credentials
pub const DEFAULT_TIME_COST: u32 = 2;
pub const DEFAULT_MEMORY_COST: u32 = 19456; // 19 MiB
pub const DEFAULT_PARALLELISM: u32 = 1;
pub const DEFAULT_HASH_LEN: u32 = 32;

/// Argon2id cost parameters
///
/// Only new hashes use these; verification reads the parameters embedded in
/// the stored PHC string, so changing them never locks existing accounts out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argon2Params {
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,
    #[serde(default = "default_memory_cost")]
    pub memory_cost: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    #[serde(default = "default_hash_len")]
    pub hash_len: u32,
}

fn default_time_cost() -> u32 {
    DEFAULT_TIME_COST
}

fn default_memory_cost() -> u32 {
    DEFAULT_MEMORY_COST
}

fn default_parallelism() -> u32 {
    DEFAULT_PARALLELISM
}

fn default_hash_len() -> u32 {
    DEFAULT_HASH_LEN
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost: DEFAULT_MEMORY_COST,
            parallelism: DEFAULT_PARALLELISM,
            hash_len: DEFAULT_HASH_LEN,
        }
    }
}

impl Argon2Params {
    /// Cheapest parameters argon2 accepts; for tests and local tooling
    pub fn minimal() -> Self {
        Self {
            time_cost: 1,
            memory_cost: 8,
            parallelism: 1,
            hash_len: DEFAULT_HASH_LEN,
        }
    }
}
