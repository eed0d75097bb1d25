//! Token registry: curated seed list plus a remote token list.

mod registry;
mod seed;
mod source;

use serde::{Deserialize, Serialize};

pub use self::registry::{DEFAULT_REFRESH_INTERVAL, RefreshOutcome, Resolution, TokenRegistry};
pub use self::source::{
    DEFAULT_TOKEN_LIST_URL, JupiterTokenList, TokenListRecord, TokenListSource,
};

/// A known on-chain asset. Mints are unique across the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRegistryEntry {
    pub ticker: String,
    pub mint: String,
    pub decimals: u8,
    pub name: String,
}
