//! Ticker to mint resolution with single-flight background refresh.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use super::TokenRegistryEntry;
use super::seed::seed_entries;
use super::source::TokenListSource;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Outcome of a ticker lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(TokenRegistryEntry),
    Ambiguous,
    Unresolved,
}

/// Result observed by every caller of one refresh operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { added: usize },
    Failed(String),
}

#[derive(Debug, Default)]
struct RegistryIndex {
    by_ticker: HashMap<String, Vec<TokenRegistryEntry>>,
    by_mint: HashMap<String, TokenRegistryEntry>,
    last_refresh: Option<Instant>,
}

impl RegistryIndex {
    /// First entry for a mint wins.
    fn add_entry(&mut self, entry: TokenRegistryEntry) -> bool {
        if self.by_mint.contains_key(&entry.mint) {
            return false;
        }
        self.by_ticker
            .entry(entry.ticker.to_ascii_uppercase())
            .or_default()
            .push(entry.clone());
        self.by_mint.insert(entry.mint.clone(), entry);
        true
    }
}

type RefreshFuture = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Process-wide token registry.
///
/// Reads never block on a refresh in progress; a refresh only appends
/// entries under a short write lock.
pub struct TokenRegistry {
    index: Arc<RwLock<RegistryIndex>>,
    source: Arc<dyn TokenListSource>,
    refresh_interval: Duration,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl TokenRegistry {
    pub fn new(source: Arc<dyn TokenListSource>) -> Self {
        Self::with_refresh_interval(source, DEFAULT_REFRESH_INTERVAL)
    }

    pub fn with_refresh_interval(source: Arc<dyn TokenListSource>, interval: Duration) -> Self {
        let mut index = RegistryIndex::default();
        for entry in seed_entries() {
            index.add_entry(entry);
        }
        Self {
            index: Arc::new(RwLock::new(index)),
            source,
            refresh_interval: interval,
            in_flight: Mutex::new(None),
        }
    }

    pub fn lookup(&self, ticker: &str) -> Resolution {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        match index.by_ticker.get(&ticker.to_ascii_uppercase()).map(Vec::as_slice) {
            Some([entry]) => Resolution::Resolved(entry.clone()),
            Some([_, _, ..]) => Resolution::Ambiguous,
            _ => Resolution::Unresolved,
        }
    }

    /// Single entry for `ticker`, or `None` when absent or ambiguous.
    pub fn resolve(&self, ticker: &str) -> Option<TokenRegistryEntry> {
        match self.lookup(ticker) {
            Resolution::Resolved(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn is_ambiguous(&self, ticker: &str) -> bool {
        self.lookup(ticker) == Resolution::Ambiguous
    }

    pub fn by_mint(&self, mint: &str) -> Option<TokenRegistryEntry> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index.by_mint.get(mint).cloned()
    }

    pub fn len(&self) -> usize {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index.by_mint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True before the first successful refresh or once the interval has lapsed.
    pub fn needs_refresh(&self) -> bool {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        match index.last_refresh {
            None => true,
            Some(at) => at.elapsed() > self.refresh_interval,
        }
    }

    /// Merge the remote token list. Concurrent callers share one fetch.
    pub async fn refresh(&self) -> RefreshOutcome {
        let operation = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(running) => running.clone(),
                None => {
                    let index = Arc::clone(&self.index);
                    let source = Arc::clone(&self.source);
                    let operation = run_refresh(index, source).boxed().shared();
                    *slot = Some(operation.clone());
                    operation
                }
            }
        };

        let outcome = operation.clone().await;

        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|running| running.ptr_eq(&operation))
        {
            *slot = None;
        }
        outcome
    }
}

async fn run_refresh(
    index: Arc<RwLock<RegistryIndex>>,
    source: Arc<dyn TokenListSource>,
) -> RefreshOutcome {
    let records = match source.fetch().await {
        Ok(records) => records,
        Err(error) => {
            tracing::warn!(error = %error, "token_registry_refresh_failed");
            return RefreshOutcome::Failed(error.to_string());
        }
    };

    let mut index = index.write().unwrap_or_else(PoisonError::into_inner);
    let mut added = 0;
    for record in records {
        if record.symbol.trim().is_empty() || record.address.trim().is_empty() {
            continue;
        }
        let entry = TokenRegistryEntry {
            ticker: record.symbol.to_ascii_uppercase(),
            mint: record.address,
            decimals: record.decimals,
            name: record.name,
        };
        if index.add_entry(entry) {
            added += 1;
        }
    }
    index.last_refresh = Some(Instant::now());
    tracing::info!(added, total = index.by_mint.len(), "token_registry_refreshed");
    RefreshOutcome::Refreshed { added }
}
