//! Bulk token list sources used by registry refresh.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::TokenListError;

pub const DEFAULT_TOKEN_LIST_URL: &str = "https://token.jup.ag/all";

/// One record of a bulk token list.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenListRecord {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
    #[serde(default)]
    pub name: String,
}

/// External token list provider.
#[async_trait]
pub trait TokenListSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<TokenListRecord>, TokenListError>;
}

/// Jupiter token list over HTTP.
pub struct JupiterTokenList {
    client: reqwest::Client,
    url: String,
}

impl JupiterTokenList {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TokenListError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TokenListSource for JupiterTokenList {
    async fn fetch(&self) -> Result<Vec<TokenListRecord>, TokenListError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TokenListError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<Vec<TokenListRecord>>().await?)
    }
}
