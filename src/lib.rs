//! nlplan: natural-language Solana action planner.
//!
//! Turns a free-text request ("swap 2 SOL to USDC") into a structured,
//! validated, risk-labelled action plan. Planner only: no transactions are
//! built or signed.
//!
//! The pipeline lives in [`planner`]; collaborators sit behind traits in
//! [`llm`], [`tokens`], and [`quote`]; [`gateway`] is the HTTP surface.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod logging;
pub mod planner;
pub mod quote;
pub mod settings;
pub mod tokens;

pub use config::Config;
pub use error::{Error, PlanError};
pub use planner::{PlanOptions, PlanRequest, Planner};
