//! Upstream sport feed adapters.
//!
//! One adapter per sport, each normalizing its upstream API into the
//! canonical team/event shapes consumed by reconciliation. [`SourceKind`]
//! is the closed set of adapters the scheduler can be configured with.

pub mod client;
pub mod f1;
pub mod formula_e;
pub mod motogp;
pub mod ufc;

pub use client::SourceClient;
pub use f1::F1Source;
pub use formula_e::FormulaESource;
pub use motogp::MotoGpSource;
pub use ufc::UfcSource;

use matchday_core::error::AppError;
use matchday_core::traits::{KeyValueCache, SourcePayload, SportsSource};

/// A configured sport adapter, dispatched by the `kind` field of the
/// sources config.
#[derive(Debug, Clone)]
pub enum SourceKind<C> {
    F1(F1Source<C>),
    FormulaE(FormulaESource),
    MotoGp(MotoGpSource),
    Ufc(UfcSource),
}

impl<C: KeyValueCache> SourceKind<C> {
    /// Builds the adapter named by a config `kind` string.
    pub fn from_kind(kind: &str, cache: C) -> Result<Self, AppError> {
        match kind {
            "f1" => Ok(SourceKind::F1(F1Source::new(SourceClient::new(cache)?))),
            "formula-e" => Ok(SourceKind::FormulaE(FormulaESource)),
            "motogp" => Ok(SourceKind::MotoGp(MotoGpSource)),
            "ufc" => Ok(SourceKind::Ufc(UfcSource)),
            other => Err(AppError::SourceNotFound(format!(
                "unknown source kind '{}'",
                other
            ))),
        }
    }
}

impl<C: KeyValueCache> SportsSource for SourceKind<C> {
    async fn fetch(&self, sport_id: i32) -> Result<SourcePayload, AppError> {
        match self {
            SourceKind::F1(source) => source.fetch(sport_id).await,
            SourceKind::FormulaE(source) => source.fetch(sport_id).await,
            SourceKind::MotoGp(source) => source.fetch(sport_id).await,
            SourceKind::Ufc(source) => source.fetch(sport_id).await,
        }
    }

    fn endpoint(&self) -> String {
        match self {
            SourceKind::F1(source) => source.endpoint(),
            SourceKind::FormulaE(source) => source.endpoint(),
            SourceKind::MotoGp(source) => source.endpoint(),
            SourceKind::Ufc(source) => source.endpoint(),
        }
    }
}
