//! Refresher error taxonomy

use thiserror::Error;
use timeseries_store::{RegistryError, StoreError};
use types::decay::DecayError;

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("View computation error: {0}")]
    Compute(#[from] DecayError),

    #[error("Backend error: {0}")]
    Backend(String),
}
