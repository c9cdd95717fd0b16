//! Store error taxonomy

use crate::journal::JournalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Store lock poisoned")]
    LockPoisoned,
}
