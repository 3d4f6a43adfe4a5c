//! Board persistence seam
//!
//! The driver never knows where a board goes. Hosts supply a [`BoardSaver`],
//! either by implementing the trait or by wrapping a closure in [`SaveFn`].

use crate::error::SaveError;
use std::future::Future;

/// Asynchronous board save
///
/// Called repeatedly on the autosave cadence, so it must be safe to invoke
/// any number of times.
#[async_trait::async_trait]
pub trait BoardSaver: Send + Sync {
    /// Persist the current board
    async fn save(&self) -> Result<(), SaveError>;
}

/// Closure adapter for [`BoardSaver`]
///
/// ```rust,ignore
/// let saver = SaveFn::new(move || {
///     let client = client.clone();
///     async move { client.upsert_board(&board_id).await.map_err(SaveError::from) }
/// });
/// ```
pub struct SaveFn<F> {
    save: F,
}

impl<F> SaveFn<F> {
    /// Wrap a closure returning a save future
    #[inline]
    pub fn new(save: F) -> Self {
        Self { save }
    }
}

#[async_trait::async_trait]
impl<F, Fut> BoardSaver for SaveFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SaveError>> + Send,
{
    async fn save(&self) -> Result<(), SaveError> {
        (self.save)().await
    }
}

impl<F> std::fmt::Debug for SaveFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveFn").finish_non_exhaustive()
    }
}
