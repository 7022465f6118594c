//! Application hook ports (driven/secondary ports)
//!
//! Hooks into the embedding application: the downstream bookmark reload
//! triggered after local writes, and the host's background-execution
//! extension primitive.
//!
//! ## Design Notes
//!
//! - `load_bookmarks` is idempotent, takes no parameters and returns
//!   nothing; the adapter is responsible for hopping onto the main
//!   dispatch context.
//! - Lifecycle notifications are delivered on the main context by the
//!   host; they are posted onto the orchestrator's lane as
//!   [`AppLifecycleEvent`] values rather than touching core state
//!   directly.
//! - Expiration of a background extension arrives as
//!   [`AppLifecycleEvent::BackgroundTimeExpired`], not as a return value
//!   of [`IBackgroundActivity::begin`].

/// Application lifecycle transitions relevant to synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycleEvent {
    /// The application is entering the foreground
    WillEnterForeground,
    /// The application moved to the background
    DidEnterBackground,
    /// The granted background-execution extension ran out
    BackgroundTimeExpired,
}

/// Port trait for the downstream bookmark reload hook
#[async_trait::async_trait]
pub trait IBookmarkLoader: Send + Sync {
    /// Reloads the application's bookmarks from the documents directory
    async fn load_bookmarks(&self);
}

/// Port trait for the host's background-execution extension
#[async_trait::async_trait]
pub trait IBackgroundActivity: Send + Sync {
    /// Requests a finite background-execution extension
    async fn begin(&self, reason: &str) -> anyhow::Result<()>;

    /// Ends the current extension, if any
    async fn end(&self);
}
