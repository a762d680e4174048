//! Page objects for the IDE under test.
//!
//! Each concrete UI region gets a small page object owning its locators and
//! taking the wait layer by explicit construction, never via global lookup.
//! Cross-cutting behavior is expressed as capability traits implemented per
//! region instead of an inheritance chain.

use crate::result::EsperaResult;
use async_trait::async_trait;

mod ide;
mod login;
mod terminal;

pub use ide::Ide;
pub use login::Login;
pub use terminal::{Terminal, TerminalTab};

/// A region that can be clicked once it is interactable
#[async_trait]
pub trait Clickable {
    /// Wait for the region and click it.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    async fn click(&self) -> EsperaResult<()>;
}

/// A region whose text content can be read
#[async_trait]
pub trait TextReadable {
    /// Wait for the region and read its text content.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    async fn read_text(&self) -> EsperaResult<String>;
}

/// A region with an observable ready/gone lifecycle
#[async_trait]
pub trait Waitable {
    /// Wait until the region is ready for interaction.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    async fn wait_ready(&self) -> EsperaResult<()>;

    /// Wait until the region is gone.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    async fn wait_gone(&self) -> EsperaResult<()>;
}
