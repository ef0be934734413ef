//! WhatsApp chat channel — click-to-chat link generation.
//!
//! Builds `wa.me` links carrying the pre-filled message text. What happens
//! to the link (opening a browser, showing a QR code, feeding a device
//! bridge) is the [`LinkOpener`]'s business, not the engine's.

use async_trait::async_trait;

use carillon_core::error::{CarillonError, Result};
use carillon_core::traits::Notifier;
use carillon_core::types::ChannelKind;

/// Build the click-to-chat URL for a normalized (digits-only) address.
pub fn wa_link(address: &str, message: &str) -> String {
    format!(
        "https://wa.me/{}?text={}",
        address,
        urlencoding::encode(message)
    )
}

/// Hands a generated chat link to whatever launches it.
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Default opener: surfaces the link in the log stream. Useful on headless
/// hosts where an operator console or wrapper picks the links up.
pub struct TracingOpener;

impl LinkOpener for TracingOpener {
    fn open(&self, url: &str) -> Result<()> {
        tracing::info!("📱 WhatsApp link ready: {url}");
        Ok(())
    }
}

/// WhatsApp channel implementation over a pluggable link opener.
pub struct WaLinkNotifier<O: LinkOpener> {
    opener: O,
}

impl<O: LinkOpener> WaLinkNotifier<O> {
    pub fn new(opener: O) -> Self {
        Self { opener }
    }
}

#[async_trait]
impl<O: LinkOpener> Notifier for WaLinkNotifier<O> {
    fn channel(&self) -> ChannelKind {
        ChannelKind::WhatsApp
    }

    async fn send(&self, address: &str, _subject: Option<&str>, body: &str) -> Result<()> {
        if address.is_empty() {
            return Err(CarillonError::Channel("empty chat address".into()));
        }
        let url = wa_link(address, body);
        self.opener.open(&url)
    }
}
