//! # Carillon Channels
//!
//! Delivery-channel building blocks: address normalization and validation,
//! per-rule message templates, and the in-repo [`Notifier`] implementations
//! (WhatsApp click-to-chat links, file-outbox email).
//!
//! [`Notifier`]: carillon_core::Notifier

pub mod address;
pub mod email;
pub mod templates;
pub mod whatsapp;

pub use email::OutboxEmailNotifier;
pub use whatsapp::{LinkOpener, TracingOpener, WaLinkNotifier, wa_link};
