//! # Exchange Types Library
//!
//! Shared type system for the constant-product exchange workspace.
//!
//! ## Design Philosophy
//!
//! - **Type Safety**: Assets, accounts and pairs are distinct types that cannot be mixed up
//! - **Canonical Identity**: [`PairId`] orders its assets so a pair has one key
//! - **Readable Wire Format**: Identifiers serialize as `0x` hex, amounts as decimal strings
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{AccountId, AssetId, PairId};
//!
//! let a = AssetId::from_u64(1);
//! let b = AssetId::from_u64(2);
//! let pair = PairId::new(b, a);
//!
//! assert_eq!(pair.asset_a(), a);
//! assert!(!AccountId::from_u64(9).is_zero());
//! ```

pub mod common;
pub mod events;

pub use common::errors::IdentifierError;
pub use common::identifiers::{AccountId, AssetId, PairId, IDENTIFIER_LEN};
pub use events::ExchangeEvent;

/// Fractional digits kept for amounts, reserves and shares
pub const AMOUNT_SCALE: u32 = 12;

/// Decimal type used for every amount, reserve and share balance
pub use rust_decimal::Decimal;
