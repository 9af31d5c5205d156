//! # Exchange Identifiers
//!
//! Typed 20-byte identifiers for assets and accounts, plus the canonical
//! [`PairId`] that names a trading pair independently of request order.
//!
//! Identifiers render as `0x`-prefixed lowercase hex and serialize as hex
//! strings so configuration files and event streams stay human-readable.
//!
//! ```rust
//! use types::{AssetId, PairId};
//!
//! let usdc = AssetId::from_u64(1);
//! let weth = AssetId::from_u64(2);
//!
//! assert_eq!(PairId::new(usdc, weth), PairId::new(weth, usdc));
//! assert_eq!(PairId::new(weth, usdc).asset_a(), usdc);
//! ```

use crate::common::errors::IdentifierError;
use std::str::FromStr;

/// Width in bytes of asset and account identifiers
pub const IDENTIFIER_LEN: usize = 20;

/// Macro for generating 20-byte typed identifier wrappers
///
/// Generated types are `Copy`, totally ordered by their bytes, and
/// round-trip through hex strings for display, parsing and serde.
#[macro_export]
macro_rules! define_typed_address {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(pub [u8; $crate::common::identifiers::IDENTIFIER_LEN]);

        impl $name {
            /// The all-zero identifier, rejected wherever a real identifier is required
            pub const ZERO: Self = Self([0u8; $crate::common::identifiers::IDENTIFIER_LEN]);

            /// Create a new typed identifier
            #[inline(always)]
            pub const fn new(inner: [u8; $crate::common::identifiers::IDENTIFIER_LEN]) -> Self {
                Self(inner)
            }

            /// Build an identifier whose trailing eight bytes hold `value` (big-endian)
            pub fn from_u64(value: u64) -> Self {
                let mut bytes = [0u8; $crate::common::identifiers::IDENTIFIER_LEN];
                bytes[$crate::common::identifiers::IDENTIFIER_LEN - 8..]
                    .copy_from_slice(&value.to_be_bytes());
                Self(bytes)
            }

            /// True for the all-zero identifier
            #[inline(always)]
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Get a reference to the inner bytes
            #[inline(always)]
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Render as `0x`-prefixed lowercase hex
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "0x")?;
                for byte in self.as_bytes() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::common::errors::IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::common::identifiers::parse_hex_identifier(s).map(Self)
            }
        }

        impl From<[u8; $crate::common::identifiers::IDENTIFIER_LEN]> for $name {
            #[inline(always)]
            fn from(inner: [u8; $crate::common::identifiers::IDENTIFIER_LEN]) -> Self {
                Self(inner)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Decode a hex string (with or without `0x`) into a fixed-width identifier
pub fn parse_hex_identifier(s: &str) -> Result<[u8; IDENTIFIER_LEN], IdentifierError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let decoded = hex::decode(digits).map_err(|_| IdentifierError::InvalidHex {
        input: s.to_string(),
    })?;

    if decoded.len() != IDENTIFIER_LEN {
        return Err(IdentifierError::InvalidLength {
            expected: IDENTIFIER_LEN,
            actual: decoded.len(),
        });
    }

    let mut bytes = [0u8; IDENTIFIER_LEN];
    bytes.copy_from_slice(&decoded);
    Ok(bytes)
}

define_typed_address!(
    /// Identifier of a tradable asset
    AssetId
);

define_typed_address!(
    /// Identifier of an account (liquidity provider, trader, recipient)
    AccountId
);

/// Canonical identity of a trading pair
///
/// The smaller asset identifier is always stored first, so a pair has exactly
/// one key regardless of the order in which its assets are named.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(from = "[AssetId; 2]", into = "[AssetId; 2]")]
pub struct PairId {
    asset_a: AssetId,
    asset_b: AssetId,
}

impl PairId {
    /// Derive the canonical identity of the pair formed by `x` and `y`
    pub fn new(x: AssetId, y: AssetId) -> Self {
        if x <= y {
            Self {
                asset_a: x,
                asset_b: y,
            }
        } else {
            Self {
                asset_a: y,
                asset_b: x,
            }
        }
    }

    /// The smaller asset of the pair
    #[inline(always)]
    pub fn asset_a(&self) -> AssetId {
        self.asset_a
    }

    /// The larger asset of the pair
    #[inline(always)]
    pub fn asset_b(&self) -> AssetId {
        self.asset_b
    }

    /// Whether `asset` is one side of this pair
    pub fn contains(&self, asset: AssetId) -> bool {
        self.asset_a == asset || self.asset_b == asset
    }

    /// The side opposite to `asset`, if `asset` belongs to the pair
    pub fn counterpart(&self, asset: AssetId) -> Option<AssetId> {
        if asset == self.asset_a {
            Some(self.asset_b)
        } else if asset == self.asset_b {
            Some(self.asset_a)
        } else {
            None
        }
    }

    /// Whether the pair names the same asset twice
    pub fn is_self_pair(&self) -> bool {
        self.asset_a == self.asset_b
    }
}

impl From<[AssetId; 2]> for PairId {
    fn from(assets: [AssetId; 2]) -> Self {
        Self::new(assets[0], assets[1])
    }
}

impl From<PairId> for [AssetId; 2] {
    fn from(pair: PairId) -> Self {
        [pair.asset_a, pair.asset_b]
    }
}

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.asset_a, self.asset_b)
    }
}

impl FromStr for PairId {
    type Err = IdentifierError;

    /// Parse `"<asset>/<asset>"` in either order
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (left, right) = s.split_once('/').ok_or_else(|| IdentifierError::InvalidHex {
            input: s.to_string(),
        })?;
        Ok(Self::new(left.parse()?, right.parse()?))
    }
}
