//! Sapphire II stream cipher.
//!
//! Locked modules encipher every record payload with a per-module unlock
//! key; backends apply the inverse transform after reading the raw bytes
//! and before any decompression or charset decoding. The cipher is a
//! self-modifying 256-entry permutation ("card deck") driven by five
//! index registers:
//!
//! ```text
//!             ┌──────────── cards[256] ────────────┐
//!   rotor ────┤ advances one step per byte         │
//!   ratchet ──┤ accumulates card values            │
//!   avalanche ┤ diffuses previous output           │
//!   last_plain / last_cipher ── feed back the data │
//!             └────────────────────────────────────┘
//! ```
//!
//! Each byte shuffles four deck positions and emits the input XORed with
//! two deck lookups. Enciphering and deciphering differ only in which
//! side of the XOR feeds the `last_plain`/`last_cipher` registers, so the
//! two directions are exact inverses over the same key.
//!
//! State is burned (zeroed) on drop.

pub mod sapphire;

pub use sapphire::{decipher_in_place, encipher_in_place, Sapphire};
