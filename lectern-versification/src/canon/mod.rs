//! Built-in canon tables.
//!
//! Each submodule carries one reference system's book order and
//! per-chapter last-verse tables as `const` data, plus a constructor
//! that assembles the [`Versification`](crate::Versification).

pub mod kjv;
