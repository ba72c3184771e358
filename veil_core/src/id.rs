// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instance identity.
//!
//! Two kinds of identity exist for a veil:
//!
//! - A random *instance id* from [`generate`], baked into the composite id so
//!   that markers and surfaces of successive veils sharing a logical id never
//!   collide on the page.
//! - A [`VeilId`] handle addressing the instance inside its
//!   [`Registry`](crate::registry::Registry). Handles carry a generation
//!   counter, so a handle to a released instance is detected instead of
//!   silently addressing whatever reuses the slot.

use alloc::string::String;
use core::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng as _};

/// Symbols used in generated ids: `0-9A-Za-z`.
pub const ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Seed used when the platform cannot provide entropy.
const FALLBACK_SEED: u64 = 0x5EED_0F_7E11;

/// Generates a random id of `length` symbols drawn uniformly, with
/// replacement, from [`ALPHABET`].
pub fn generate<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

/// Generates an id of the default length
/// ([`DEFAULT_ID_LENGTH`](crate::config::DEFAULT_ID_LENGTH)).
pub fn generate_default<R: Rng + ?Sized>(rng: &mut R) -> String {
    generate(rng, crate::config::DEFAULT_ID_LENGTH)
}

/// Creates the non-cryptographic generator used for instance ids.
///
/// A fixed `seed` makes ids reproducible (useful in tests); otherwise the
/// generator is seeded from platform entropy.
#[must_use]
pub fn id_rng(seed: Option<u64>) -> SmallRng {
    let seed = seed.unwrap_or_else(|| getrandom::u64().unwrap_or(FALLBACK_SEED));
    SmallRng::seed_from_u64(seed)
}

/// A handle to a veil in a [`Registry`](crate::registry::Registry).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VeilId {
    /// Slot index into the registry's instance table.
    pub(crate) idx: u32,
    /// Generation counter; must match the registry's generation for the slot.
    pub(crate) generation: u32,
}

impl VeilId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for VeilId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VeilId({}@gen{})", self.idx, self.generation)
    }
}
