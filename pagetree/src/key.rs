#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "std")]
pub(crate) type SavedChildren<H, N> = HashMap<H, N>;
#[cfg(not(feature = "std"))]
pub(crate) type SavedChildren<H, N> = BTreeMap<H, N>;

/// Bound for content hashes used to match children across a resort.
#[cfg(feature = "std")]
pub trait ContentHash: core::hash::Hash + Eq {}
#[cfg(feature = "std")]
impl<H: core::hash::Hash + Eq> ContentHash for H {}

/// Bound for content hashes used to match children across a resort.
#[cfg(not(feature = "std"))]
pub trait ContentHash: Ord {}
#[cfg(not(feature = "std"))]
impl<H: Ord> ContentHash for H {}
