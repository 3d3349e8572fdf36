//! Uniform random selection of draw winners.
//!
//! The number of winners is `min(requested, waiting, remaining capacity)`.
//! Every waiting entrant has the same chance of being picked, nobody is
//! picked twice, and only entrants from the snapshot can come out.
//!
//! Two algorithms share those guarantees:
//!
//! - [`DrawSelector::select`]: partial Fisher–Yates over an in-memory snapshot
//! - [`DrawSelector::select_from_iter`]: reservoir sampling (Algorithm R) for
//!   snapshots that arrive page by page

use lottery_core::RemainingCapacity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Outcome of a selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection<T> {
    /// At least one winner.
    Winners(Vec<T>),
    /// Nothing to pick: the snapshot is empty or no places remain.
    EmptySelection,
}

impl<T> Selection<T> {
    /// Number of winners
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Winners(winners) => winners.len(),
            Self::EmptySelection => 0,
        }
    }

    /// Whether nobody was picked
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::EmptySelection)
    }

    /// The winners, empty for [`Selection::EmptySelection`]
    #[must_use]
    pub fn into_winners(self) -> Vec<T> {
        match self {
            Self::Winners(winners) => winners,
            Self::EmptySelection => Vec::new(),
        }
    }
}

/// Errors from [`DrawSelector`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    /// A draw must ask for at least one winner.
    #[error("A draw must request at least one winner")]
    NothingRequested,
}

/// Capacity- and size-bounded uniform selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawSelector;

impl DrawSelector {
    /// How many winners a draw can produce.
    ///
    /// ```
    /// use lottery_core::RemainingCapacity;
    /// use lottery_runtime::selector::DrawSelector;
    ///
    /// assert_eq!(DrawSelector::selection_size(5, 3, RemainingCapacity::Limited(2)), 2);
    /// assert_eq!(DrawSelector::selection_size(1, 3, RemainingCapacity::Unbounded), 1);
    /// ```
    #[must_use]
    pub fn selection_size(requested: usize, waiting: usize, remaining: RemainingCapacity) -> usize {
        requested.min(waiting).min(remaining.as_limit())
    }

    /// Pick winners from an in-memory snapshot.
    ///
    /// Shuffles only the first `n` positions (partial Fisher–Yates), which
    /// yields the same distribution as a full shuffle followed by taking `n`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NothingRequested`] when `requested` is zero.
    pub fn select<T, R>(
        rng: &mut R,
        mut waiting: Vec<T>,
        requested: usize,
        remaining: RemainingCapacity,
    ) -> Result<Selection<T>, SelectionError>
    where
        R: Rng + ?Sized,
    {
        if requested == 0 {
            return Err(SelectionError::NothingRequested);
        }

        let n = Self::selection_size(requested, waiting.len(), remaining);
        if n == 0 {
            return Ok(Selection::EmptySelection);
        }

        let len = waiting.len();
        for i in 0..n {
            let j = rng.gen_range(i..len);
            waiting.swap(i, j);
        }
        waiting.truncate(n);

        Ok(Selection::Winners(waiting))
    }

    /// Pick winners from a snapshot streamed through an iterator.
    ///
    /// Holds at most `min(requested, remaining)` items in memory.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NothingRequested`] when `requested` is zero.
    pub fn select_from_iter<T, I, R>(
        rng: &mut R,
        waiting: I,
        requested: usize,
        remaining: RemainingCapacity,
    ) -> Result<Selection<T>, SelectionError>
    where
        I: IntoIterator<Item = T>,
        R: Rng + ?Sized,
    {
        if requested == 0 {
            return Err(SelectionError::NothingRequested);
        }

        let n = requested.min(remaining.as_limit());
        if n == 0 {
            return Ok(Selection::EmptySelection);
        }

        let mut reservoir = Vec::with_capacity(n.min(1024));
        for (seen, item) in waiting.into_iter().enumerate() {
            if reservoir.len() < n {
                reservoir.push(item);
            } else {
                let j = rng.gen_range(0..=seen);
                if j < n {
                    reservoir[j] = item;
                }
            }
        }

        if reservoir.is_empty() {
            Ok(Selection::EmptySelection)
        } else {
            Ok(Selection::Winners(reservoir))
        }
    }
}

/// Source of per-draw random number generators.
///
/// Without a seed every draw gets a fresh entropy-seeded generator. With a
/// seed, draw `k` uses `seed ^ k`, so a sequence of draws replays exactly.
/// No lock is held; concurrent draws only share an atomic counter.
#[derive(Debug, Default)]
pub struct RngSource {
    seed: Option<u64>,
    draws: AtomicU64,
}

impl RngSource {
    /// Entropy-seeded generators
    #[must_use]
    pub const fn from_entropy() -> Self {
        Self {
            seed: None,
            draws: AtomicU64::new(0),
        }
    }

    /// Reproducible generators derived from `seed`
    #[must_use]
    pub const fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            draws: AtomicU64::new(0),
        }
    }

    /// Generator for the next draw.
    pub fn next_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => {
                let draw = self.draws.fetch_add(1, Ordering::Relaxed);
                StdRng::seed_from_u64(seed ^ draw)
            },
            None => StdRng::from_entropy(),
        }
    }
}
