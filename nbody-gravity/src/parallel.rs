// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Per-particle fan-out over an active set
//!
//! Every phase of a step (acceleration reset, accumulation, integration) is
//! "for each active particle, independent work". Each task receives the
//! `&mut Particle` it owns straight from the store slice, so write sets are
//! disjoint by construction and no locking is needed. Reads of other
//! particles must go through a snapshot taken before the phase starts.
//!
//! With the `parallel` feature the loops run on Rayon; without it they run
//! sequentially with the same results.

use crate::error::{GravityError, Result};
use crate::particle::Particle;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Validate an active set against a store of `len` particles
///
/// Returns a membership mask indexed by particle index. Fails on the first
/// out-of-range or repeated index, before anything is mutated.
pub(crate) fn active_mask(len: usize, indices: &[usize]) -> Result<Vec<bool>> {
    let mut mask = vec![false; len];
    for &index in indices {
        if index >= len {
            return Err(GravityError::IndexOutOfRange { index, len });
        }
        if mask[index] {
            return Err(GravityError::DuplicateIndex { index });
        }
        mask[index] = true;
    }
    Ok(mask)
}

/// Run `op` once for every particle whose mask entry is set
pub(crate) fn for_each_active<F>(particles: &mut [Particle], mask: &[bool], op: F)
where
    F: Fn(usize, &mut Particle) + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        particles
            .par_iter_mut()
            .enumerate()
            .filter(|(index, _)| mask[*index])
            .for_each(|(index, particle)| op(index, particle));
    }

    #[cfg(not(feature = "parallel"))]
    {
        particles
            .iter_mut()
            .enumerate()
            .filter(|(index, _)| mask[*index])
            .for_each(|(index, particle)| op(index, particle));
    }
}

/// Like [`for_each_active`], with per-worker scratch state from `init`
///
/// Rayon may call `init` more than once per thread; the state must not carry
/// results between particles.
pub(crate) fn for_each_active_with<T, I, F>(
    particles: &mut [Particle],
    mask: &[bool],
    init: I,
    op: F,
) where
    I: Fn() -> T + Sync + Send,
    F: Fn(&mut T, usize, &mut Particle) + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        particles
            .par_iter_mut()
            .enumerate()
            .filter(|(index, _)| mask[*index])
            .for_each_init(init, |state, (index, particle)| op(state, index, particle));
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut state = init();
        particles
            .iter_mut()
            .enumerate()
            .filter(|(index, _)| mask[*index])
            .for_each(|(index, particle)| op(&mut state, index, particle));
    }
}

/// Optional dedicated worker pool
///
/// With `threads == 0` work runs on the global Rayon pool (or inline when
/// the `parallel` feature is off).
pub(crate) struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl WorkerPool {
    /// Use the global Rayon pool
    pub(crate) fn global() -> Self {
        WorkerPool {
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    /// Build a pool with `threads` workers, or none for `threads == 0`
    pub(crate) fn new(threads: usize) -> Result<Self> {
        #[cfg(feature = "parallel")]
        {
            let pool = if threads == 0 {
                None
            } else {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| GravityError::ThreadPool(e.to_string()))?;
                Some(pool)
            };
            Ok(WorkerPool { pool })
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = threads;
            Ok(WorkerPool {})
        }
    }

    /// Run `f` inside the pool
    pub(crate) fn install<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        #[cfg(feature = "parallel")]
        {
            match &self.pool {
                Some(pool) => pool.install(f),
                None => f(),
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            f()
        }
    }

    /// Number of worker threads that `install` will use
    pub(crate) fn thread_count(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            match &self.pool {
                Some(pool) => pool.current_num_threads(),
                None => rayon::current_num_threads(),
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }
}
