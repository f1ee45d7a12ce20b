// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Bounded pool of GPU device ids shared by worker threads

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::{ArenaError, Result};

/// Fixed set of GPU ids; `acquire` blocks while every id is leased
#[derive(Debug)]
pub struct GpuPool {
    free: Mutex<Vec<u32>>,
    released: Condvar,
    capacity: usize,
}

/// A leased GPU id, returned to the pool on drop
#[derive(Debug)]
pub struct GpuLease<'a> {
    pool: &'a GpuPool,
    id: u32,
}

impl GpuLease<'_> {
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Drop for GpuLease<'_> {
    fn drop(&mut self) {
        self.pool.lock().push(self.id);
        self.pool.released.notify_one();
    }
}

impl GpuPool {
    pub fn new(ids: impl IntoIterator<Item = u32>) -> Result<Self> {
        // first-declared id is leased first
        let mut free: Vec<u32> = ids.into_iter().collect();
        if free.is_empty() {
            return Err(ArenaError::Config("GPU pool needs at least one device id".to_string()));
        }
        free.reverse();
        Ok(Self {
            capacity: free.len(),
            free: Mutex::new(free),
            released: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u32>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lease an id, waiting for a release when none is free
    pub fn acquire(&self) -> GpuLease<'_> {
        let mut free = self.lock();
        loop {
            if let Some(id) = free.pop() {
                return GpuLease { pool: self, id };
            }
            free = self
                .released
                .wait(free)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn try_acquire(&self) -> Option<GpuLease<'_>> {
        let id = self.lock().pop()?;
        Some(GpuLease { pool: self, id })
    }

    pub fn available(&self) -> usize {
        self.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
