//! Reusable payload scratch memory
//!
//! Each transceiver keeps one [`PayloadBuffers`] for the lifetime of its
//! sender. Capacities only grow, and only to exactly the size a frame needs,
//! so steady-state streams packetize without touching the allocator.

use super::{PayloadError, PayloadSize};
use std::collections::TryReserveError;

/// Payload byte buffer plus per-chunk length table
#[derive(Debug)]
pub struct PayloadBuffers {
    payload: Box<[u8]>,
    payload_len: usize,
    chunk_lengths: Box<[u32]>,
    chunk_count: usize,
    growths: u64,
}

impl PayloadBuffers {
    /// Allocate both buffers with exact capacities.
    ///
    /// Fails without leaking if either allocation is refused.
    pub fn with_capacity(
        payload_capacity: usize,
        chunk_capacity: usize,
    ) -> Result<Self, TryReserveError> {
        let payload = alloc_exact::<u8>(payload_capacity)?;
        let chunk_lengths = alloc_exact::<u32>(chunk_capacity)?;

        Ok(Self {
            payload,
            payload_len: 0,
            chunk_lengths,
            chunk_count: 0,
            growths: 0,
        })
    }

    pub fn payload_capacity(&self) -> usize {
        self.payload.len()
    }

    pub fn chunk_capacity(&self) -> usize {
        self.chunk_lengths.len()
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Number of reallocations since creation
    pub fn growths(&self) -> u64 {
        self.growths
    }

    /// Grow whichever buffer is smaller than `required`.
    ///
    /// Returns `true` if anything was reallocated. On failure the current
    /// buffers are left untouched.
    pub fn reserve(&mut self, required: PayloadSize) -> Result<bool, TryReserveError> {
        let payload = if required.total_len > self.payload.len() {
            Some(alloc_exact::<u8>(required.total_len)?)
        } else {
            None
        };
        let chunk_lengths = if required.chunk_count > self.chunk_lengths.len() {
            Some(alloc_exact::<u32>(required.chunk_count)?)
        } else {
            None
        };

        let grown = payload.is_some() || chunk_lengths.is_some();
        if let Some(payload) = payload {
            self.payload = payload;
        }
        if let Some(chunk_lengths) = chunk_lengths {
            self.chunk_lengths = chunk_lengths;
        }
        if grown {
            self.payload_len = 0;
            self.chunk_count = 0;
            self.growths += 1;
        }
        Ok(grown)
    }

    /// Whole-capacity slices for the fill pass
    pub fn fill_target(&mut self) -> (&mut [u8], &mut [u32]) {
        (&mut self.payload[..], &mut self.chunk_lengths[..])
    }

    /// Record what the fill pass produced
    pub fn commit(&mut self, filled: PayloadSize) -> Result<(), PayloadError> {
        if filled.total_len > self.payload.len() || filled.chunk_count > self.chunk_lengths.len() {
            return Err(PayloadError::BufferTooSmall {
                needed: filled.total_len,
                chunks: filled.chunk_count,
            });
        }

        let sum: usize = self.chunk_lengths[..filled.chunk_count]
            .iter()
            .map(|len| *len as usize)
            .sum();
        if sum != filled.total_len {
            return Err(PayloadError::InconsistentChunks(format!(
                "chunk lengths add up to {} but {} bytes were written",
                sum, filled.total_len
            )));
        }

        self.payload_len = filled.total_len;
        self.chunk_count = filled.chunk_count;
        Ok(())
    }

    /// Chunks committed by the last fill pass, in order
    pub fn chunks(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        let mut offset = 0usize;
        self.chunk_lengths[..self.chunk_count]
            .iter()
            .map(move |len| {
                let start = offset;
                offset += *len as usize;
                &self.payload[start..offset]
            })
    }
}

fn alloc_exact<T: Copy + Default>(len: usize) -> Result<Box<[T]>, TryReserveError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, T::default());
    Ok(buf.into_boxed_slice())
}
