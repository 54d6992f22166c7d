//! Keyset Reads
//!
//! The seam between the chunk loader and the backing store.
//!
//! ## Why keyset, not offset
//! A window at absolute row `p` is fetched as
//! `key >= first_key + p ORDER BY key LIMIT window_size`, never as
//! "skip `p` rows". The store resolves the seek key through its index, so a
//! window three million rows deep costs the same as the first one.
//!
//! ## Precondition
//! `key_for(p) = first_key + p` holds only because keys are dense and start
//! at `first_key` with no gaps. The record store is append-only and never
//! deletes, which is what makes the mapping valid. A store that allowed
//! deletes would break row addressing, not just performance.

use crate::error::Result;
use crate::store::Record;

/// Bounded, ordered range reads by seek key
///
/// Implementations return records with `key >= start_key`, ascending by key,
/// at most `limit` of them (fewer only at the end of the data). The cost must
/// not grow with the distance of `start_key` from the start of the data.
pub trait KeysetReader {
    fn read_range(&mut self, start_key: u64, limit: usize) -> Result<Vec<Record>>;
}

impl<R: KeysetReader + ?Sized> KeysetReader for Box<R> {
    fn read_range(&mut self, start_key: u64, limit: usize) -> Result<Vec<Record>> {
        (**self).read_range(start_key, limit)
    }
}
