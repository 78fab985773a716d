//! Stable per-element ids of realized geometry.

use rayon::prelude::*;

use crate::util::PARALLEL_GRAIN;

/// Fill `dst` with the ids of one task's points.
///
/// With `keep_original_ids` the stored ids are copied verbatim (zero when the
/// source has none). Otherwise every id is hashed with the task's path id, so
/// the same source instanced along different paths gets distinct ids.
pub(crate) fn create_result_ids(keep_original_ids: bool, stored_ids: Option<&[i32]>, task_id: u32, dst: &mut [i32]) {
    match (keep_original_ids, stored_ids) {
        (true, Some(ids)) => dst.copy_from_slice(ids),
        (true, None) => dst.fill(0),
        (false, Some(ids)) => dst
            .par_iter_mut()
            .with_min_len(PARALLEL_GRAIN)
            .zip(ids.par_iter())
            .for_each(|(d, &id)| *d = lookup3::hash2(task_id, id as u32) as i32),
        (false, None) => dst
            .par_iter_mut()
            .with_min_len(PARALLEL_GRAIN)
            .enumerate()
            .for_each(|(i, d)| *d = lookup3::hash2(task_id, i as u32) as i32),
    }
}
