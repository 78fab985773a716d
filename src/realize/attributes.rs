//! Output attribute buffers shared by the per-kind executors.

use tracing::debug;

use super::schema::{AttributeFallbacks, OrderedAttributes};
use crate::attribute::{AttrDomain, AttributeArray, AttributeSliceMut, AttributeWriter};
use crate::util::{Error, Result};

/// Largest element count a realized component may hold.
pub(crate) const MAX_ELEMENTS: usize = i32::MAX as usize;

/// Fail with [`Error::TooLarge`] if `count` does not fit the output indices.
pub(crate) fn check_size(kind: &'static str, count: usize) -> Result<()> {
    if count > MAX_ELEMENTS {
        return Err(Error::TooLarge { kind, count });
    }
    Ok(())
}

/// One default-filled writer per schema entry.
pub(crate) fn schema_writers(
    schema: &OrderedAttributes,
    domain_size: impl Fn(AttrDomain) -> usize,
) -> Vec<AttributeWriter> {
    schema
        .iter()
        .map(|(name, kind)| AttributeWriter::new(name, kind.domain, kind.data_type, domain_size(kind.domain)))
        .collect()
}

/// Split every writer into per-task windows.
///
/// `count(task, domain)` is the number of elements task `task` writes on
/// `domain`. The result is task-major: entry `t` holds one window per writer.
pub(crate) fn split_writers<'w>(
    writers: &'w mut [AttributeWriter],
    num_tasks: usize,
    count: impl Fn(usize, AttrDomain) -> usize,
) -> Vec<Vec<AttributeSliceMut<'w>>> {
    let mut per_task: Vec<Vec<AttributeSliceMut<'w>>> =
        (0..num_tasks).map(|_| Vec::with_capacity(writers.len())).collect();
    for writer in writers.iter_mut() {
        let domain = writer.domain();
        let parts = writer.data.split_mut((0..num_tasks).map(|task| count(task, domain)));
        for (windows, part) in per_task.iter_mut().zip(parts) {
            windows.push(part);
        }
    }
    per_task
}

/// Write one task's generic attributes.
///
/// Each window receives the source values when the source has the attribute,
/// otherwise the inherited fallback, otherwise it keeps the type default the
/// buffer was allocated with.
pub(crate) fn copy_generic_attributes(
    src: &[Option<AttributeArray>],
    fallbacks: &AttributeFallbacks,
    dst: &mut [AttributeSliceMut<'_>],
) {
    for ((window, src), fallback) in dst.iter_mut().zip(src).zip(fallbacks) {
        match (src, fallback) {
            (Some(values), _) => {
                if !window.copy_from(values) {
                    debug!(
                        expected = window.len(),
                        actual = values.len(),
                        "source attribute does not fit its output window"
                    );
                    window.fill_default();
                }
            }
            (None, Some(value)) => window.fill(*value),
            (None, None) => {}
        }
    }
}
