//! Slice partitioning helpers.

/// Split `slice` into consecutive mutable parts of the given sizes.
///
/// Elements past the sum of `counts` are not returned. Panics if the counts
/// add up to more than `slice.len()`.
pub fn split_counts_mut<T>(slice: &mut [T], counts: impl IntoIterator<Item = usize>) -> Vec<&mut [T]> {
    let mut rest = slice;
    let counts = counts.into_iter();
    let mut parts = Vec::with_capacity(counts.size_hint().0);
    for count in counts {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(count);
        parts.push(head);
        rest = tail;
    }
    parts
}

/// Split an optional buffer, yielding `None` for every part when it is absent.
pub fn split_optional_mut<T>(
    slice: Option<&mut [T]>,
    counts: impl IntoIterator<Item = usize>,
) -> Vec<Option<&mut [T]>> {
    match slice {
        Some(slice) => split_counts_mut(slice, counts).into_iter().map(Some).collect(),
        None => counts.into_iter().map(|_| None).collect(),
    }
}
