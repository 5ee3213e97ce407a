//! Splits large identifier collections into bounded sub-requests.
//!
//! Segments are numbered from 1. All but the last segment hold
//! `ceil(n / request_count)` ids; the last one runs to the end of the
//! collection. When the division leaves nothing for trailing segments they
//! are still produced, with an empty id slice, so completion tracking sees
//! every planned segment.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a, T> {
    /// 1-based position of this segment within its plan.
    pub index: usize,
    pub ids: &'a [T],
}

impl<T> Segment<'_, T> {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Number of sub-requests to issue for `len` ids: `min(len, max_concurrency)`,
/// never less than one.
pub fn request_count(len: usize, max_concurrency: usize) -> usize {
    len.min(max_concurrency).max(1)
}

pub fn plan_segments<T>(ids: &[T], max_concurrency: usize) -> Vec<Segment<'_, T>> {
    let count = request_count(ids.len(), max_concurrency);
    let size = ids.len().div_ceil(count);

    (1..=count)
        .map(|index| {
            let start = ((index - 1) * size).min(ids.len());
            let end = if index == count {
                ids.len()
            } else {
                (index * size).min(ids.len())
            };
            Segment {
                index,
                ids: &ids[start..end],
            }
        })
        .collect()
}

/// All-of-N completion map for the segments of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentCompletion {
    done: BTreeMap<usize, bool>,
}

impl SegmentCompletion {
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            done: indices.into_iter().map(|i| (i, false)).collect(),
        }
    }

    pub fn for_segments<T>(segments: &[Segment<'_, T>]) -> Self {
        Self::new(segments.iter().map(|s| s.index))
    }

    /// Marks `index` complete. Returns `true` once every segment has completed.
    ///
    /// Unknown indices are ignored.
    pub fn complete(&mut self, index: usize) -> bool {
        if let Some(flag) = self.done.get_mut(&index) {
            *flag = true;
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.done.values().all(|d| *d)
    }

    pub fn pending(&self) -> usize {
        self.done.values().filter(|d| !**d).count()
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }
}
