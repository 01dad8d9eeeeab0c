use crate::error::{FfmError, Result};
use std::mem;
use std::ops::Range;

/// Alignment of the first element, in bytes. Matches four `f32` lanes.
pub const ALIGN_BYTES: usize = 16;

/// Fixed-size float arena whose first element is aligned to [`ALIGN_BYTES`]
///
/// The backing vector is over-allocated by one alignment unit and never
/// reallocated afterwards, so the aligned window stays valid for the lifetime of
/// the buffer. A clone gets its own allocation and computes its own window.
#[derive(Debug)]
pub struct AlignedBuffer<F> {
    data: Vec<F>,
    offset: usize,
    len: usize,
}

/// Elements needed to reach any alignment boundary
fn pad<F>() -> usize {
    (ALIGN_BYTES / mem::size_of::<F>().max(1)).max(1)
}

/// First aligned index of an allocation of at least `pad` elements
fn window_start<F>(data: &[F], pad: usize) -> usize {
    // `align_offset` may refuse to compute an offset, the window then starts unaligned
    match data.as_ptr().align_offset(ALIGN_BYTES) {
        offset if offset < pad => offset,
        _ => 0,
    }
}

/// Fill a vector with spare capacity for `pad` extra elements
fn copy_into<F: Clone>(mut data: Vec<F>, values: &[F]) -> AlignedBuffer<F> {
    debug_assert!(data.is_empty() && data.capacity() >= values.len() + pad::<F>());
    // the pointer of the reserved allocation is final, nothing below reallocates
    let offset = match values.first() {
        Some(first) => {
            let offset = window_start(data.spare_capacity_mut(), pad::<F>());
            data.resize(offset, first.clone());
            offset
        }
        None => 0,
    };
    data.extend_from_slice(values);
    AlignedBuffer {
        data,
        offset,
        len: values.len(),
    }
}

impl<F: Copy> AlignedBuffer<F> {
    /// Allocate `len` elements set to `value`
    ///
    /// Fails with [`FfmError::Allocation`] when the memory cannot be reserved.
    pub fn try_filled(len: usize, value: F) -> Result<Self> {
        let pad = pad::<F>();
        let total = len.checked_add(pad).ok_or(FfmError::Allocation(len))?;

        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| FfmError::Allocation(len))?;
        data.resize(total, value);
        let offset = window_start(&data, pad);

        Ok(AlignedBuffer { data, offset, len })
    }

    /// Copy `values` into a new aligned buffer
    pub fn try_from_slice(values: &[F]) -> Result<Self> {
        let total = values
            .len()
            .checked_add(pad::<F>())
            .ok_or(FfmError::Allocation(values.len()))?;
        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| FfmError::Allocation(values.len()))?;
        Ok(copy_into(data, values))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[F] {
        &self.data[self.offset..self.offset + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [F] {
        &mut self.data[self.offset..self.offset + self.len]
    }

    pub fn is_aligned(&self) -> bool {
        (self.as_slice().as_ptr() as usize) % ALIGN_BYTES == 0
    }

    /// Move `src` to start at `dest`, left compaction only
    ///
    /// The destination must not start after the source: a forward copy then never
    /// reads an element it has already overwritten.
    pub fn shift_left(&mut self, src: Range<usize>, dest: usize) {
        debug_assert!(dest <= src.start, "compaction must move data to the left");
        self.as_mut_slice().copy_within(src, dest);
    }

    /// Shorten the visible window to `len` elements, keeping the allocation
    pub fn truncate(&mut self, len: usize) {
        debug_assert!(len <= self.len);
        self.len = len.min(self.len);
        self.data.truncate(self.offset + self.len);
    }
}

impl<F: Clone> Clone for AlignedBuffer<F> {
    fn clone(&self) -> Self {
        let values = &self.data[self.offset..self.offset + self.len];
        copy_into(Vec::with_capacity(self.len + pad::<F>()), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_is_filled_and_aligned() {
        let buf = AlignedBuffer::try_filled(13, 1.5f32).unwrap();
        assert_eq!(buf.len(), 13);
        assert!(buf.as_slice().iter().all(|&v| v == 1.5));
        assert!(buf.is_aligned());

        let buf = AlignedBuffer::try_filled(7, 0.0f64).unwrap();
        assert!(buf.is_aligned());
    }

    #[test]
    fn empty_buffer() {
        let buf = AlignedBuffer::try_filled(0, 0.0f32).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.as_slice(), &[] as &[f32]);
    }

    #[test]
    fn oversized_buffer_fails() {
        let res = AlignedBuffer::try_filled(usize::MAX, 0.0f32);
        assert!(matches!(res, Err(FfmError::Allocation(_))));

        let res = AlignedBuffer::try_filled(usize::MAX / 8, 0.0f64);
        assert!(matches!(res, Err(FfmError::Allocation(_))));
    }

    #[test]
    fn shift_left_then_truncate() {
        let mut buf = AlignedBuffer::try_filled(8, 0.0f32).unwrap();
        buf.as_mut_slice()
            .iter_mut()
            .enumerate()
            .for_each(|(i, v)| *v = i as f32);
        buf.shift_left(4..6, 1);
        buf.truncate(3);
        assert_eq!(buf.as_slice(), &[0.0, 4.0, 5.0]);
        assert!(buf.is_aligned());
    }

    #[test]
    fn copies_are_aligned() {
        let values: Vec<f32> = (0..11).map(|i| i as f32).collect();
        let buf = AlignedBuffer::try_from_slice(&values).unwrap();
        assert_eq!(buf.as_slice(), values.as_slice());
        assert!(buf.is_aligned());

        let mut compacted = buf.clone();
        compacted.shift_left(6..11, 1);
        compacted.truncate(6);
        let mut copies = vec![compacted.clone()];
        for _ in 0..16 {
            let copy = copies[copies.len() - 1].clone();
            copies.push(copy);
        }
        for copy in &copies {
            assert!(copy.is_aligned());
            assert_eq!(copy.as_slice(), &[0.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        }

        let wide = AlignedBuffer::try_filled(5, 2.0f64).unwrap();
        let copies: Vec<_> = (0..16).map(|_| wide.clone()).collect();
        assert!(copies.iter().all(|c| c.is_aligned() && c.as_slice() == wide.as_slice()));
        assert!(AlignedBuffer::<f32>::try_from_slice(&[]).unwrap().is_empty());
    }
}
