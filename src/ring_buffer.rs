//! Fixed-capacity ring buffer with oldest-eviction.
//!
//! Storage is a plain `[T; N]` allocated once at construction. Pushing into
//! a full buffer overwrites the oldest element. Index `0` is always the
//! oldest element currently held.

/// Bounded, insertion-ordered container.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    slots: [T; N],
    /// Slot of the oldest element.
    tail: usize,
    len: usize,
}

impl<T: Default, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| T::default()),
            tail: 0,
            len: 0,
        }
    }
}

impl<T: Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> RingBuffer<T, N> {
    /// Append `value`, evicting the oldest element when full.
    pub fn push(&mut self, value: T) {
        if N == 0 {
            return;
        }
        let head = (self.tail + self.len) % N;
        self.slots[head] = value;
        if self.len == N {
            self.tail = (self.tail + 1) % N;
        } else {
            self.len += 1;
        }
    }

    /// Element at logical position `index` (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        Some(&self.slots[(self.tail + index) % N])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Forget every element. Backing storage is kept; stale slots are
    /// overwritten by later pushes.
    pub fn clear(&mut self) {
        self.tail = 0;
        self.len = 0;
    }

    /// Oldest-to-newest iterator over the held elements.
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            buffer: self,
            front: 0,
        }
    }
}

/// Borrowing iterator returned by [`RingBuffer::iter`].
pub struct Iter<'a, T, const N: usize> {
    buffer: &'a RingBuffer<T, N>,
    front: usize,
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.front)?;
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.buffer.len - self.front;
        (left, Some(left))
    }
}

impl<T, const N: usize> ExactSizeIterator for Iter<'_, T, N> {}

impl<'a, T, const N: usize> IntoIterator for &'a RingBuffer<T, N> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
