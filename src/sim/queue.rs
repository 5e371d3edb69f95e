//! Growable FIFO ring buffer for crack waves
//!
//! Wave size depends on the terrain and can spike, so the buffer doubles on
//! overflow instead of dropping entries. Growth goes through `try_reserve`
//! so allocation failure surfaces as an error rather than an abort.

use std::collections::TryReserveError;

/// Starting capacity; one typical wave fits without growing
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct RingQueue<T> {
    buf: Vec<Option<T>>,
    head: usize,
    len: usize,
    high_water: usize,
}

impl<T> Default for RingQueue<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<T> RingQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut buf = Vec::with_capacity(capacity);
        buf.resize_with(capacity, || None);
        Self {
            buf,
            head: 0,
            len: 0,
            high_water: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Largest length seen since the last [`reset_high_water`](Self::reset_high_water)
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn reset_high_water(&mut self) {
        self.high_water = self.len;
    }

    /// Append to the back, doubling capacity when full
    pub fn push(&mut self, value: T) -> Result<(), TryReserveError> {
        if self.len == self.buf.len() {
            self.grow()?;
        }
        let tail = (self.head + self.len) % self.buf.len();
        self.buf[tail] = Some(value);
        self.len += 1;
        self.high_water = self.high_water.max(self.len);
        Ok(())
    }

    /// Remove from the front
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.buf[self.head].take();
        self.head = (self.head + 1) % self.buf.len();
        self.len -= 1;
        value
    }

    /// Drop all entries, keeping the allocation
    pub fn clear(&mut self) {
        while self.pop().is_some() {}
        self.head = 0;
    }

    /// Re-lay entries in FIFO order into a buffer twice the size
    fn grow(&mut self) -> Result<(), TryReserveError> {
        let old_cap = self.buf.len();
        let new_cap = old_cap * 2;

        let mut next: Vec<Option<T>> = Vec::new();
        next.try_reserve_exact(new_cap)?;
        for i in 0..self.len {
            next.push(self.buf[(self.head + i) % old_cap].take());
        }
        next.resize_with(new_cap, || None);

        self.buf = next;
        self.head = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut q = RingQueue::with_capacity(4);
        for i in 0..3 {
            q.push(i).unwrap();
        }
        assert_eq!(q.pop(), Some(0));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_growth_preserves_order_across_wrap() {
        let mut q = RingQueue::with_capacity(4);
        // Advance head so the live region wraps before growing
        for i in 0..3 {
            q.push(i).unwrap();
        }
        q.pop();
        q.pop();
        for i in 3..10 {
            q.push(i).unwrap();
        }
        assert_eq!(q.capacity(), 8);
        let drained: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(drained, (2..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_doubles_repeatedly() {
        let mut q = RingQueue::with_capacity(1);
        for i in 0..100 {
            q.push(i).unwrap();
        }
        assert_eq!(q.capacity(), 128);
        assert_eq!(q.len(), 100);
        assert_eq!(q.high_water(), 100);
        assert_eq!(q.pop(), Some(0));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut q = RingQueue::with_capacity(2);
        for i in 0..5 {
            q.push(i).unwrap();
        }
        let cap = q.capacity();
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.pop(), None);
        assert_eq!(q.capacity(), cap);
        q.reset_high_water();
        assert_eq!(q.high_water(), 0);
    }
}
