//! Circular history buffer shared by the LZ decoders.
//!
//! A [`BitWindow`] remembers the most recent `capacity` bytes that passed
//! through a codec session. Back-references are resolved against it one
//! byte at a time, so a copy whose distance is shorter than its length
//! re-reads bytes it has just produced (run-length style overlap).

use crate::error::{CompressionError, Result};

/// Fixed-capacity ring buffer addressed by a monotonically increasing cursor.
#[derive(Debug, Clone)]
pub struct BitWindow {
    buffer: Box<[u8]>,
    mask: usize,
    position: u64,
}

impl BitWindow {
    /// Create a window holding `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "window capacity must be a power of two, got {capacity}"
        );
        Self {
            buffer: vec![0u8; capacity].into_boxed_slice(),
            mask: capacity - 1,
            position: 0,
        }
    }

    /// Window capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Total number of bytes ever pushed.
    pub fn written(&self) -> u64 {
        self.position
    }

    /// Physical index of the next byte to be written.
    pub fn cursor(&self) -> usize {
        (self.position as usize) & self.mask
    }

    /// Append one byte to the history.
    #[inline]
    pub fn push(&mut self, value: u8) {
        let index = self.cursor();
        self.buffer[index] = value;
        self.position += 1;
    }

    /// Append a run of bytes to the history.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        for &b in data {
            self.push(b);
        }
    }

    /// Whether `distance` points at a byte still held by the window.
    ///
    /// Valid distances satisfy `1 <= distance < capacity` and never reach
    /// before the first byte written.
    pub fn is_valid_distance(&self, distance: usize) -> bool {
        distance >= 1 && distance < self.capacity() && (distance as u64) <= self.position
    }

    /// The byte `distance` positions behind the cursor.
    #[inline]
    pub fn byte_back(&self, distance: usize) -> u8 {
        debug_assert!(self.is_valid_distance(distance));
        let index = (self.position as usize).wrapping_sub(distance) & self.mask;
        self.buffer[index]
    }

    /// Copy `length` bytes starting `distance` bytes back, appending each
    /// byte to both the window and `out`.
    pub fn copy_match(&mut self, distance: usize, length: usize, out: &mut Vec<u8>) -> Result<()> {
        if !self.is_valid_distance(distance) {
            return Err(CompressionError::format(format!(
                "back-reference distance {} outside window ({} bytes available, capacity {})",
                distance,
                self.position.min(self.capacity() as u64),
                self.capacity()
            )));
        }

        out.reserve(length);
        for _ in 0..length {
            let value = self.byte_back(distance);
            self.push(value);
            out.push(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_look_back() {
        let mut window = BitWindow::new(8);
        window.extend_from_slice(b"abc");
        assert_eq!(window.written(), 3);
        assert_eq!(window.byte_back(1), b'c');
        assert_eq!(window.byte_back(3), b'a');
    }

    #[test]
    fn test_wraps_around() {
        let mut window = BitWindow::new(4);
        window.extend_from_slice(b"abcdef");
        assert_eq!(window.cursor(), 2);
        assert_eq!(window.byte_back(1), b'f');
        assert_eq!(window.byte_back(4), b'c');
        assert!(!window.is_valid_distance(5));
    }

    #[test]
    fn test_self_overlapping_copy() {
        let mut window = BitWindow::new(64);
        let mut out = Vec::new();
        window.push(b'z');
        out.push(b'z');
        window.copy_match(1, 50, &mut out).unwrap();
        assert_eq!(out.len(), 51);
        assert!(out.iter().all(|&b| b == b'z'));
    }

    #[test]
    fn test_overlapping_pattern_copy() {
        let mut window = BitWindow::new(64);
        let mut out = b"ab".to_vec();
        window.extend_from_slice(b"ab");
        window.copy_match(2, 7, &mut out).unwrap();
        assert_eq!(out, b"ababababa");
    }

    #[test]
    fn test_distance_beyond_history_rejected() {
        let mut window = BitWindow::new(16);
        window.extend_from_slice(b"xy");
        let mut out = Vec::new();
        assert!(window.copy_match(3, 1, &mut out).is_err());
        assert!(window.copy_match(0, 1, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_full_capacity_distance_rejected() {
        let mut window = BitWindow::new(4);
        window.extend_from_slice(b"wxyz");
        let mut out = Vec::new();
        assert!(window.copy_match(4, 4, &mut out).is_err());
        window.copy_match(3, 3, &mut out).unwrap();
        assert_eq!(out, b"xyz");
    }

    #[test]
    fn test_largest_distance_after_wrap() {
        let mut window = BitWindow::new(8);
        window.extend_from_slice(b"0123456789");
        assert!(window.is_valid_distance(7));
        assert!(!window.is_valid_distance(8));
        assert_eq!(window.byte_back(7), b'3');
    }

    #[test]
    #[should_panic]
    fn test_capacity_must_be_power_of_two() {
        let _ = BitWindow::new(100);
    }
}
