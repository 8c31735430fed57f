//! Bit-level and stream-level I/O

pub mod bit_reader;
pub mod bit_writer;
pub mod stream;

pub use bit_reader::BitReader;
pub use bit_writer::BitWriter;
pub use stream::{CompressionStream, StreamMode};
