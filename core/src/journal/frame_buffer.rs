//! Incremental newline framing over a live-growing file.
//!
//! The journal is appended to by another process, so a read can end in the
//! middle of a record. `FrameBuffer` keeps the unconsumed tail between calls
//! and hands out each complete `\n`-terminated record exactly once.

use memchr::memchr;
use std::io::{self, ErrorKind, Read};
use std::ops::Range;

/// Initial size of the backing store. Grows by doubling, never shrinks.
pub const INITIAL_CAPACITY: usize = 4096;

const DELIMITER: u8 = b'\n';

#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    /// First byte not yet delivered in a record.
    start: usize,
    /// Bytes in `start..scanned` are known to contain no delimiter.
    scanned: usize,
    /// One past the last byte read.
    end: usize,
    bytes_read: u64,
    bytes_delivered: u64,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            start: 0,
            scanned: 0,
            end: 0,
            bytes_read: 0,
            bytes_delivered: 0,
        }
    }

    /// Forget any retained partial record and reset the byte accounting.
    /// The backing store keeps its current size.
    pub fn clear(&mut self) {
        self.start = 0;
        self.scanned = 0;
        self.end = 0;
        self.bytes_read = 0;
        self.bytes_delivered = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes read but not yet delivered (the partial trailing record).
    pub fn retained(&self) -> usize {
        self.end - self.start
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn bytes_delivered(&self) -> u64 {
        self.bytes_delivered
    }

    /// Read until `read` reports zero bytes, invoking `on_record` once per
    /// complete record in file order. Returns the number of bytes read.
    ///
    /// Zero bytes means "nothing more right now", not end of file: the
    /// writer may append more later and the next `fill` picks up from there.
    pub fn fill<R, F>(&mut self, mut read: R, mut on_record: F) -> io::Result<usize>
    where
        R: FnMut(&mut [u8]) -> io::Result<usize>,
        F: FnMut(&[u8]),
    {
        let mut total = 0;
        loop {
            self.make_room();
            let n = self.read_into(&mut read)?;
            if n == 0 {
                return Ok(total);
            }
            total += n;

            while let Some(range) = self.take_record() {
                on_record(&self.buf[range]);
            }
            self.compact();
        }
    }

    /// `fill` from any `Read` implementation.
    pub fn fill_from<T: Read, F: FnMut(&[u8])>(
        &mut self,
        reader: &mut T,
        on_record: F,
    ) -> io::Result<usize> {
        self.fill(|buf| reader.read(buf), on_record)
    }

    /// Pull-style access: return the next complete record, reading more
    /// only when none is buffered. `Ok(None)` when `read` reports zero bytes.
    pub fn next_record<R>(&mut self, mut read: R) -> io::Result<Option<&[u8]>>
    where
        R: FnMut(&mut [u8]) -> io::Result<usize>,
    {
        loop {
            if let Some(range) = self.take_record() {
                return Ok(Some(&self.buf[range]));
            }
            self.make_room();
            if self.read_into(&mut read)? == 0 {
                return Ok(None);
            }
        }
    }

    /// Locate the next delimiter in the unconsumed region and mark the
    /// record up to and including it as delivered.
    fn take_record(&mut self) -> Option<Range<usize>> {
        match memchr(DELIMITER, &self.buf[self.scanned..self.end]) {
            Some(offset) => {
                let record = self.start..self.scanned + offset + 1;
                self.start = record.end;
                self.scanned = record.end;
                self.bytes_delivered += record.len() as u64;
                Some(record)
            }
            None => {
                self.scanned = self.end;
                None
            }
        }
    }

    /// Ensure there is free space after `end`: compact if records were
    /// consumed from the front, otherwise double the backing store.
    fn make_room(&mut self) {
        if self.end < self.buf.len() {
            return;
        }
        if self.start > 0 {
            self.compact();
        } else {
            let doubled = self.buf.len() * 2;
            self.buf.resize(doubled, 0);
        }
    }

    /// Move the retained tail to the front of the buffer.
    fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        let retained = self.end - self.start;
        if retained > 0 {
            self.buf.copy_within(self.start..self.end, 0);
        }
        self.scanned -= self.start;
        self.start = 0;
        self.end = retained;
    }

    fn read_into<R>(&mut self, read: &mut R) -> io::Result<usize>
    where
        R: FnMut(&mut [u8]) -> io::Result<usize>,
    {
        loop {
            match read(&mut self.buf[self.end..]) {
                Ok(n) => {
                    self.end += n;
                    self.bytes_read += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves `chunks` one per call, then zero.
    fn chunked_reader<'a>(chunks: &'a [&'a [u8]]) -> impl FnMut(&mut [u8]) -> io::Result<usize> + 'a {
        let mut idx = 0;
        let mut offset = 0;
        move |out: &mut [u8]| {
            let Some(chunk) = chunks.get(idx) else {
                return Ok(0);
            };
            let remaining = &chunk[offset..];
            let n = remaining.len().min(out.len());
            out[..n].copy_from_slice(&remaining[..n]);
            offset += n;
            if offset == chunk.len() {
                idx += 1;
                offset = 0;
            }
            Ok(n)
        }
    }

    fn collect(buffer: &mut FrameBuffer, chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut records = Vec::new();
        buffer
            .fill(chunked_reader(chunks), |r| records.push(r.to_vec()))
            .unwrap();
        records
    }

    fn assert_conserved(buffer: &FrameBuffer) {
        assert_eq!(
            buffer.bytes_read(),
            buffer.bytes_delivered() + buffer.retained() as u64
        );
    }

    #[test]
    fn test_records_across_reads() {
        let mut buffer = FrameBuffer::new();
        let records = collect(&mut buffer, &[b"a\nbc\n", b"d\n"]);
        assert_eq!(records, vec![b"a\n".to_vec(), b"bc\n".to_vec(), b"d\n".to_vec()]);
        assert_eq!(buffer.retained(), 0);
        assert_conserved(&buffer);
    }

    #[test]
    fn test_every_split_point_yields_same_records() {
        let input: &[u8] = b"{\"event\":\"A\"}\n\n{\"event\":\"Bee\"}\nxyz\n{\"partial\"";
        let expected = vec![
            b"{\"event\":\"A\"}\n".to_vec(),
            b"\n".to_vec(),
            b"{\"event\":\"Bee\"}\n".to_vec(),
            b"xyz\n".to_vec(),
        ];

        for split in 0..=input.len() {
            let (a, b) = input.split_at(split);
            let mut buffer = FrameBuffer::with_capacity(8);
            let mut records = Vec::new();
            buffer
                .fill(chunked_reader(&[a]), |r| records.push(r.to_vec()))
                .unwrap();
            buffer
                .fill(chunked_reader(&[b]), |r| records.push(r.to_vec()))
                .unwrap();
            assert_eq!(records, expected, "split at {split}");
            assert_eq!(buffer.retained(), b"{\"partial\"".len());
            assert_conserved(&buffer);
        }
    }

    #[test]
    fn test_single_byte_reads() {
        let input: &[u8] = b"one\ntwo\nthree\n";
        let chunks: Vec<&[u8]> = input.chunks(1).collect();
        let mut buffer = FrameBuffer::with_capacity(2);
        let records = collect(&mut buffer, &chunks);
        assert_eq!(
            records,
            vec![b"one\n".to_vec(), b"two\n".to_vec(), b"three\n".to_vec()]
        );
        assert_conserved(&buffer);
    }

    #[test]
    fn test_record_larger_than_initial_capacity() {
        let mut big = vec![b'x'; 10_000];
        big.push(b'\n');
        let mut buffer = FrameBuffer::with_capacity(4096);

        let records = collect(&mut buffer, &[&big[..3000], &big[3000..], b"tail\n"]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], big);
        assert_eq!(records[1], b"tail\n".to_vec());
        assert!(buffer.capacity() >= 10_001);
        assert_conserved(&buffer);
    }

    #[test]
    fn test_conservation_with_irregular_reads() {
        let mut input = Vec::new();
        for i in 0..500 {
            input.extend(std::iter::repeat_n(b'a' + (i % 26) as u8, i * 7 % 311));
            input.push(b'\n');
        }
        input.extend_from_slice(b"unterminated");

        // Deterministic irregular chunk sizes.
        let mut chunks = Vec::new();
        let mut pos = 0;
        let mut seed: u32 = 0x2545_f491;
        while pos < input.len() {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let len = ((seed >> 16) as usize % 900 + 1).min(input.len() - pos);
            chunks.push(&input[pos..pos + len]);
            pos += len;
        }

        let mut buffer = FrameBuffer::with_capacity(64);
        let mut delivered = Vec::new();
        for chunk in chunks.iter().copied() {
            buffer
                .fill(chunked_reader(&[chunk]), |r| delivered.extend_from_slice(r))
                .unwrap();
            assert_conserved(&buffer);
        }

        assert_eq!(delivered.len() + buffer.retained(), input.len());
        assert_eq!(&input[..delivered.len()], &delivered[..]);
        assert_eq!(buffer.retained(), b"unterminated".len());
    }

    #[test]
    fn test_next_record_pull() {
        let chunks: &[&[u8]] = &[b"first\nsec", b"ond\n"];
        let mut read = chunked_reader(chunks);
        let mut buffer = FrameBuffer::with_capacity(4);

        assert_eq!(buffer.next_record(&mut read).unwrap(), Some(&b"first\n"[..]));
        assert_eq!(buffer.next_record(&mut read).unwrap(), Some(&b"second\n"[..]));
        assert_eq!(buffer.next_record(&mut read).unwrap(), None);
        assert_conserved(&buffer);
    }

    #[test]
    fn test_clear_drops_partial_tail() {
        let mut buffer = FrameBuffer::new();
        let records = collect(&mut buffer, &[b"done\nhalf"]);
        assert_eq!(records.len(), 1);
        assert_eq!(buffer.retained(), 4);

        buffer.clear();
        assert_eq!(buffer.retained(), 0);
        let records = collect(&mut buffer, &[b"fresh\n"]);
        assert_eq!(records, vec![b"fresh\n".to_vec()]);
    }

    #[test]
    fn test_would_block_ends_fill() {
        let mut calls = 0;
        let mut buffer = FrameBuffer::new();
        let mut records = Vec::new();
        let read = |out: &mut [u8]| {
            calls += 1;
            if calls == 1 {
                out[..3].copy_from_slice(b"ok\n");
                Ok(3)
            } else {
                Err(io::Error::from(ErrorKind::WouldBlock))
            }
        };
        let n = buffer.fill(read, |r| records.push(r.to_vec())).unwrap();
        assert_eq!(n, 3);
        assert_eq!(records, vec![b"ok\n".to_vec()]);
    }
}
