// Little bounded cursor pair for the command wire format. All multi-byte
// fields are little-endian; blobs are u32-length-prefixed.

use riptide_base::{err, Result};

pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> ByteReader<'a> {
        ByteReader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(err(format!(
                "short read: want {} bytes, have {}",
                n,
                self.remaining()
            )));
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(u64::from_le_bytes(a))
    }

    pub fn read_blob(&mut self) -> Result<&'a [u8]> {
        let n = self.read_u32()? as usize;
        self.read_bytes(n)
    }

    pub fn read_u64_vec(&mut self) -> Result<Vec<u64>> {
        let n = self.read_u32()? as usize;
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            v.push(self.read_u64()?);
        }
        Ok(v)
    }
}

#[derive(Default)]
pub struct ByteWriter(Vec<u8>);

impl ByteWriter {
    pub fn new() -> ByteWriter {
        ByteWriter(Vec::new())
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn write_u8(&mut self, v: u8) {
        self.0.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, b: &[u8]) {
        self.0.extend_from_slice(b);
    }

    pub fn write_blob(&mut self, b: &[u8]) {
        self.write_u32(b.len() as u32);
        self.write_bytes(b);
    }

    pub fn write_u64_vec(&mut self, v: &[u64]) {
        self.write_u32(v.len() as u32);
        for &x in v {
            self.write_u64(x);
        }
    }
}
