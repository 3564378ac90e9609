// Minimal fixed-stride row buffer used by the projection path. A row
// group owns a flat byte buffer; fields live at fixed offsets inside a
// row, and rows pack back-to-back at row_size stride.

use riptide_base::{overflow_err, Result};

#[derive(Clone, Debug)]
pub struct RowGroup {
    data: Vec<u8>,
    row_size: usize,
    row_count: usize,
}

impl RowGroup {
    pub fn new(row_size: usize, capacity_rows: usize) -> RowGroup {
        RowGroup {
            data: vec![0; row_size * capacity_rows],
            row_size,
            row_count: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn set_row_count(&mut self, n: usize) -> Result<()> {
        if n * self.row_size > self.data.len() {
            return Err(overflow_err(format!(
                "row group capacity exceeded: {} rows of {} bytes",
                n, self.row_size
            )));
        }
        self.row_count = n;
        Ok(())
    }

    fn field(&self, row: usize, offset: usize, len: usize) -> &[u8] {
        let at = row * self.row_size + offset;
        &self.data[at..at + len]
    }

    fn field_mut(&mut self, row: usize, offset: usize, len: usize) -> &mut [u8] {
        let at = row * self.row_size + offset;
        &mut self.data[at..at + len]
    }

    /// Store the low `width` bytes of `v`, little-endian.
    pub fn set_int_field(&mut self, row: usize, offset: usize, width: usize, v: i64) {
        let bytes = v.to_le_bytes();
        self.field_mut(row, offset, width).copy_from_slice(&bytes[..width]);
    }

    pub fn set_binary_field(&mut self, row: usize, offset: usize, v: &[u8; 16]) {
        self.field_mut(row, offset, 16).copy_from_slice(v);
    }

    /// Sign-extending read of a `width`-byte integer field.
    pub fn int_field(&self, row: usize, offset: usize, width: usize) -> i64 {
        let f = self.field(row, offset, width);
        let mut bytes = if f[width - 1] & 0x80 != 0 {
            [0xFFu8; 8]
        } else {
            [0u8; 8]
        };
        bytes[..width].copy_from_slice(f);
        i64::from_le_bytes(bytes)
    }

    pub fn binary_field(&self, row: usize, offset: usize) -> [u8; 16] {
        let mut out = [0u8; 16];
        out.copy_from_slice(self.field(row, offset, 16));
        out
    }

    /// Move row `src` onto row `dst` within this group.
    pub fn copy_row(&mut self, src: usize, dst: usize) {
        if src == dst {
            return;
        }
        let (s, d) = (src * self.row_size, dst * self.row_size);
        self.data.copy_within(s..s + self.row_size, d);
    }

    pub fn truncate(&mut self, n: usize) {
        debug_assert!(n <= self.row_count);
        self.row_count = n;
    }
}
