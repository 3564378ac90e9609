// Per-block result staging. One packed buffer holds a rid region and a
// value region; the active shape decides which regions are live. The
// accessors are the only thing that knows the layout, so the scan loop
// and the delivery code never do their own offset arithmetic.

use crate::block::{RidPresence, LOGICAL_BLOCK_RIDS};
use crate::coltype::ColWidth;
use crate::value::ColumnValue;
use riptide_base::{bad_shape_err, overflow_err, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OutputShape {
    Rids = 1,
    Values = 2,
    Both = 3,
}

impl OutputShape {
    pub fn from_u8(b: u8) -> Result<OutputShape> {
        match b {
            1 => Ok(OutputShape::Rids),
            2 => Ok(OutputShape::Values),
            3 => Ok(OutputShape::Both),
            _ => Err(bad_shape_err(format!("unknown output shape {}", b))),
        }
    }

    pub fn has_rids(self) -> bool {
        !matches!(self, OutputShape::Values)
    }

    pub fn has_values(self) -> bool {
        !matches!(self, OutputShape::Rids)
    }
}

const RID_REGION: usize = 2 * LOGICAL_BLOCK_RIDS;

#[derive(Clone, Debug)]
pub struct ResultBuffer {
    buf: Vec<u8>,
    shape: OutputShape,
    width: usize,
    nvals: usize,
    rid_map: RidPresence,
}

impl ResultBuffer {
    pub fn new() -> ResultBuffer {
        ResultBuffer {
            buf: Vec::new(),
            shape: OutputShape::Both,
            width: 1,
            nvals: 0,
            rid_map: RidPresence::none(),
        }
    }

    pub fn reset(&mut self, shape: OutputShape, width: ColWidth) {
        self.shape = shape;
        self.width = width.bytes();
        self.nvals = 0;
        self.rid_map = RidPresence::none();
        let value_region = if shape.has_values() {
            LOGICAL_BLOCK_RIDS * self.width
        } else {
            0
        };
        let rid_region = if shape.has_rids() { RID_REGION } else { 0 };
        self.buf.clear();
        self.buf.resize(rid_region + value_region, 0);
    }

    fn value_base(&self) -> usize {
        if self.shape.has_rids() {
            RID_REGION
        } else {
            0
        }
    }

    pub fn push<T: ColumnValue>(&mut self, rid: u16, val: T) -> Result<()> {
        if self.nvals >= LOGICAL_BLOCK_RIDS {
            return Err(overflow_err(format!(
                "result buffer full at {} values",
                self.nvals
            )));
        }
        if self.shape.has_rids() {
            let off = 2 * self.nvals;
            self.buf[off..off + 2].copy_from_slice(&rid.to_le_bytes());
            self.rid_map.mark(rid);
        }
        if self.shape.has_values() {
            let off = self.value_base() + self.nvals * self.width;
            val.write_le(&mut self.buf[off..off + self.width]);
        }
        self.nvals += 1;
        Ok(())
    }

    pub fn nvals(&self) -> usize {
        self.nvals
    }

    pub fn shape(&self) -> OutputShape {
        self.shape
    }

    pub fn rid_map(&self) -> RidPresence {
        self.rid_map
    }

    pub fn rid_at(&self, i: usize) -> u16 {
        debug_assert!(self.shape.has_rids() && i < self.nvals);
        let off = 2 * i;
        u16::from_le_bytes([self.buf[off], self.buf[off + 1]])
    }

    pub fn value_at<T: ColumnValue>(&self, i: usize) -> T {
        debug_assert!(self.shape.has_values() && i < self.nvals);
        let off = self.value_base() + i * self.width;
        T::read_le(&self.buf[off..off + self.width])
    }

    /// The raw value region, trimmed to the populated prefix.
    pub fn value_bytes(&self) -> &[u8] {
        debug_assert!(self.shape.has_values());
        let base = self.value_base();
        &self.buf[base..base + self.nvals * self.width]
    }
}

impl Default for ResultBuffer {
    fn default() -> ResultBuffer {
        ResultBuffer::new()
    }
}
