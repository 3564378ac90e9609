// 128-bit signed integer value type backing wide-decimal columns.
//
// Two bit patterns at the bottom of the range are reserved: the most
// negative value denotes NULL and the next one up denotes EMPTY (a row
// slot that was never written). They are not valid data values, and all
// arithmetic here assumes the caller has checked for them first; the type
// itself only exposes the predicates plus conversion and stringification.
//
// Block buffers pack values at their natural width with no alignment
// guarantee, so loads and stores go through byte copies rather than typed
// reads. le-byte round-tripping is exact and portable; anything fancier
// is an optimization the engine does not depend on.

use crate::error::{overflow_err, Result};
use std::fmt;

pub const NULL_VALUE: i128 = i128::MIN;
pub const EMPTY_VALUE: i128 = i128::MIN + 1;

/// Maximum rendered length: sign + 39 digits + a trailing slot so callers
/// can NUL-terminate when handing the buffer to foreign code.
pub const MAX_DECIMAL_LEN: usize = 41;

// 10^19, the largest power of ten that fits a u64 digit group.
const GROUP: u128 = 10_000_000_000_000_000_000;

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct WideInt128 {
    v: i128,
}

impl WideInt128 {
    pub const fn new(v: i128) -> Self {
        WideInt128 { v }
    }

    pub const fn null() -> Self {
        WideInt128 { v: NULL_VALUE }
    }

    pub const fn empty() -> Self {
        WideInt128 { v: EMPTY_VALUE }
    }

    pub const fn value(self) -> i128 {
        self.v
    }

    pub fn is_null(self) -> bool {
        self.v == NULL_VALUE
    }

    pub fn is_empty(self) -> bool {
        self.v == EMPTY_VALUE
    }

    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        WideInt128 { v: i128::from_le_bytes(bytes) }
    }

    pub fn to_le_bytes(self) -> [u8; 16] {
        self.v.to_le_bytes()
    }

    /// Byte-copy load from a packed, possibly unaligned buffer.
    pub fn read_unaligned(buf: &[u8]) -> Result<Self> {
        if buf.len() < 16 {
            return Err(overflow_err("wide value load from short buffer"));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&buf[..16]);
        Ok(Self::from_le_bytes(bytes))
    }

    /// Byte-copy store into a packed, possibly unaligned buffer.
    pub fn write_unaligned(self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < 16 {
            return Err(overflow_err("wide value store into short buffer"));
        }
        buf[..16].copy_from_slice(&self.v.to_le_bytes());
        Ok(())
    }

    // Saturating narrowings. Unsigned targets additionally clamp
    // negative values to zero.

    pub fn to_i64(self) -> i64 {
        self.v.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn to_u64(self) -> u64 {
        self.v.clamp(0, u64::MAX as i128) as u64
    }

    pub fn to_i32(self) -> i32 {
        self.v.clamp(i32::MIN as i128, i32::MAX as i128) as i32
    }

    pub fn to_u32(self) -> u32 {
        self.v.clamp(0, u32::MAX as i128) as u32
    }

    /// Every i128 magnitude is far below f64::MAX, so the conversion
    /// rounds but never overflows.
    pub fn to_f64(self) -> f64 {
        self.v as f64
    }

    /// Renders the decimal digits into `buf` and returns the byte count.
    /// The documented maximum is `MAX_DECIMAL_LEN`; an undersized buffer
    /// is an invariant violation, not a recoverable condition.
    pub fn write_decimal(self, buf: &mut [u8]) -> Result<usize> {
        let s = self.to_string();
        if buf.len() < s.len() {
            return Err(overflow_err("decimal render buffer too small"));
        }
        buf[..s.len()].copy_from_slice(s.as_bytes());
        Ok(s.len())
    }

    /// Exact inverse of the rendering, including the sentinel spellings.
    pub fn from_decimal_str(s: &str) -> Result<Self> {
        match s {
            "NULL" => Ok(Self::null()),
            "EMPTY" => Ok(Self::empty()),
            _ => Ok(Self::new(s.parse::<i128>()?)),
        }
    }
}

impl fmt::Display for WideInt128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "NULL");
        }
        if self.is_empty() {
            return write!(f, "EMPTY");
        }
        if self.v < 0 {
            write!(f, "-")?;
        }
        // Split the magnitude into three <= 19-digit decimal groups by
        // repeated division by 10^19. The leading nonzero group prints
        // without padding; the groups below it print zero-padded.
        let mag = self.v.unsigned_abs();
        let low = (mag % GROUP) as u64;
        let rest = mag / GROUP;
        let mid = (rest % GROUP) as u64;
        let high = (rest / GROUP) as u64;
        if high != 0 {
            write!(f, "{}{:019}{:019}", high, mid, low)
        } else if mid != 0 {
            write!(f, "{}{:019}", mid, low)
        } else {
            write!(f, "{}", low)
        }
    }
}

impl From<i128> for WideInt128 {
    fn from(v: i128) -> Self {
        WideInt128::new(v)
    }
}

impl From<i64> for WideInt128 {
    fn from(v: i64) -> Self {
        WideInt128::new(v as i128)
    }
}

impl PartialEq<i128> for WideInt128 {
    fn eq(&self, rhs: &i128) -> bool {
        self.v == *rhs
    }
}

impl PartialOrd<i128> for WideInt128 {
    fn partial_cmp(&self, rhs: &i128) -> Option<std::cmp::Ordering> {
        self.v.partial_cmp(rhs)
    }
}

impl PartialEq<i64> for WideInt128 {
    fn eq(&self, rhs: &i64) -> bool {
        self.v == *rhs as i128
    }
}

impl PartialOrd<i64> for WideInt128 {
    fn partial_cmp(&self, rhs: &i64) -> Option<std::cmp::Ordering> {
        self.v.partial_cmp(&(*rhs as i128))
    }
}

// Two's-complement arithmetic on the raw representation. Sentinels are
// caller-checked before any of these run.

impl std::ops::Add for WideInt128 {
    type Output = WideInt128;
    fn add(self, rhs: Self) -> Self {
        WideInt128::new(self.v.wrapping_add(rhs.v))
    }
}

impl std::ops::Mul for WideInt128 {
    type Output = WideInt128;
    fn mul(self, rhs: Self) -> Self {
        WideInt128::new(self.v.wrapping_mul(rhs.v))
    }
}

impl std::ops::Rem<i64> for WideInt128 {
    type Output = WideInt128;
    fn rem(self, rhs: i64) -> Self {
        WideInt128::new(self.v % rhs as i128)
    }
}

impl std::ops::Rem<i128> for WideInt128 {
    type Output = WideInt128;
    fn rem(self, rhs: i128) -> Self {
        WideInt128::new(self.v % rhs)
    }
}
