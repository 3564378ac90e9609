// The generic element type the scan loops are monomorphized over. Width
// dispatch happens once per block (on the descriptor's width tag); after
// that the inner loop runs on a concrete ColumnValue with no per-row
// branching on width.

use crate::coltype::{ColWidth, ValueClass};
use funty::Fundamental;
use riptide_base::WideInt128;
use std::cmp::Ordering;

pub trait ColumnValue:
    Copy + Eq + Ord + std::hash::Hash + std::fmt::Debug + Send + 'static
{
    const WIDTH: ColWidth;

    /// Byte-copy load; `buf` holds at least `WIDTH` bytes, alignment-free.
    fn read_le(buf: &[u8]) -> Self;
    fn write_le(self, buf: &mut [u8]);

    fn null_for(class: ValueClass) -> Self;
    fn empty_for(class: ValueClass) -> Self;

    fn cmp_signed(self, rhs: Self) -> Ordering;
    /// Compare with the stored bits reinterpreted as the unsigned
    /// counterpart, for unsigned column types.
    fn cmp_unsigned(self, rhs: Self) -> Ordering;

    /// Widen to i64 for narrow result arrays and statistics; saturating
    /// for the 16-byte element.
    fn widen(self) -> i64;
    /// Widen with the stored bits reinterpreted as unsigned, so the
    /// statistics slot carries the column's true unsigned value.
    fn widen_unsigned(self) -> i64;
    fn widen_wide(self) -> WideInt128;
}

macro_rules! narrow_column_value {
    ($t:ty, $u:ty, $w:expr) => {
        impl ColumnValue for $t {
            const WIDTH: ColWidth = $w;

            fn read_le(buf: &[u8]) -> Self {
                let mut b = [0u8; std::mem::size_of::<$t>()];
                b.copy_from_slice(&buf[..std::mem::size_of::<$t>()]);
                <$t>::from_le_bytes(b)
            }

            fn write_le(self, buf: &mut [u8]) {
                buf[..std::mem::size_of::<$t>()].copy_from_slice(&self.to_le_bytes());
            }

            fn null_for(class: ValueClass) -> Self {
                match class {
                    ValueClass::Signed => <$t>::MIN,
                    ValueClass::UnsignedLike => (<$u>::MAX - 1) as $t,
                }
            }

            fn empty_for(class: ValueClass) -> Self {
                match class {
                    ValueClass::Signed => <$t>::MIN + 1,
                    ValueClass::UnsignedLike => <$u>::MAX as $t,
                }
            }

            fn cmp_signed(self, rhs: Self) -> Ordering {
                self.cmp(&rhs)
            }

            fn cmp_unsigned(self, rhs: Self) -> Ordering {
                (self as $u).cmp(&(rhs as $u))
            }

            fn widen(self) -> i64 {
                self.as_i64()
            }

            fn widen_unsigned(self) -> i64 {
                (self as $u).as_i64()
            }

            fn widen_wide(self) -> WideInt128 {
                WideInt128::from(self.as_i64())
            }
        }
    };
}

narrow_column_value!(i8, u8, ColWidth::W1);
narrow_column_value!(i16, u16, ColWidth::W2);
narrow_column_value!(i32, u32, ColWidth::W4);
narrow_column_value!(i64, u64, ColWidth::W8);

impl ColumnValue for WideInt128 {
    const WIDTH: ColWidth = ColWidth::W16;

    fn read_le(buf: &[u8]) -> Self {
        let mut b = [0u8; 16];
        b.copy_from_slice(&buf[..16]);
        WideInt128::from_le_bytes(b)
    }

    fn write_le(self, buf: &mut [u8]) {
        buf[..16].copy_from_slice(&self.to_le_bytes());
    }

    // The wide sentinels are shared by every 16-byte type.
    fn null_for(_class: ValueClass) -> Self {
        WideInt128::null()
    }

    fn empty_for(_class: ValueClass) -> Self {
        WideInt128::empty()
    }

    fn cmp_signed(self, rhs: Self) -> Ordering {
        self.cmp(&rhs)
    }

    fn cmp_unsigned(self, rhs: Self) -> Ordering {
        (self.value() as u128).cmp(&(rhs.value() as u128))
    }

    fn widen(self) -> i64 {
        self.to_i64()
    }

    // 16-byte columns report min/max through the wide slots, so the
    // narrow unsigned path never runs for them.
    fn widen_unsigned(self) -> i64 {
        self.to_i64()
    }

    fn widen_wide(self) -> WideInt128 {
        self
    }
}
