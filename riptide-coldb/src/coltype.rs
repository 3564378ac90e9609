// Column type descriptor. Immutable per query step; its width field is
// the single source of truth for every width-specialized dispatch in the
// engine, so an unrecognized width fails fast here rather than deep in a
// scan loop.

use crate::wire::{ByteReader, ByteWriter};
use riptide_base::{config_err, Result};

/// Storage width of one column value. Wire form is the byte count.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub enum ColWidth {
    W1,
    W2,
    W4,
    W8,
    W16,
}

impl ColWidth {
    pub fn bytes(self) -> usize {
        match self {
            ColWidth::W1 => 1,
            ColWidth::W2 => 2,
            ColWidth::W4 => 4,
            ColWidth::W8 => 8,
            ColWidth::W16 => 16,
        }
    }

    pub fn from_bytes(b: u8) -> Result<Self> {
        match b {
            1 => Ok(ColWidth::W1),
            2 => Ok(ColWidth::W2),
            4 => Ok(ColWidth::W4),
            8 => Ok(ColWidth::W8),
            16 => Ok(ColWidth::W16),
            _ => Err(config_err(format!("unsupported column width {} bytes", b))),
        }
    }

    /// Presence-map geometry: a logical block's 16 rid-group bits are
    /// split evenly over the width's physical sub-blocks. Sub-block 0
    /// owns the low `16 / width` bits; each further sub-block's bits are
    /// reached by shifting the mask left by the same amount.
    pub fn presence_mask_and_shift(self) -> (u16, u32) {
        match self {
            ColWidth::W1 => (0xFFFF, 16),
            ColWidth::W2 => (0x00FF, 8),
            ColWidth::W4 => (0x000F, 4),
            ColWidth::W8 => (0x0003, 2),
            ColWidth::W16 => (0x0001, 1),
        }
    }
}

/// Which null/empty bit patterns a data type uses. Signed integral types
/// reserve the two most negative encodings; unsigned and character types
/// reserve the two highest.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ValueClass {
    Signed,
    UnsignedLike,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub enum ColDataType {
    TinyInt = 0,
    SmallInt = 1,
    Int = 2,
    BigInt = 3,
    UTinyInt = 4,
    USmallInt = 5,
    UInt = 6,
    UBigInt = 7,
    Decimal = 8,
    UDecimal = 9,
    Char = 10,
}

impl ColDataType {
    pub fn from_u8(u: u8) -> Result<Self> {
        match u {
            0 => Ok(ColDataType::TinyInt),
            1 => Ok(ColDataType::SmallInt),
            2 => Ok(ColDataType::Int),
            3 => Ok(ColDataType::BigInt),
            4 => Ok(ColDataType::UTinyInt),
            5 => Ok(ColDataType::USmallInt),
            6 => Ok(ColDataType::UInt),
            7 => Ok(ColDataType::UBigInt),
            8 => Ok(ColDataType::Decimal),
            9 => Ok(ColDataType::UDecimal),
            10 => Ok(ColDataType::Char),
            _ => Err(config_err(format!("unrecognized column data type {}", u))),
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ColDataType::UTinyInt
                | ColDataType::USmallInt
                | ColDataType::UInt
                | ColDataType::UBigInt
                | ColDataType::UDecimal
        )
    }

    pub fn value_class(self) -> ValueClass {
        if self.is_unsigned() || self == ColDataType::Char {
            ValueClass::UnsignedLike
        } else {
            ValueClass::Signed
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CompressionKind {
    None = 0,
    Lz4 = 2,
}

impl CompressionKind {
    pub fn from_u8(u: u8) -> Result<Self> {
        match u {
            0 => Ok(CompressionKind::None),
            2 => Ok(CompressionKind::Lz4),
            _ => Err(config_err(format!("unrecognized compression kind {}", u))),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ColType {
    pub data_type: ColDataType,
    pub width: ColWidth,
    pub compression: CompressionKind,
    pub charset: u32,
}

impl ColType {
    pub fn new(data_type: ColDataType, width: ColWidth) -> Self {
        ColType {
            data_type,
            width,
            compression: CompressionKind::None,
            charset: 0,
        }
    }

    pub fn is_narrow(&self) -> bool {
        self.width != ColWidth::W16
    }

    /// A DECIMAL stored at 16 bytes for precision beyond 64-bit range.
    pub fn is_wide_decimal(&self) -> bool {
        self.width == ColWidth::W16
            && matches!(self.data_type, ColDataType::Decimal | ColDataType::UDecimal)
    }

    pub fn is_unsigned(&self) -> bool {
        self.data_type.is_unsigned()
    }

    pub fn value_class(&self) -> ValueClass {
        self.data_type.value_class()
    }

    /// Whether block-level min/max statistics are meaningful for this
    /// type. Everything this engine stores is integer-comparable at its
    /// width; the only exclusion is a 16-byte column that is not a wide
    /// decimal, which has no comparison defined here.
    pub fn supports_min_max(&self) -> bool {
        self.is_narrow() || self.is_wide_decimal()
    }

    /// Wire form: data type, width in bytes, compression, charset.
    pub fn read(rd: &mut ByteReader) -> Result<ColType> {
        let data_type = ColDataType::from_u8(rd.read_u8()?)?;
        let width = ColWidth::from_bytes(rd.read_u8()?)?;
        let compression = CompressionKind::from_u8(rd.read_u8()?)?;
        let charset = rd.read_u32()?;
        Ok(ColType {
            data_type,
            width,
            compression,
            charset,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.write_u8(self.data_type as u8);
        w.write_u8(self.width.bytes() as u8);
        w.write_u8(self.compression as u8);
        w.write_u32(self.charset);
    }
}
