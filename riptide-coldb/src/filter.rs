// Predicate lists applied per row during a scan. A filter is parsed once
// from its wire blob when a command is built, then shared read-only by
// every block the command touches. Large equality (or inequality) lists
// get converted to a hash set so the per-row cost stays flat.

use crate::coltype::ValueClass;
use crate::value::ColumnValue;
use crate::wire::ByteReader;
use rapidhash::RapidHashSet;
use riptide_base::{config_err, Result};
use std::cmp::Ordering;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CmpOp {
    Nil = 0,
    Lt = 1,
    Eq = 2,
    Le = 3,
    Gt = 4,
    Ne = 5,
    Ge = 6,
}

impl CmpOp {
    pub fn from_u8(b: u8) -> Result<CmpOp> {
        match b {
            0 => Ok(CmpOp::Nil),
            1 => Ok(CmpOp::Lt),
            2 => Ok(CmpOp::Eq),
            3 => Ok(CmpOp::Le),
            4 => Ok(CmpOp::Gt),
            5 => Ok(CmpOp::Ne),
            6 => Ok(CmpOp::Ge),
            _ => Err(config_err(format!("unknown comparison op {}", b))),
        }
    }

    fn accepts(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Nil => false,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn from_u8(b: u8) -> Result<BoolOp> {
        match b {
            0 => Ok(BoolOp::And),
            1 => Ok(BoolOp::Or),
            _ => Err(config_err(format!("unknown boolean op {}", b))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnFilter<T: ColumnValue> {
    preds: Vec<(CmpOp, T)>,
    bop: BoolOp,
    // Set fast path: present when the predicate list is a pure OR-of-Eq
    // (membership) or AND-of-Ne (anti-membership).
    eq_set: Option<RapidHashSet<T>>,
}

impl<T: ColumnValue> ColumnFilter<T> {
    pub fn empty() -> ColumnFilter<T> {
        ColumnFilter {
            preds: Vec::new(),
            bop: BoolOp::And,
            eq_set: None,
        }
    }

    /// Parse `count` entries from `blob`, each `1 + WIDTH` bytes: a
    /// comparison op byte followed by a little-endian operand.
    pub fn parse(blob: &[u8], count: usize, bop: BoolOp) -> Result<ColumnFilter<T>> {
        let entry = 1 + T::WIDTH.bytes();
        if blob.len() != count * entry {
            return Err(config_err(format!(
                "filter blob is {} bytes, expected {} entries of {}",
                blob.len(),
                count,
                entry
            )));
        }
        let mut rd = ByteReader::new(blob);
        let mut preds = Vec::with_capacity(count);
        for _ in 0..count {
            let op = CmpOp::from_u8(rd.read_u8()?)?;
            let val = T::read_le(rd.read_bytes(T::WIDTH.bytes())?);
            preds.push((op, val));
        }
        let eq_set = match bop {
            BoolOp::Or if count > 1 && preds.iter().all(|p| p.0 == CmpOp::Eq) => {
                Some(preds.iter().map(|p| p.1).collect())
            }
            BoolOp::And if count > 1 && preds.iter().all(|p| p.0 == CmpOp::Ne) => {
                Some(preds.iter().map(|p| p.1).collect())
            }
            _ => None,
        };
        Ok(ColumnFilter {
            preds,
            bop,
            eq_set,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }

    pub fn pred_count(&self) -> usize {
        self.preds.len()
    }

    /// Decide whether a row matches. A null row never matches a
    /// predicate; with no predicates at all every row (nulls included)
    /// matches.
    pub fn matches(&self, val: T, is_null: bool, class: ValueClass) -> bool {
        if let Some(set) = &self.eq_set {
            return match self.bop {
                BoolOp::Or => !is_null && set.contains(&val),
                BoolOp::And => !is_null && !set.contains(&val),
            };
        }
        if self.preds.is_empty() {
            return true;
        }
        if is_null {
            return false;
        }
        match self.bop {
            BoolOp::And => self.preds.iter().all(|&(op, arg)| {
                op.accepts(match class {
                    ValueClass::Signed => val.cmp_signed(arg),
                    ValueClass::UnsignedLike => val.cmp_unsigned(arg),
                })
            }),
            BoolOp::Or => self.preds.iter().any(|&(op, arg)| {
                op.accepts(match class {
                    ValueClass::Signed => val.cmp_signed(arg),
                    ValueClass::UnsignedLike => val.cmp_unsigned(arg),
                })
            }),
        }
    }
}
