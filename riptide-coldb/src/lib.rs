// Columnar scan engine: the block-level primitive that evaluates one
// column's predicates for one logical block of rows and hands the
// surviving rids and values to the next step.
//
// Geometry, fixed throughout:
//
//   - a physical block is 8192 bytes
//   - a column of width W bytes packs 8192/W values per block
//   - a logical block is 8192 consecutive rows, so it spans W physical
//     blocks and one u16 relative rid addresses any row in it
//   - a presence map carries one bit per 512-row group, 16 bits total
//
// Commands chain within a step: a scan command walks a whole logical
// block and emits matching rids; subsequent step-mode commands look up
// just those rids in their own columns, tightening or projecting. The
// StepContext carries the rid/value arrays between them.

pub mod block;
pub mod coltype;
pub mod filter;
pub mod output;
pub mod rowgroup;
pub mod scan;
pub mod step;
pub mod value;
pub mod wire;

pub use block::{
    BlockSource, LoadOutcome, LoadRequest, RidPresence, SessionId, VersionContext, BLOCK_SIZE,
    LOGICAL_BLOCK_RIDS, RID_GROUP_SHIFT,
};
pub use coltype::{ColDataType, ColType, ColWidth, CompressionKind, ValueClass};
pub use filter::{BoolOp, CmpOp, ColumnFilter};
pub use output::{OutputShape, ResultBuffer};
pub use rowgroup::RowGroup;
pub use scan::{AnyColumnCommand, ColumnCommand, FeederRole};
pub use step::{FeederSlot, PartitionStats, StepContext, StepStats};
pub use value::ColumnValue;

#[cfg(test)]
mod test;
