// Shared per-batch state for one job step: the rid/value arrays that
// commands fill and downstream commands consume, the io statistics for
// the step, and the partition min/max accumulator. One StepContext is
// owned by one worker; commands borrow it mutably while they run.

use crate::block::{RidPresence, SessionId, VersionContext, LOGICAL_BLOCK_RIDS};
use crate::coltype::ColWidth;
use riptide_base::WideInt128;

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct StepStats {
    pub cached_io: u64,
    pub physical_io: u64,
    pub touched_blocks: u64,
}

/// Running min/max for the partition being scanned, fed back to the
/// extent map so later scans can skip whole extents. Narrow columns
/// accumulate as i64; wide decimals in the 128-bit fields.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct PartitionStats {
    pub valid: bool,
    pub lbid: u64,
    pub min: i64,
    pub max: i64,
    pub wide_min: WideInt128,
    pub wide_max: WideInt128,
    pub has_wide: bool,
    pub wide_width: Option<ColWidth>,
}

/// One staging slot for a command feeding a downstream join or function
/// step instead of the main delivery arrays.
#[derive(Clone, Debug)]
pub struct FeederSlot {
    pub rid_count: usize,
    pub rids: Vec<u16>,
    pub values: Vec<i64>,
    pub wide_values: Vec<WideInt128>,
}

impl FeederSlot {
    fn new() -> FeederSlot {
        FeederSlot {
            rid_count: 0,
            rids: vec![0; LOGICAL_BLOCK_RIDS],
            values: vec![0; LOGICAL_BLOCK_RIDS],
            wide_values: vec![WideInt128::default(); LOGICAL_BLOCK_RIDS],
        }
    }
}

#[derive(Clone, Debug)]
pub struct FeederSlots {
    pub slots: [FeederSlot; 2],
}

#[derive(Clone, Debug)]
pub struct StepContext {
    pub session: SessionId,
    pub txn_id: u64,
    pub version: VersionContext,
    /// Absolute rid of row 0 of the current logical block.
    pub base_rid: u64,
    pub db_root: u32,

    // Main delivery arrays. rel_rids/values/wide_values are parallel up
    // to rid_count; abs_rids is filled by commands whose shape carries
    // rids.
    pub rid_count: usize,
    pub rel_rids: Vec<u16>,
    pub abs_rids: Vec<u64>,
    pub values: Vec<i64>,
    pub wide_values: Vec<WideInt128>,
    pub rid_map: RidPresence,

    pub allow_variable_block: bool,
    /// Fraction of a command's blocks that must miss cache before the
    /// next load asks for prefetch.
    pub prefetch_threshold: f64,

    pub stats: StepStats,
    pub cp: PartitionStats,
    pub feeder: FeederSlots,
    pub serialized: Vec<u8>,
}

impl StepContext {
    pub fn new(session: SessionId, txn_id: u64, version: VersionContext) -> StepContext {
        StepContext {
            session,
            txn_id,
            version,
            base_rid: 0,
            db_root: 1,
            rid_count: 0,
            rel_rids: vec![0; LOGICAL_BLOCK_RIDS],
            abs_rids: vec![0; LOGICAL_BLOCK_RIDS],
            values: vec![0; LOGICAL_BLOCK_RIDS],
            wide_values: vec![WideInt128::default(); LOGICAL_BLOCK_RIDS],
            rid_map: RidPresence::all(),
            allow_variable_block: false,
            prefetch_threshold: 0.3,
            stats: StepStats::default(),
            cp: PartitionStats::default(),
            feeder: FeederSlots {
                slots: [FeederSlot::new(), FeederSlot::new()],
            },
            serialized: Vec::new(),
        }
    }

    /// Start a fresh logical block: full presence, no rows yet.
    pub fn begin_block(&mut self, base_rid: u64) {
        self.base_rid = base_rid;
        self.rid_count = 0;
        self.rid_map = RidPresence::all();
        self.feeder.slots[0].rid_count = 0;
        self.feeder.slots[1].rid_count = 0;
        self.serialized.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn begin_block_resets_batch_state() {
        let mut ctx = StepContext::new(SessionId::default(), 0, VersionContext::default());
        ctx.rid_count = 17;
        ctx.rid_map = RidPresence::none();
        ctx.feeder.slots[1].rid_count = 4;
        ctx.serialized.extend_from_slice(b"xyz");
        ctx.begin_block(8192);
        assert_eq!(ctx.base_rid, 8192);
        assert_eq!(ctx.rid_count, 0);
        assert_eq!(ctx.rid_map, RidPresence::all());
        assert_eq!(ctx.feeder.slots[1].rid_count, 0);
        assert!(ctx.serialized.is_empty());
    }
}
