// Block geometry and the seam to whatever supplies block bytes. A block
// is a fixed 8192-byte page; a width-W column packs 8192/W values per
// block, so a logical batch of 8192 row ids spans W blocks.

use riptide_base::Result;

pub const BLOCK_SIZE: usize = 8192;
pub const LOGICAL_BLOCK_RIDS: usize = 8192;
/// Rows per presence-map group: rid >> RID_GROUP_SHIFT indexes a bit.
pub const RID_GROUP_SHIFT: u32 = 9;

/// One presence bit per 512-row group of a logical block, 16 bits total.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Hash)]
pub struct RidPresence(pub u16);

impl RidPresence {
    pub fn all() -> RidPresence {
        RidPresence(u16::MAX)
    }

    pub fn none() -> RidPresence {
        RidPresence(0)
    }

    pub fn mark(&mut self, rid: u16) {
        self.0 |= 1 << (rid >> RID_GROUP_SHIFT);
    }

    pub fn get(&self, rid: u16) -> bool {
        self.0 & (1 << (rid >> RID_GROUP_SHIFT)) != 0
    }
}

/// Multi-version visibility inputs for a load.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct VersionContext {
    pub current_scn: u64,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct SessionId {
    pub id: u32,
    /// Maintenance sessions get a transparent restart where user
    /// sessions would see a hard error.
    pub maintenance: bool,
}

#[derive(Debug)]
pub struct LoadRequest<'a> {
    pub lbids: &'a [u64],
    pub version: VersionContext,
    pub txn_id: u64,
    pub compressed: bool,
    pub session: SessionId,
    pub trace_flags: u32,
    pub prefetch: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct LoadOutcome {
    pub cache_hits: u64,
    pub blocks_read: u64,
    /// True if any block came from a version chain rather than the
    /// current extent image.
    pub was_versioned: bool,
}

/// Supplies decompressed block bytes for a list of logical block ids.
/// `out` holds one BLOCK_SIZE buffer per requested lbid, in order.
pub trait BlockSource: Send + Sync {
    fn load_blocks(&self, req: &LoadRequest, out: &mut [&mut [u8]]) -> Result<LoadOutcome>;
}
