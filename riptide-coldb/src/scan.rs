// The column command: one scan-or-lookup primitive over one column for
// one logical block of 8192 rows. A width-W column stores 8192/W values
// per 8192-byte block, so a logical block spans W consecutive physical
// blocks. The command loads those blocks, walks either every row (scan
// mode) or the rid list handed down by the previous command (step mode),
// applies its predicate filter, and delivers rids and/or values into the
// step context for the next command or for projection.
//
// The generic parameter is the element type; `AnyColumnCommand` at the
// bottom holds the wire-decoded width dispatch so callers work with one
// concrete enum.

use crate::block::{
    BlockSource, LoadRequest, RidPresence, BLOCK_SIZE, LOGICAL_BLOCK_RIDS,
};
use crate::coltype::{ColType, ColWidth, CompressionKind, ValueClass};
use crate::filter::{BoolOp, ColumnFilter};
use crate::output::{OutputShape, ResultBuffer};
use crate::rowgroup::RowGroup;
use crate::step::StepContext;
use crate::value::ColumnValue;
use crate::wire::{ByteReader, ByteWriter};
use riptide_base::{
    bad_shape_err, config_err, mismatch_err, restart_err, Error, Result, WideInt128,
};
use std::sync::Arc;
use tracing::trace;

/// Position of a command in a multi-input filter chain. A feeder takes
/// its input rid list from one of the two staging slots (written by the
/// upstream command) instead of the main delivery arrays, and copies its
/// own survivors back into the same slot for the next consumer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FeederRole {
    None,
    Left,
    Right,
}

impl FeederRole {
    pub fn slot(self) -> Option<usize> {
        match self {
            FeederRole::None => None,
            FeederRole::Left => Some(0),
            FeederRole::Right => Some(1),
        }
    }
}

pub struct ColumnCommand<T: ColumnValue> {
    // Configuration, fixed after construction.
    col_type: ColType,
    is_scan: bool,
    trace_flags: u32,
    filter_blob: Vec<u8>,
    filter_count: usize,
    bop: BoolOp,
    filter: Arc<ColumnFilter<T>>,
    last_lbid: Vec<u64>,
    output_shape: OutputShape,
    want_abs_rids: bool,
    feeder: FeederRole,

    // Cursor and per-run toggles.
    lbid: u64,
    suppress_filter: bool,

    // Load accounting, feeds the prefetch decision.
    block_count: u64,
    load_count: u64,
    was_versioned: bool,

    // Per-block transients.
    input_rids: Vec<u16>,
    input_presence: RidPresence,
    req_nvals: usize,
    block_data: Vec<u8>,
    result: ResultBuffer,
}

impl<T: ColumnValue> ColumnCommand<T> {
    fn new(parsed: ParsedCommand) -> Result<ColumnCommand<T>> {
        if T::WIDTH != parsed.col_type.width {
            return Err(config_err(format!(
                "element width {:?} does not match column width {:?}",
                T::WIDTH,
                parsed.col_type.width
            )));
        }
        let filter = ColumnFilter::parse(&parsed.filter_blob, parsed.filter_count, parsed.bop)?;
        Ok(ColumnCommand {
            col_type: parsed.col_type,
            is_scan: parsed.is_scan,
            trace_flags: parsed.trace_flags,
            filter_blob: parsed.filter_blob,
            filter_count: parsed.filter_count,
            bop: parsed.bop,
            filter: Arc::new(filter),
            last_lbid: parsed.last_lbid,
            output_shape: OutputShape::Both,
            want_abs_rids: false,
            feeder: FeederRole::None,
            lbid: 0,
            suppress_filter: false,
            block_count: 0,
            load_count: 0,
            was_versioned: false,
            input_rids: vec![0; LOGICAL_BLOCK_RIDS],
            input_presence: RidPresence::all(),
            req_nvals: 0,
            block_data: Vec::new(),
            result: ResultBuffer::new(),
        })
    }

    /// Configure the delivery side: output shape byte from the wire plus
    /// whether absolute rids should be materialized.
    pub fn prep(&mut self, shape: u8, want_abs_rids: bool) -> Result<()> {
        self.output_shape = OutputShape::from_u8(shape)?;
        self.want_abs_rids = want_abs_rids;
        Ok(())
    }

    pub fn set_feeder(&mut self, role: FeederRole) {
        self.feeder = role;
    }

    pub fn set_lbid(&mut self, lbid: u64) {
        self.lbid = lbid;
    }

    pub fn lbid(&self) -> u64 {
        self.lbid
    }

    /// Move the cursor to the next logical block.
    pub fn advance(&mut self) {
        self.lbid += self.col_type.width.bytes() as u64;
    }

    pub fn is_scan(&self) -> bool {
        self.is_scan
    }

    pub fn set_scan(&mut self, is_scan: bool) {
        self.is_scan = is_scan;
    }

    pub fn col_type(&self) -> &ColType {
        &self.col_type
    }

    pub fn output_shape(&self) -> OutputShape {
        self.output_shape
    }

    /// Temporarily run the command as a pure projection, no predicates.
    pub fn disable_filters(&mut self) {
        self.suppress_filter = true;
    }

    pub fn enable_filters(&mut self) {
        self.suppress_filter = false;
    }

    pub fn will_prefetch(&self, threshold: f64) -> bool {
        self.block_count == 0
            || (self.load_count as f64 / self.block_count as f64) > threshold
    }

    /// The physical block ids the next execute will touch.
    pub fn lbid_list(&self) -> Vec<u64> {
        let w = self.col_type.width.bytes() as u64;
        (0..w).map(|i| self.lbid + i).collect()
    }

    /// Run the command over the current logical block. Reads its inputs
    /// (rid list, presence, version) from `ctx`, loads blocks from
    /// `source`, and writes delivery arrays and statistics back into
    /// `ctx`. Does not advance the block cursor.
    pub fn execute(&mut self, ctx: &mut StepContext, source: &dyn BlockSource) -> Result<()> {
        self.capture_input(ctx);
        self.load_data(ctx, source)?;
        let (cp_mode, minmax) = self.scan_and_filter()?;
        self.update_cp(ctx, cp_mode, minmax)?;
        self.deliver(ctx)?;
        Ok(())
    }

    fn capture_input(&mut self, ctx: &StepContext) {
        if self.is_scan {
            self.req_nvals = 0;
            self.input_presence = RidPresence::all();
            return;
        }
        if let Some(slot_idx) = self.feeder.slot() {
            let slot = &ctx.feeder.slots[slot_idx];
            self.req_nvals = slot.rid_count;
            self.input_rids[..slot.rid_count].copy_from_slice(&slot.rids[..slot.rid_count]);
            let mut presence = RidPresence::none();
            for &rid in &self.input_rids[..self.req_nvals] {
                presence.mark(rid);
            }
            self.input_presence = presence;
        } else {
            self.req_nvals = ctx.rid_count;
            self.input_rids[..ctx.rid_count].copy_from_slice(&ctx.rel_rids[..ctx.rid_count]);
            self.input_presence = ctx.rid_map;
        }
    }

    fn load_data(&mut self, ctx: &mut StepContext, source: &dyn BlockSource) -> Result<()> {
        let w = self.col_type.width.bytes();
        let lbids = self.lbid_list();
        self.block_data.clear();
        self.block_data.resize(w * BLOCK_SIZE, 0);
        // Versioning is a property of this load, not of the command's
        // whole lifetime. A block that loads nothing was not versioned.
        self.was_versioned = false;

        // A scan past the filled tail of the last extent sees blocks
        // beyond the column's last written lbid; those read as all-empty
        // without touching the source.
        let last = self
            .last_lbid
            .get((ctx.db_root.saturating_sub(1)) as usize)
            .copied();
        let (mask, shift) = self.col_type.width.presence_mask_and_shift();

        let mut load_lbids = Vec::with_capacity(w);
        let mut load_idx = Vec::with_capacity(w);
        for (i, &lbid) in lbids.iter().enumerate() {
            let past_last = self.is_scan && last.map_or(false, |l| lbid > l);
            let bits = (self.input_presence.0 >> (i as u32 * shift)) & mask;
            let absent = !self.is_scan && bits == 0;
            if past_last || absent {
                self.fill_empty_block(i);
            } else {
                load_lbids.push(lbid);
                load_idx.push(i);
            }
        }

        self.block_count += w as u64;
        if load_lbids.is_empty() {
            return Ok(());
        }

        let req = LoadRequest {
            lbids: &load_lbids,
            version: ctx.version,
            txn_id: ctx.txn_id,
            compressed: self.col_type.compression != CompressionKind::None,
            session: ctx.session,
            trace_flags: self.trace_flags,
            prefetch: self.will_prefetch(ctx.prefetch_threshold),
        };

        // Hand the source one disjoint buffer per requested block.
        let mut chunks: Vec<&mut [u8]> = self.block_data.chunks_exact_mut(BLOCK_SIZE).collect();
        let mut bufs: Vec<&mut [u8]> = Vec::with_capacity(load_idx.len());
        for (taken, chunk) in chunks.drain(..).enumerate() {
            if load_idx.contains(&taken) {
                bufs.push(chunk);
            }
        }
        let outcome = source.load_blocks(&req, &mut bufs)?;
        trace!(
            "loaded {} blocks at lbid {} ({} cached, {} physical)",
            load_lbids.len(),
            self.lbid,
            outcome.cache_hits,
            outcome.blocks_read
        );

        self.load_count += outcome.blocks_read;
        self.was_versioned = outcome.was_versioned;
        ctx.stats.cached_io += outcome.cache_hits;
        ctx.stats.physical_io += outcome.blocks_read;
        ctx.stats.touched_blocks += load_lbids.len() as u64;
        Ok(())
    }

    fn fill_empty_block(&mut self, block_idx: usize) {
        let w = self.col_type.width.bytes();
        let empty = T::empty_for(self.col_type.value_class());
        let base = block_idx * BLOCK_SIZE;
        for off in (base..base + BLOCK_SIZE).step_by(w) {
            empty.write_le(&mut self.block_data[off..off + w]);
        }
    }

    /// Walk the block, apply the filter, stage matches in the result
    /// buffer. Returns whether this run is eligible to report partition
    /// min/max, and the observed (min, max) over live rows.
    fn scan_and_filter(&mut self) -> Result<(bool, Option<(T, T)>)> {
        let w = self.col_type.width.bytes();
        let class = self.col_type.value_class();
        let null = T::null_for(class);
        let empty = T::empty_for(class);

        let mut result = std::mem::take(&mut self.result);
        result.reset(self.output_shape, self.col_type.width);
        let mut minmax: Option<(T, T)> = None;
        {
            let block_data = &self.block_data;
            let filter = &*self.filter;
            let suppress = self.suppress_filter;
            // Min/max must order the way the column type orders, not the
            // way the stored two's-complement bits order.
            let below = |a: T, b: T| match class {
                ValueClass::Signed => a.cmp_signed(b).is_lt(),
                ValueClass::UnsignedLike => a.cmp_unsigned(b).is_lt(),
            };
            let mut visit = |rid: u16| -> Result<()> {
                let off = rid as usize * w;
                let val = T::read_le(&block_data[off..off + w]);
                if val == empty {
                    return Ok(());
                }
                let is_null = val == null;
                if !is_null {
                    minmax = Some(match minmax {
                        None => (val, val),
                        Some((mn, mx)) => (
                            if below(val, mn) { val } else { mn },
                            if below(mx, val) { val } else { mx },
                        ),
                    });
                }
                if suppress || filter.matches(val, is_null, class) {
                    result.push(rid, val)?;
                }
                Ok(())
            };
            if self.is_scan {
                for rid in 0..LOGICAL_BLOCK_RIDS as u16 {
                    visit(rid)?;
                }
            } else {
                for &rid in &self.input_rids[..self.req_nvals] {
                    visit(rid)?;
                }
            }
        }
        self.result = result;

        let cp_mode = self.is_scan && self.req_nvals == 0 && !self.was_versioned;
        Ok((cp_mode, minmax))
    }

    fn update_cp(
        &self,
        ctx: &mut StepContext,
        cp_mode: bool,
        minmax: Option<(T, T)>,
    ) -> Result<()> {
        ctx.cp.lbid = self.lbid;
        if !cp_mode {
            ctx.cp.valid = false;
            return Ok(());
        }
        if matches!(T::WIDTH, ColWidth::W16) {
            if !self.col_type.is_wide_decimal() {
                return Err(config_err(format!(
                    "min/max tracking on a 16-byte column requires a decimal type, got {:?}",
                    self.col_type.data_type
                )));
            }
            ctx.cp.has_wide = true;
            ctx.cp.wide_width = Some(ColWidth::W16);
            match minmax {
                Some((mn, mx)) => {
                    ctx.cp.wide_min = mn.widen_wide();
                    ctx.cp.wide_max = mx.widen_wide();
                }
                None => {
                    ctx.cp.wide_min = WideInt128::new(i128::MAX);
                    ctx.cp.wide_max = WideInt128::new(i128::MIN + 2);
                }
            }
        } else {
            ctx.cp.has_wide = false;
            ctx.cp.wide_width = None;
            match minmax {
                Some((mn, mx)) => {
                    // Unsigned columns carry their stats zero-extended so
                    // a later unsigned comparison sees the true value.
                    (ctx.cp.min, ctx.cp.max) = match self.col_type.value_class() {
                        ValueClass::Signed => (mn.widen(), mx.widen()),
                        ValueClass::UnsignedLike => (mn.widen_unsigned(), mx.widen_unsigned()),
                    };
                }
                None => {
                    ctx.cp.min = i64::MAX;
                    ctx.cp.max = i64::MIN;
                }
            }
        }
        ctx.cp.valid = self.col_type.supports_min_max();
        Ok(())
    }

    /// Write the staged result into the main delivery arrays, and for a
    /// feeder command also into its slot for the next chain consumer.
    fn deliver(&mut self, ctx: &mut StepContext) -> Result<()> {
        let nvals = self.result.nvals();
        let wide = matches!(T::WIDTH, ColWidth::W16);

        ctx.rid_count = nvals;
        if self.output_shape.has_rids() {
            ctx.rid_map = self.result.rid_map();
            for i in 0..nvals {
                let rid = self.result.rid_at(i);
                ctx.rel_rids[i] = rid;
                if self.want_abs_rids {
                    ctx.abs_rids[i] = ctx.base_rid + rid as u64;
                }
            }
        }
        if self.output_shape.has_values() {
            for i in 0..nvals {
                let v = self.result.value_at::<T>(i);
                if wide {
                    ctx.wide_values[i] = v.widen_wide();
                } else {
                    ctx.values[i] = v.widen();
                }
            }
        }

        if let Some(slot_idx) = self.feeder.slot() {
            let slot = &mut ctx.feeder.slots[slot_idx];
            slot.rid_count = nvals;
            for i in 0..nvals {
                if self.output_shape.has_rids() {
                    slot.rids[i] = self.result.rid_at(i);
                }
                if self.output_shape.has_values() {
                    let v = self.result.value_at::<T>(i);
                    if wide {
                        slot.wide_values[i] = v.widen_wide();
                    } else {
                        slot.values[i] = v.widen();
                    }
                }
            }
        }
        Ok(())
    }

    /// Serialize the value region for delivery upstream: row count must
    /// match what the step asked for.
    pub fn project(&mut self, ctx: &mut StepContext) -> Result<()> {
        if !self.output_shape.has_values() {
            return Err(bad_shape_err(format!(
                "projection needs a value-bearing output shape, have {:?}",
                self.output_shape
            )));
        }
        let nvals = self.result.nvals();
        if nvals != self.req_nvals {
            return Err(self.mismatch(ctx, nvals, self.req_nvals));
        }
        let mut w = ByteWriter::new();
        w.write_blob(self.result.value_bytes());
        ctx.serialized.extend_from_slice(&w.into_vec());
        Ok(())
    }

    /// Write the projected column into `rg` at `offset`. When fewer rows
    /// came back than the group holds and variable-size blocks are
    /// allowed, the group is repacked down to the surviving rows instead
    /// of erroring.
    pub fn project_into_row_group(
        &mut self,
        ctx: &mut StepContext,
        rg: &mut RowGroup,
        offset: usize,
    ) -> Result<()> {
        if !self.output_shape.has_values() {
            return Err(bad_shape_err(format!(
                "row group projection needs a value-bearing output shape, have {:?}",
                self.output_shape
            )));
        }
        let nvals = self.result.nvals();
        let expected = rg.row_count();
        if nvals != expected {
            if !ctx.allow_variable_block || ctx.session.maintenance {
                return Err(self.mismatch(ctx, nvals, expected));
            }
            if !self.output_shape.has_rids() {
                return Err(bad_shape_err(
                    "row group repack needs rids in the output shape",
                ));
            }
            self.remove_rows_from_row_group(rg)?;
        }
        let w = self.col_type.width.bytes();
        for i in 0..nvals {
            let v = self.result.value_at::<T>(i);
            if matches!(T::WIDTH, ColWidth::W16) {
                rg.set_binary_field(i, offset, &v.widen_wide().to_le_bytes());
            } else {
                rg.set_int_field(i, offset, w, v.widen());
            }
        }
        Ok(())
    }

    /// Keep only the rows whose rid survived this command. The result
    /// rids are an ordered subsequence of the input rids, so a single
    /// forward pass repacks the group.
    fn remove_rows_from_row_group(&self, rg: &mut RowGroup) -> Result<()> {
        let nvals = self.result.nvals();
        let mut kept = 0usize;
        let mut out = 0usize;
        for row in 0..rg.row_count() {
            if kept < nvals && self.input_rids[row] == self.result.rid_at(kept) {
                rg.copy_row(row, out);
                out += 1;
                kept += 1;
            }
        }
        if kept != nvals {
            return Err(mismatch_err(format!(
                "row group repack matched {} of {} result rids",
                kept, nvals
            )));
        }
        rg.truncate(out);
        Ok(())
    }

    fn mismatch(&self, ctx: &StepContext, got: usize, want: usize) -> Error {
        let msg = format!(
            "projection row count mismatch at lbid {}: got {}, expected {}",
            self.lbid, got, want
        );
        if ctx.session.maintenance {
            restart_err(msg)
        } else {
            mismatch_err(msg)
        }
    }

    /// A runnable copy sharing the parsed configuration but owning fresh
    /// transient state, for side-by-side workers on disjoint blocks.
    pub fn duplicate(&self) -> ColumnCommand<T> {
        ColumnCommand {
            col_type: self.col_type,
            is_scan: self.is_scan,
            trace_flags: self.trace_flags,
            filter_blob: self.filter_blob.clone(),
            filter_count: self.filter_count,
            bop: self.bop,
            filter: Arc::clone(&self.filter),
            last_lbid: self.last_lbid.clone(),
            output_shape: self.output_shape,
            want_abs_rids: self.want_abs_rids,
            feeder: self.feeder,
            lbid: self.lbid,
            suppress_filter: self.suppress_filter,
            block_count: 0,
            load_count: 0,
            was_versioned: false,
            input_rids: vec![0; LOGICAL_BLOCK_RIDS],
            input_presence: RidPresence::all(),
            req_nvals: 0,
            block_data: Vec::new(),
            result: ResultBuffer::new(),
        }
    }
}

impl<T: ColumnValue> PartialEq for ColumnCommand<T> {
    /// Configuration equality only; transient scan state is ignored.
    fn eq(&self, other: &ColumnCommand<T>) -> bool {
        self.col_type == other.col_type
            && self.is_scan == other.is_scan
            && self.filter_blob == other.filter_blob
            && self.filter_count == other.filter_count
            && self.bop == other.bop
            && self.last_lbid == other.last_lbid
            && self.output_shape == other.output_shape
            && self.want_abs_rids == other.want_abs_rids
            && self.feeder == other.feeder
    }
}

struct ParsedCommand {
    col_type: ColType,
    is_scan: bool,
    trace_flags: u32,
    filter_blob: Vec<u8>,
    filter_count: usize,
    bop: BoolOp,
    last_lbid: Vec<u64>,
}

fn parse_command(buf: &[u8]) -> Result<ParsedCommand> {
    let mut rd = ByteReader::new(buf);
    let _reserved = rd.read_u8()?;
    let col_type = ColType::read(&mut rd)?;
    let is_scan = rd.read_u8()? != 0;
    let trace_flags = rd.read_u32()?;
    let filter_blob = rd.read_blob()?.to_vec();
    let bop = BoolOp::from_u8(rd.read_u8()?)?;
    let filter_count = rd.read_u16()? as usize;
    let last_lbid = rd.read_u64_vec()?;
    Ok(ParsedCommand {
        col_type,
        is_scan,
        trace_flags,
        filter_blob,
        filter_count,
        bop,
        last_lbid,
    })
}

/// Width-dispatched command, one variant per supported element width.
pub enum AnyColumnCommand {
    W1(ColumnCommand<i8>),
    W2(ColumnCommand<i16>),
    W4(ColumnCommand<i32>),
    W8(ColumnCommand<i64>),
    W16(ColumnCommand<WideInt128>),
}

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            AnyColumnCommand::W1($c) => $body,
            AnyColumnCommand::W2($c) => $body,
            AnyColumnCommand::W4($c) => $body,
            AnyColumnCommand::W8($c) => $body,
            AnyColumnCommand::W16($c) => $body,
        }
    };
}

impl AnyColumnCommand {
    pub fn from_wire(buf: &[u8]) -> Result<AnyColumnCommand> {
        let parsed = parse_command(buf)?;
        Ok(match parsed.col_type.width {
            ColWidth::W1 => AnyColumnCommand::W1(ColumnCommand::new(parsed)?),
            ColWidth::W2 => AnyColumnCommand::W2(ColumnCommand::new(parsed)?),
            ColWidth::W4 => AnyColumnCommand::W4(ColumnCommand::new(parsed)?),
            ColWidth::W8 => AnyColumnCommand::W8(ColumnCommand::new(parsed)?),
            ColWidth::W16 => AnyColumnCommand::W16(ColumnCommand::new(parsed)?),
        })
    }

    pub fn write_wire(&self) -> Vec<u8> {
        dispatch!(self, c => {
            let mut w = ByteWriter::new();
            w.write_u8(0);
            c.col_type.write(&mut w);
            w.write_u8(c.is_scan as u8);
            w.write_u32(c.trace_flags);
            w.write_blob(&c.filter_blob);
            w.write_u8(match c.bop { BoolOp::And => 0, BoolOp::Or => 1 });
            w.write_u16(c.filter_count as u16);
            w.write_u64_vec(&c.last_lbid);
            w.into_vec()
        })
    }

    pub fn prep(&mut self, shape: u8, want_abs_rids: bool) -> Result<()> {
        dispatch!(self, c => c.prep(shape, want_abs_rids))
    }

    pub fn set_lbid(&mut self, lbid: u64) {
        dispatch!(self, c => c.set_lbid(lbid))
    }

    pub fn lbid(&self) -> u64 {
        dispatch!(self, c => c.lbid())
    }

    pub fn advance(&mut self) {
        dispatch!(self, c => c.advance())
    }

    pub fn is_scan(&self) -> bool {
        dispatch!(self, c => c.is_scan())
    }

    pub fn set_feeder(&mut self, role: FeederRole) {
        dispatch!(self, c => c.set_feeder(role))
    }

    pub fn will_prefetch(&self, threshold: f64) -> bool {
        dispatch!(self, c => c.will_prefetch(threshold))
    }

    pub fn disable_filters(&mut self) {
        dispatch!(self, c => c.disable_filters())
    }

    pub fn enable_filters(&mut self) {
        dispatch!(self, c => c.enable_filters())
    }

    pub fn execute(&mut self, ctx: &mut StepContext, source: &dyn BlockSource) -> Result<()> {
        dispatch!(self, c => c.execute(ctx, source))
    }

    pub fn project(&mut self, ctx: &mut StepContext) -> Result<()> {
        dispatch!(self, c => c.project(ctx))
    }

    pub fn project_into_row_group(
        &mut self,
        ctx: &mut StepContext,
        rg: &mut RowGroup,
        offset: usize,
    ) -> Result<()> {
        dispatch!(self, c => c.project_into_row_group(ctx, rg, offset))
    }

    pub fn duplicate(&self) -> AnyColumnCommand {
        match self {
            AnyColumnCommand::W1(c) => AnyColumnCommand::W1(c.duplicate()),
            AnyColumnCommand::W2(c) => AnyColumnCommand::W2(c.duplicate()),
            AnyColumnCommand::W4(c) => AnyColumnCommand::W4(c.duplicate()),
            AnyColumnCommand::W8(c) => AnyColumnCommand::W8(c.duplicate()),
            AnyColumnCommand::W16(c) => AnyColumnCommand::W16(c.duplicate()),
        }
    }
}
