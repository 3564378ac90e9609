// End-to-end tests of the command pipeline over an in-memory block
// source: scans, rid-list steps, partition statistics, projection, and
// the parallel-duplicate path.

use crate::block::{
    BlockSource, LoadOutcome, LoadRequest, SessionId, VersionContext, BLOCK_SIZE,
};
use crate::coltype::{ColDataType, ColType, ColWidth, ValueClass};
use crate::filter::{BoolOp, CmpOp};
use crate::rowgroup::RowGroup;
use crate::scan::{AnyColumnCommand, FeederRole};
use crate::step::StepContext;
use crate::value::ColumnValue;
use crate::wire::ByteWriter;
use rapidhash::RapidHashMap;
use riptide_base::{err, ErrorKind, Result, WideInt128};
use test_log::test;

struct MemBlockSource {
    blocks: RapidHashMap<u64, Vec<u8>>,
    versioned: bool,
    cached: bool,
}

impl MemBlockSource {
    fn new() -> MemBlockSource {
        MemBlockSource {
            blocks: RapidHashMap::default(),
            versioned: false,
            cached: false,
        }
    }

    /// Store one logical block of a width-W column starting at
    /// `start_lbid`: `values` fill rids 0.., the rest reads as empty.
    fn put_column<T: ColumnValue>(&mut self, start_lbid: u64, class: ValueClass, values: &[T]) {
        let w = T::WIDTH.bytes();
        let mut data = vec![0u8; w * BLOCK_SIZE];
        let empty = T::empty_for(class);
        for off in (0..data.len()).step_by(w) {
            empty.write_le(&mut data[off..off + w]);
        }
        for (i, &v) in values.iter().enumerate() {
            v.write_le(&mut data[i * w..i * w + w]);
        }
        for (b, chunk) in data.chunks_exact(BLOCK_SIZE).enumerate() {
            self.blocks.insert(start_lbid + b as u64, chunk.to_vec());
        }
    }
}

impl BlockSource for MemBlockSource {
    fn load_blocks(&self, req: &LoadRequest, out: &mut [&mut [u8]]) -> Result<LoadOutcome> {
        for (i, &lbid) in req.lbids.iter().enumerate() {
            let block = self
                .blocks
                .get(&lbid)
                .ok_or_else(|| err(format!("no block at lbid {}", lbid)))?;
            out[i].copy_from_slice(block);
        }
        let n = req.lbids.len() as u64;
        Ok(LoadOutcome {
            cache_hits: if self.cached { n } else { 0 },
            blocks_read: if self.cached { 0 } else { n },
            was_versioned: self.versioned,
        })
    }
}

fn command_bytes<T: ColumnValue>(
    ct: ColType,
    is_scan: bool,
    preds: &[(CmpOp, T)],
    bop: BoolOp,
    last_lbid: &[u64],
) -> Vec<u8> {
    let mut blob = ByteWriter::new();
    for &(op, v) in preds {
        blob.write_u8(op as u8);
        let mut tmp = vec![0u8; T::WIDTH.bytes()];
        v.write_le(&mut tmp);
        blob.write_bytes(&tmp);
    }
    let blob = blob.into_vec();
    let mut w = ByteWriter::new();
    w.write_u8(0);
    ct.write(&mut w);
    w.write_u8(is_scan as u8);
    w.write_u32(0);
    w.write_blob(&blob);
    w.write_u8(match bop {
        BoolOp::And => 0,
        BoolOp::Or => 1,
    });
    w.write_u16(preds.len() as u16);
    w.write_u64_vec(last_lbid);
    w.into_vec()
}

fn make_command<T: ColumnValue>(
    ct: ColType,
    is_scan: bool,
    preds: &[(CmpOp, T)],
    bop: BoolOp,
    last_lbid: &[u64],
) -> AnyColumnCommand {
    AnyColumnCommand::from_wire(&command_bytes(ct, is_scan, preds, bop, last_lbid)).unwrap()
}

fn fresh_ctx() -> StepContext {
    StepContext::new(SessionId::default(), 7, VersionContext { current_scn: 42 })
}

#[test]
fn scan_range_filter_yields_matching_rids_and_values() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::TinyInt, ColWidth::W1);
    src.put_column::<i8>(0, ct.value_class(), &[3, 6, 7, 11, 9]);

    let mut cmd = make_command::<i8>(
        ct,
        true,
        &[(CmpOp::Gt, 5i8), (CmpOp::Lt, 10i8)],
        BoolOp::And,
        &[],
    );
    cmd.prep(3, true).unwrap();
    cmd.set_lbid(0);

    let mut ctx = fresh_ctx();
    ctx.begin_block(16384);
    cmd.execute(&mut ctx, &src).unwrap();

    assert_eq!(ctx.rid_count, 3);
    assert_eq!(&ctx.rel_rids[..3], &[1, 2, 4]);
    assert_eq!(&ctx.values[..3], &[6, 7, 9]);
    assert_eq!(&ctx.abs_rids[..3], &[16385, 16386, 16388]);
    assert!(ctx.rid_map.get(1));
}

#[test]
fn scan_then_rid_step_chains_columns() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    // Column A at lbids 0..4, column B at lbids 100..104.
    src.put_column::<i32>(0, ct.value_class(), &[5, 50, 15, 40, 25]);
    src.put_column::<i32>(100, ct.value_class(), &[-1, -2, -3, -4, -5]);

    let mut a = make_command::<i32>(ct, true, &[(CmpOp::Ge, 25i32)], BoolOp::And, &[]);
    a.prep(3, false).unwrap();
    a.set_lbid(0);
    let mut b = make_command::<i32>(ct, false, &[], BoolOp::And, &[]);
    b.prep(3, false).unwrap();
    b.set_lbid(100);

    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    a.execute(&mut ctx, &src).unwrap();
    assert_eq!(ctx.rid_count, 3);
    assert_eq!(&ctx.rel_rids[..3], &[1, 3, 4]);

    b.execute(&mut ctx, &src).unwrap();
    assert_eq!(ctx.rid_count, 3);
    assert_eq!(&ctx.rel_rids[..3], &[1, 3, 4]);
    assert_eq!(&ctx.values[..3], &[-2, -4, -5]);
}

#[test]
fn scan_past_last_lbid_reads_empty_without_touching_source() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::BigInt, ColWidth::W8);
    let values: Vec<i64> = (0..4096).map(|i| i + 100).collect();
    src.put_column::<i64>(0, ct.value_class(), &values);
    // Blocks 4..8 exist in the extent but were never written; drop them
    // from the source so an attempted load fails loudly.
    for lbid in 4..8 {
        src.blocks.remove(&lbid);
    }

    let mut cmd = make_command::<i64>(ct, true, &[], BoolOp::And, &[3]);
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);

    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();

    assert_eq!(ctx.rid_count, 4096);
    assert_eq!(ctx.values[0], 100);
    assert_eq!(ctx.values[4095], 4195);
    assert!(ctx.cp.valid);
    assert_eq!(ctx.cp.min, 100);
    assert_eq!(ctx.cp.max, 4195);
    assert_eq!(ctx.stats.touched_blocks, 4);
}

#[test]
fn nulls_never_match_predicates_but_pass_empty_filters() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::SmallInt, ColWidth::W2);
    let null = i16::null_for(ct.value_class());
    src.put_column::<i16>(0, ct.value_class(), &[10, null, 20, null, 30]);

    let mut filtered = make_command::<i16>(ct, true, &[(CmpOp::Ge, 0i16)], BoolOp::And, &[]);
    filtered.prep(3, false).unwrap();
    filtered.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    filtered.execute(&mut ctx, &src).unwrap();
    assert_eq!(&ctx.rel_rids[..ctx.rid_count], &[0, 2, 4]);

    let mut open = make_command::<i16>(ct, true, &[], BoolOp::And, &[]);
    open.prep(3, false).unwrap();
    open.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    open.execute(&mut ctx, &src).unwrap();
    assert_eq!(&ctx.rel_rids[..ctx.rid_count], &[0, 1, 2, 3, 4]);
    // Min/max still skip the null rows.
    assert_eq!(ctx.cp.min, 10);
    assert_eq!(ctx.cp.max, 30);
}

#[test]
fn value_only_scan_skips_empty_rows_even_at_width_one() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::TinyInt, ColWidth::W1);
    let empty = i8::empty_for(ct.value_class());
    src.put_column::<i8>(0, ct.value_class(), &[4, empty, 5, empty, 6]);

    let mut cmd = make_command::<i8>(ct, true, &[], BoolOp::And, &[]);
    cmd.prep(2, false).unwrap();
    cmd.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();
    assert_eq!(ctx.rid_count, 3);
    assert_eq!(&ctx.values[..3], &[4, 5, 6]);
}

#[test]
fn projection_mismatch_fails_query_or_requests_restart() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    src.put_column::<i32>(0, ct.value_class(), &[1, 2, 3, 4, 5]);

    // Step-mode lookup that silently drops rows its filter rejects.
    let mut cmd = make_command::<i32>(ct, false, &[(CmpOp::Le, 3i32)], BoolOp::And, &[]);
    cmd.prep(2, false).unwrap();
    cmd.set_lbid(0);

    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    ctx.rid_count = 5;
    ctx.rel_rids[..5].copy_from_slice(&[0, 1, 2, 3, 4]);
    cmd.execute(&mut ctx, &src).unwrap();
    let e = cmd.project(&mut ctx).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Mismatch);

    let mut ctx = fresh_ctx();
    ctx.session = SessionId {
        id: 1,
        maintenance: true,
    };
    ctx.begin_block(0);
    ctx.rid_count = 5;
    ctx.rel_rids[..5].copy_from_slice(&[0, 1, 2, 3, 4]);
    cmd.execute(&mut ctx, &src).unwrap();
    let e = cmd.project(&mut ctx).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Restart);
}

#[test]
fn projection_serializes_value_bytes_when_counts_agree() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    src.put_column::<i32>(0, ct.value_class(), &[9, 8, 7]);

    let mut cmd = make_command::<i32>(ct, false, &[], BoolOp::And, &[]);
    cmd.prep(2, false).unwrap();
    cmd.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    ctx.rid_count = 2;
    ctx.rel_rids[..2].copy_from_slice(&[0, 2]);
    cmd.execute(&mut ctx, &src).unwrap();
    cmd.project(&mut ctx).unwrap();

    let mut want = ByteWriter::new();
    want.write_u32(8);
    want.write_bytes(&9i32.to_le_bytes());
    want.write_bytes(&7i32.to_le_bytes());
    assert_eq!(ctx.serialized, want.into_vec());
}

#[test]
fn row_group_repacks_when_variable_blocks_allowed() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    src.put_column::<i32>(0, ct.value_class(), &[1, 2, 3, 4, 5]);

    let mut cmd = make_command::<i32>(ct, false, &[(CmpOp::Ne, 2i32)], BoolOp::And, &[]);
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);

    let mut ctx = fresh_ctx();
    ctx.allow_variable_block = true;
    ctx.begin_block(0);
    ctx.rid_count = 5;
    ctx.rel_rids[..5].copy_from_slice(&[0, 1, 2, 3, 4]);
    cmd.execute(&mut ctx, &src).unwrap();

    let mut rg = RowGroup::new(8, 8);
    rg.set_row_count(5).unwrap();
    for r in 0..5 {
        rg.set_int_field(r, 4, 4, r as i64 * 1000);
    }
    cmd.project_into_row_group(&mut ctx, &mut rg, 0).unwrap();

    assert_eq!(rg.row_count(), 4);
    // Survivors keep their earlier columns; rid 1 (value 2) is gone.
    assert_eq!(rg.int_field(0, 4, 4), 0);
    assert_eq!(rg.int_field(1, 4, 4), 2000);
    assert_eq!(rg.int_field(3, 4, 4), 4000);
    assert_eq!(rg.int_field(0, 0, 4), 1);
    assert_eq!(rg.int_field(1, 0, 4), 3);
    assert_eq!(rg.int_field(3, 0, 4), 5);
}

#[test]
fn duplicates_scan_disjoint_blocks_in_parallel() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Decimal, ColWidth::W16);
    let block0: Vec<WideInt128> = (0..8192)
        .map(|i| WideInt128::new(i as i128 * 3 - 4000))
        .collect();
    let block1: Vec<WideInt128> = (0..8192)
        .map(|i| WideInt128::new(((i as i128) * 3 + 1) << 70))
        .collect();
    src.put_column::<WideInt128>(0, ct.value_class(), &block0);
    src.put_column::<WideInt128>(16, ct.value_class(), &block1);

    let pred = [(CmpOp::Gt, WideInt128::new(9000))];
    let mut seq = make_command::<WideInt128>(ct, true, &pred, BoolOp::And, &[]);
    seq.prep(3, false).unwrap();
    seq.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    seq.execute(&mut ctx, &src).unwrap();
    let want0: Vec<WideInt128> = ctx.wide_values[..ctx.rid_count].to_vec();
    seq.advance();
    assert_eq!(seq.lbid(), 16);
    ctx.begin_block(8192);
    seq.execute(&mut ctx, &src).unwrap();
    let want1: Vec<WideInt128> = ctx.wide_values[..ctx.rid_count].to_vec();

    let mut par0 = make_command::<WideInt128>(ct, true, &pred, BoolOp::And, &[]);
    par0.prep(3, false).unwrap();
    par0.set_lbid(0);
    let mut par1 = par0.duplicate();
    par1.set_lbid(16);

    let (got0, got1) = std::thread::scope(|s| {
        let src = &src;
        let h0 = s.spawn(move || {
            let mut ctx = fresh_ctx();
            ctx.begin_block(0);
            par0.execute(&mut ctx, src).unwrap();
            ctx.wide_values[..ctx.rid_count].to_vec()
        });
        let h1 = s.spawn(move || {
            let mut ctx = fresh_ctx();
            ctx.begin_block(8192);
            par1.execute(&mut ctx, src).unwrap();
            ctx.wide_values[..ctx.rid_count].to_vec()
        });
        (h0.join().unwrap(), h1.join().unwrap())
    });

    assert_eq!(got0, want0);
    assert_eq!(got1, want1);
    // The two ranges concatenate to the sequential result.
    assert!(!got0.is_empty() && !got1.is_empty());
}

#[test]
fn executing_the_same_block_twice_is_idempotent() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    src.put_column::<i32>(0, ct.value_class(), &[10, 20, 30]);

    let mut cmd = make_command::<i32>(ct, true, &[(CmpOp::Ge, 20i32)], BoolOp::And, &[]);
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);

    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();
    let first: Vec<u16> = ctx.rel_rids[..ctx.rid_count].to_vec();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();
    assert_eq!(&ctx.rel_rids[..ctx.rid_count], &first[..]);
}

#[test]
fn feeder_chain_hands_rids_through_the_slot() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    src.put_column::<i32>(0, ct.value_class(), &[6, 1, 8]);
    src.put_column::<i32>(100, ct.value_class(), &[7, 9, 5]);

    // Upstream feeder scans column A and stages its survivors in slot 0
    // as well as the main arrays.
    let mut a = make_command::<i32>(ct, true, &[(CmpOp::Gt, 5i32)], BoolOp::And, &[]);
    a.prep(3, false).unwrap();
    a.set_lbid(0);
    a.set_feeder(FeederRole::Left);

    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    a.execute(&mut ctx, &src).unwrap();

    assert_eq!(ctx.rid_count, 2);
    assert_eq!(&ctx.rel_rids[..2], &[0, 2]);
    let slot = &ctx.feeder.slots[0];
    assert_eq!(slot.rid_count, 2);
    assert_eq!(&slot.rids[..2], &[0, 2]);
    assert_eq!(&slot.values[..2], &[6, 8]);

    // Downstream feeder reads its rid list from the slot, not the main
    // arrays; clobber those to prove it.
    ctx.rid_count = 0;
    ctx.rel_rids[..2].copy_from_slice(&[99, 98]);

    let mut b = make_command::<i32>(ct, false, &[(CmpOp::Gt, 6i32)], BoolOp::And, &[]);
    b.prep(3, false).unwrap();
    b.set_lbid(100);
    b.set_feeder(FeederRole::Left);
    b.execute(&mut ctx, &src).unwrap();

    // Column B at rids 0 and 2 holds 7 and 5; only rid 0 passes > 6.
    assert_eq!(ctx.rid_count, 1);
    assert_eq!(ctx.rel_rids[0], 0);
    assert_eq!(ctx.values[0], 7);
    let slot = &ctx.feeder.slots[0];
    assert_eq!(slot.rid_count, 1);
    assert_eq!(slot.rids[0], 0);
    assert_eq!(slot.values[0], 7);
}

#[test]
fn disabled_filters_turn_a_lookup_into_plain_projection() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    src.put_column::<i32>(0, ct.value_class(), &[1, 2, 3]);

    let mut cmd = make_command::<i32>(ct, true, &[(CmpOp::Gt, 100i32)], BoolOp::And, &[]);
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();
    assert_eq!(ctx.rid_count, 0);

    cmd.disable_filters();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();
    assert_eq!(ctx.rid_count, 3);
    cmd.enable_filters();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();
    assert_eq!(ctx.rid_count, 0);
}

#[test]
fn wide_decimal_scan_tracks_wide_min_max() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Decimal, ColWidth::W16);
    let big = WideInt128::new(170_141_183_460_469_231_731_687_303_715_884_105_727i128 / 3);
    let vals = [
        WideInt128::new(-5),
        big,
        WideInt128::new(12),
        WideInt128::null(),
    ];
    src.put_column::<WideInt128>(0, ct.value_class(), &vals);

    let mut cmd = make_command::<WideInt128>(
        ct,
        true,
        &[(CmpOp::Gt, WideInt128::new(0))],
        BoolOp::And,
        &[],
    );
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();

    assert_eq!(ctx.rid_count, 2);
    assert_eq!(&ctx.rel_rids[..2], &[1, 2]);
    assert_eq!(ctx.wide_values[0], big);
    assert_eq!(ctx.wide_values[1], WideInt128::new(12));
    assert!(ctx.cp.valid);
    assert!(ctx.cp.has_wide);
    assert_eq!(ctx.cp.wide_min, WideInt128::new(-5));
    assert_eq!(ctx.cp.wide_max, big);
}

#[test]
fn wide_non_decimal_min_max_is_a_config_error() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::Char, ColWidth::W16);
    src.put_column::<WideInt128>(0, ct.value_class(), &[WideInt128::new(1)]);

    let mut cmd = make_command::<WideInt128>(ct, true, &[], BoolOp::And, &[]);
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    let e = cmd.execute(&mut ctx, &src).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Config);
}

#[test]
fn versioned_blocks_invalidate_partition_stats() {
    let mut src = MemBlockSource::new();
    src.versioned = true;
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    src.put_column::<i32>(0, ct.value_class(), &[1, 2, 3]);

    let mut cmd = make_command::<i32>(ct, true, &[], BoolOp::And, &[]);
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();
    assert_eq!(ctx.rid_count, 3);
    assert!(!ctx.cp.valid);
}

#[test]
fn unsigned_partition_stats_order_and_store_as_unsigned() {
    let mut src = MemBlockSource::new();
    let ct = ColType::new(ColDataType::UTinyInt, ColWidth::W1);
    // 200 stores as byte 0xC8; signed order would call it the minimum.
    src.put_column::<i8>(0, ct.value_class(), &[1, 200u8 as i8]);

    let mut cmd = make_command::<i8>(ct, true, &[], BoolOp::And, &[]);
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();

    assert!(ctx.cp.valid);
    assert_eq!((ctx.cp.min, ctx.cp.max), (1, 200));
    assert_eq!(&ctx.values[..2], &[1, 200u8 as i8 as i64]);
}

#[test]
fn versioned_load_does_not_taint_later_blocks() {
    let mut src = MemBlockSource::new();
    src.versioned = true;
    let ct = ColType::new(ColDataType::TinyInt, ColWidth::W1);
    src.put_column::<i8>(0, ct.value_class(), &[4, 5]);

    let mut cmd = make_command::<i8>(ct, true, &[], BoolOp::And, &[0]);
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);
    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();
    assert!(!ctx.cp.valid);

    // The next block is past the last written lbid and synthesizes as
    // all-empty without a load, so it is eligible for stats again.
    cmd.advance();
    ctx.begin_block(8192);
    cmd.execute(&mut ctx, &src).unwrap();
    assert_eq!(ctx.rid_count, 0);
    assert!(ctx.cp.valid);
    assert_eq!((ctx.cp.min, ctx.cp.max), (i64::MAX, i64::MIN));
}

#[test]
fn prefetch_backs_off_once_the_cache_warms() {
    let mut src = MemBlockSource::new();
    src.cached = true;
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    src.put_column::<i32>(0, ct.value_class(), &[1, 2, 3]);

    let mut cmd = make_command::<i32>(ct, true, &[], BoolOp::And, &[]);
    cmd.prep(3, false).unwrap();
    cmd.set_lbid(0);
    assert!(cmd.will_prefetch(0.3));

    let mut ctx = fresh_ctx();
    ctx.begin_block(0);
    cmd.execute(&mut ctx, &src).unwrap();
    assert!(!cmd.will_prefetch(0.3));
    assert_eq!(ctx.stats.cached_io, 4);
    assert_eq!(ctx.stats.physical_io, 0);
}

#[test]
fn wire_round_trip_preserves_the_command() {
    let ct = ColType::new(ColDataType::SmallInt, ColWidth::W2);
    let bytes = command_bytes::<i16>(
        ct,
        true,
        &[(CmpOp::Eq, 3i16), (CmpOp::Eq, 9i16)],
        BoolOp::Or,
        &[17, 99],
    );
    let cmd = AnyColumnCommand::from_wire(&bytes).unwrap();
    assert!(cmd.is_scan());
    assert_eq!(cmd.write_wire(), bytes);
}

#[test]
fn malformed_wire_is_rejected() {
    let ct = ColType::new(ColDataType::Int, ColWidth::W4);
    let bytes = command_bytes::<i32>(ct, true, &[], BoolOp::And, &[]);
    assert!(AnyColumnCommand::from_wire(&bytes[..bytes.len() - 2]).is_err());
    let mut bad_width = bytes.clone();
    bad_width[2] = 3;
    assert!(AnyColumnCommand::from_wire(&bad_width).is_err());
    // Filter count that disagrees with the (empty) blob.
    let mut bad_count = bytes;
    let n = bad_count.len();
    bad_count[n - 6] = 5;
    assert!(AnyColumnCommand::from_wire(&bad_count).is_err());
}
