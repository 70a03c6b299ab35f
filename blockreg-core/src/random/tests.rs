//! Unit tests for random state resolution and tiled sampling.

use ndarray::s;
use rand::{RngCore, SeedableRng, rngs::SmallRng};
use rand_chacha::ChaCha8Rng;
use rstest::rstest;

use super::{COLUMN_TILE, DrawKey, RandomSource, RandomState, standard_normal_block};
use crate::error::BlockregErrorCode;

#[rstest]
#[case("", "unset")]
#[case("none", "unset")]
#[case("Entropy", "unset")]
#[case("42", "seed")]
#[case(" 7 ", "seed")]
fn parses_textual_random_states(#[case] raw: &str, #[case] kind: &str) {
    let state: RandomState = raw.parse().expect("accepted form");
    assert_eq!(state.kind(), kind);
}

#[rstest]
#[case("mt19937")]
#[case("-1")]
#[case("1.5")]
fn rejects_unknown_random_state_kinds(#[case] raw: &str) {
    let err = raw.parse::<RandomState>().expect_err("unknown kind");
    assert_eq!(err.code(), BlockregErrorCode::UnsupportedRandomStateKind);
}

#[test]
fn seeded_sources_issue_identical_keys() {
    let left = RandomSource::resolve(RandomState::Seed(9));
    let right = RandomSource::resolve(9_u64.into());
    for _ in 0..3 {
        assert_eq!(
            left.next_key().expect("lock is healthy"),
            right.next_key().expect("lock is healthy"),
        );
    }
}

#[test]
fn seeded_keys_follow_the_chacha_stream() {
    let source = RandomSource::from_seed(9);
    let mut expected = ChaCha8Rng::seed_from_u64(9);
    for _ in 0..3 {
        let mut key = [0_u8; 32];
        expected.fill_bytes(&mut key);
        assert_eq!(source.next_key().expect("lock is healthy"), DrawKey(key));
    }
}

#[test]
fn keys_advance_per_draw() {
    let source = RandomSource::from_seed(9);
    let first = source.next_key().expect("lock is healthy");
    let second = source.next_key().expect("lock is healthy");
    assert_ne!(first, second);
}

#[test]
fn distributed_state_passes_through() {
    let source = RandomSource::from_seed(1);
    let resolved = RandomSource::resolve(RandomState::from(source.clone()));
    assert!(resolved.shares_stream_with(&source));

    let before = source.next_key().expect("lock is healthy");
    let after = resolved.next_key().expect("lock is healthy");
    assert_ne!(before, after, "clones share one stream");
}

#[test]
fn local_generators_drive_key_derivation() {
    let left = RandomSource::resolve(RandomState::Local(Box::new(SmallRng::seed_from_u64(3))));
    let right = RandomSource::from_rng(SmallRng::seed_from_u64(3));
    assert_eq!(
        left.next_key().expect("lock is healthy"),
        right.next_key().expect("lock is healthy"),
    );
}

#[test]
fn unset_sources_are_independent() {
    let left = RandomSource::resolve(RandomState::Unset);
    let right = RandomSource::resolve(RandomState::default());
    assert!(!left.shares_stream_with(&right));
}

#[test]
fn blocks_agree_across_tile_boundaries() {
    let key = RandomSource::from_seed(17).next_key().expect("lock is healthy");
    let width = COLUMN_TILE * 2 + 5;
    let whole = standard_normal_block::<f64>(&key, 0..6, 0..width);
    let inner = standard_normal_block::<f64>(&key, 2..5, COLUMN_TILE - 3..COLUMN_TILE + 9);
    assert_eq!(
        whole.slice(s![2..5, COLUMN_TILE - 3..COLUMN_TILE + 9]),
        inner
    );
}

#[test]
fn precisions_draw_from_the_same_stream_layout() {
    let key = RandomSource::from_seed(23).next_key().expect("lock is healthy");
    let single = standard_normal_block::<f32>(&key, 0..4, 0..3);
    let double = standard_normal_block::<f64>(&key, 0..4, 0..3);
    assert_eq!(single.dim(), double.dim());
    assert!(single.iter().all(|v| v.is_finite()));
}

#[test]
fn normal_rejects_negative_scale() {
    let source = RandomSource::from_seed(0);
    let rows = crate::PartitionScheme::single(2).expect("valid layout");
    let cols = crate::PartitionScheme::single(2).expect("valid layout");
    let err = source
        .normal(-1.0, rows, cols, crate::Dtype::F64)
        .expect_err("negative deviation");
    assert_eq!(err.code(), BlockregErrorCode::InvalidFloatParameter);
}
