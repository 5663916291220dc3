// core/tests/segmentation.rs
//
// End-to-end segmentation through SplitterContext.
//
// Tests cover:
// - segments tile the marked range with a border at its start
// - single-character buffers
// - determinism across repeated marking
// - pinned borders
// - reverse direction
// - fallback when no path reaches the region end

use std::sync::Arc;

use libkana_core::{
    Config, DepClass, Direction, MemoryDictionary, Pos, SegClass, Segment, SplitterContext,
    SplitterModel, WordMatch, WordType,
};

fn sample_dict() -> MemoryDictionary {
    let mut dict = MemoryDictionary::new();
    dict.insert("きょう", WordMatch::new(0, 3, WordType::noun()));
    dict.insert(
        "きょうは",
        WordMatch::new(0, 3, WordType::noun()).with_dep(1, DepClass::Fuzokugo),
    );
    dict.insert("いい", WordMatch::new(0, 2, WordType::new(Pos::A)));
    dict.insert("てんき", WordMatch::new(0, 3, WordType::noun()));
    dict.insert("ねこ", WordMatch::new(0, 2, WordType::noun()));
    dict.insert(
        "ねこが",
        WordMatch::new(0, 2, WordType::noun()).with_dep(1, DepClass::Kakujoshi),
    );
    dict
}

fn context(text: &str, dict: &MemoryDictionary, direction: Direction) -> SplitterContext {
    SplitterContext::new(
        Arc::new(SplitterModel::new()),
        dict,
        text,
        direction,
        Config::default(),
    )
    .expect("non-empty input")
}

fn assert_tiles(ctx: &SplitterContext) {
    let segs = ctx.segments();
    assert!(!segs.is_empty());
    assert!(ctx.is_border(0));
    let mut pos = 0;
    for s in &segs {
        assert_eq!(s.from, pos, "gap or overlap before {:?}", s);
        assert!(s.len > 0);
        pos = s.end();
    }
    assert_eq!(pos, ctx.char_count());
}

#[test]
fn segments_tile_the_buffer() {
    let dict = sample_dict();
    for text in [
        "きょうはいいてんき",
        "ねこがいい",
        "ねこ・・",
        "・・ねこ。",
        "あいうえお",
        "てんきてんきてんき",
    ] {
        let mut ctx = context(text, &dict, Direction::Forward);
        ctx.mark_all().unwrap();
        assert_tiles(&ctx);
    }
}

#[test]
fn single_character_is_one_segment() {
    let dict = sample_dict();
    let mut ctx = context("ね", &dict, Direction::Forward);
    ctx.mark_all().unwrap();
    assert_eq!(
        ctx.segments(),
        vec![Segment {
            from: 0,
            len: 1,
            seg_class: SegClass::Bunsetsu
        }]
    );
}

#[test]
fn dictionary_words_become_segments() {
    let dict = sample_dict();
    let mut ctx = context("きょうはいいてんき", &dict, Direction::Forward);
    ctx.mark_all().unwrap();
    let texts: Vec<String> = ctx
        .segments()
        .iter()
        .map(|s| ctx.text(s.from, s.len))
        .collect();
    assert_eq!(texts, vec!["きょうは", "いい", "てんき"]);
    assert_eq!(ctx.best_seg_class(0), Some(SegClass::NounDependent));
    assert_eq!(ctx.best_seg_class(6), Some(SegClass::Noun));
    assert_eq!(ctx.metaword_count(0, 4), 1);
    assert!(ctx.nth_metaword(0, 4, 1).is_none());
}

#[test]
fn marking_is_deterministic() {
    let dict = sample_dict();
    let snapshot = |ctx: &SplitterContext| {
        let segs = ctx.segments();
        let best: Vec<_> = (0..ctx.char_count()).map(|p| ctx.best_metaword(p)).collect();
        (segs, best)
    };

    let mut ctx = context("きょうはねこがいいてんき", &dict, Direction::Forward);
    ctx.mark_all().unwrap();
    let first = snapshot(&ctx);
    ctx.mark_all().unwrap();
    assert_eq!(snapshot(&ctx), first);

    let mut other = context("きょうはねこがいいてんき", &dict, Direction::Forward);
    other.mark_all().unwrap();
    assert_eq!(snapshot(&other), first);
}

#[test]
fn pinned_border_is_respected() {
    let dict = sample_dict();
    let mut ctx = context("きょうはいいてんき", &dict, Direction::Forward);
    ctx.mark_border(0, Some(3), 9).unwrap();

    assert!(ctx.is_border(3));
    assert_eq!(ctx.metaword_count(0, 4), 0);
    assert_eq!(ctx.metaword_count(0, 3), 1);
    assert_eq!(ctx.text(0, 3), "きょう");
    assert_tiles(&ctx);
}

#[test]
fn partial_region_keeps_borders_outside_it() {
    let dict = sample_dict();
    let mut ctx = context("きょうはいいてんき", &dict, Direction::Forward);
    ctx.mark_all().unwrap();
    ctx.mark_border(4, None, 9).unwrap();
    assert!(ctx.is_border(0));
    assert!(ctx.is_border(4));
    assert!(ctx.is_border(6));
    assert_tiles(&ctx);
}

#[test]
fn reverse_direction_segments_the_reversed_buffer() {
    let mut dict = MemoryDictionary::new();
    dict.insert("こね", WordMatch::new(0, 2, WordType::noun()));

    let mut ctx = context("ねこが", &dict, Direction::Reverse);
    assert_eq!(ctx.direction(), Direction::Reverse);
    assert_eq!(ctx.text(0, 3), "がこね");
    ctx.mark_all().unwrap();
    let segs: Vec<(usize, usize)> = ctx.segments().iter().map(|s| (s.from, s.len)).collect();
    assert_eq!(segs, vec![(0, 1), (1, 2)]);
}

// The only meta-word at position 1 runs past the region end, so no path
// reaches position 2 and the search falls back to position 1. The
// resulting single border at 0 merges the region with what follows.
#[test]
fn unreachable_region_end_falls_back_to_earlier_beam() {
    let mut dict = MemoryDictionary::new();
    dict.insert("いう", WordMatch::new(0, 2, WordType::noun()));

    let mut ctx = context("あいう", &dict, Direction::Forward);
    ctx.mark_all().unwrap();
    let segs: Vec<(usize, usize)> = ctx.segments().iter().map(|s| (s.from, s.len)).collect();
    assert_eq!(segs, vec![(0, 1), (1, 2)]);

    ctx.mark_border(0, None, 2).unwrap();
    assert!(ctx.is_border(0));
    assert!(!ctx.is_border(1));
    assert!(!ctx.is_border(2));
    assert_eq!(
        ctx.segments(),
        vec![Segment {
            from: 0,
            len: 3,
            seg_class: SegClass::Bunsetsu
        }]
    );
}
