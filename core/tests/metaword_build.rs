// core/tests/metaword_build.rs
//
// Meta-word construction observed through the public context API.

use std::collections::HashSet;
use std::sync::Arc;

use libkana_core::{
    CompoundEntry, Config, DepClass, Direction, MemoryDictionary, MetaWordKind, MetaWordStore,
    Scos, SegClass, SplitterContext, SplitterModel, WordMatch, WordType,
};

fn context(text: &str, dict: &MemoryDictionary) -> SplitterContext {
    SplitterContext::new(
        Arc::new(SplitterModel::new()),
        dict,
        text,
        Direction::Forward,
        Config::default(),
    )
    .unwrap()
}

fn numbers() -> MemoryDictionary {
    let mut dict = MemoryDictionary::new();
    dict.insert("いち", WordMatch::new(0, 2, WordType::number(Scos::N1)));
    dict.insert("せん", WordMatch::new(0, 2, WordType::number(Scos::N1000)));
    dict.insert("まん", WordMatch::new(0, 2, WordType::number(Scos::N10000)));
    dict
}

fn has_number(store: &MetaWordStore, from: usize, len: usize) -> bool {
    store.at(from).iter().any(|&id| {
        let mw = store.get(id);
        mw.len == len && matches!(mw.kind, MetaWordKind::Number { .. })
    })
}

fn assert_single_parents(store: &MetaWordStore) {
    let mut seen = HashSet::new();
    for (id, mw) in store.iter() {
        for child in mw.kind.children() {
            assert!(seen.insert(child), "{:?} has two parents", child);
            assert_eq!(store.get(child).parent, Some(id));
        }
    }
}

#[test]
fn ones_and_ten_thousands_combine() {
    let dict = numbers();
    let ctx = context("いちまん", &dict);
    assert!(has_number(ctx.metawords(), 0, 4));
    // the right operand also gets a committed one-child Number of its own
    assert!(has_number(ctx.metawords(), 2, 2));
    assert_single_parents(ctx.metawords());

    let mut ctx = context("いちまん", &dict);
    ctx.mark_all().unwrap();
    assert_eq!(ctx.segments().len(), 1);
}

#[test]
fn equal_scales_do_not_combine() {
    let dict = numbers();
    let ctx = context("いちいち", &dict);
    assert!(!has_number(ctx.metawords(), 0, 4));
    let ctx = context("せんせん", &dict);
    assert!(!has_number(ctx.metawords(), 0, 4));
}

#[test]
fn numeral_chains_nest() {
    let dict = numbers();
    let ctx = context("せんいちまん", &dict);
    let store = ctx.metawords();
    assert!(has_number(store, 2, 4));
    assert!(has_number(store, 0, 6));
    assert_single_parents(store);
}

#[test]
fn one_segment_compound_classifies_like_a_simple_word() {
    let word = || WordMatch::new(0, 2, WordType::noun()).with_dep(1, DepClass::Kakujoshi);

    let mut simple = MemoryDictionary::new();
    simple.insert("ねこが", word());
    let ctx = context("ねこが", &simple);
    let single = ctx
        .metawords()
        .at(0)
        .iter()
        .map(|&id| ctx.metaword(id))
        .find(|m| m.kind == MetaWordKind::Single && m.len == 3)
        .unwrap()
        .seg_class;

    let mut compound = MemoryDictionary::new();
    compound.insert("ねこが", word().with_compound(CompoundEntry::new().push(2, "猫")));
    let ctx = context("ねこが", &compound);
    let head = ctx
        .metawords()
        .at(0)
        .iter()
        .map(|&id| ctx.metaword(id))
        .find(|m| matches!(m.kind, MetaWordKind::CompoundHead { .. }))
        .unwrap();

    assert_eq!(head.len, 3);
    assert_eq!(head.seg_class, single);
    assert_eq!(single, SegClass::NounCaseParticle);
}

#[test]
fn compound_leaves_are_preferred_at_their_borders() {
    let mut dict = MemoryDictionary::new();
    dict.insert(
        "とうきょうとが",
        WordMatch::new(0, 6, WordType::noun())
            .with_dep(1, DepClass::Kakujoshi)
            .with_compound(CompoundEntry::new().push(4, "東京").push(2, "都")),
    );
    let mut ctx = context("とうきょうとが", &dict);
    assert_single_parents(ctx.metawords());
    ctx.mark_all().unwrap();

    let segs: Vec<(usize, usize)> = ctx.segments().iter().map(|s| (s.from, s.len)).collect();
    assert_eq!(segs, vec![(0, 4), (4, 3)]);
    let leaf = ctx.best_metaword(0).expect("leaf preferred at 0");
    assert_eq!(ctx.metaword(leaf).kind, MetaWordKind::CompoundLeaf);
    assert_eq!(ctx.metaword(leaf).hint.as_deref(), Some("東京"));
    let tail = ctx.best_metaword(4).expect("leaf preferred at 4");
    assert_eq!(ctx.metaword(tail).hint.as_deref(), Some("都が"));
}

#[test]
fn trailing_symbols_are_wrapped() {
    let mut dict = MemoryDictionary::new();
    dict.insert("ねこ", WordMatch::new(0, 2, WordType::noun()));
    let ctx = context("ねこ・・", &dict);
    let store = ctx.metawords();
    let wrap = store
        .at(0)
        .iter()
        .map(|&id| store.get(id))
        .find(|m| matches!(m.kind, MetaWordKind::Wrap { .. }))
        .expect("wrap at 0");
    assert_eq!(wrap.len, 4);
    let MetaWordKind::Wrap { inner } = wrap.kind else {
        unreachable!()
    };
    assert_eq!(store.get(inner).len, 2);
    assert_single_parents(store);
}
