//! End-to-end tests of the index engine over the in-memory store.

use dirix_index::{
    AttributeIndex, AttributeIndexConfig, AttributeRules, CandidateSet, Entry, EntryId, IndexKind,
    IndexSet, IndexStore, MemoryIndexStore, Modification, ModificationOp, StaticSchema,
};
use dirix_matching::{Assertion, SubstringConfig, create_rule};

fn schema() -> StaticSchema {
    let mut schema = StaticSchema::new();
    schema.define(
        "cn",
        AttributeRules::uniform(create_rule("case-ignore").unwrap())
            .with_approximate(create_rule("approximate").unwrap()),
    );
    schema.define(
        "employeeNumber",
        AttributeRules::uniform(create_rule("integer").unwrap()),
    );
    schema
}

fn cn_index() -> AttributeIndex {
    let config = AttributeIndexConfig::new(
        "cn",
        [
            IndexKind::Presence,
            IndexKind::Equality,
            IndexKind::Ordering,
            IndexKind::Substring,
            IndexKind::Approximate,
        ],
    )
    .with_substring(SubstringConfig {
        min_substring_length: 3,
        ..SubstringConfig::default()
    });
    AttributeIndex::new(config, &schema()).unwrap()
}

fn number_index() -> AttributeIndex {
    AttributeIndex::new(
        AttributeIndexConfig::new("employeeNumber", [IndexKind::Equality, IndexKind::Ordering]),
        &schema(),
    )
    .unwrap()
}

fn person(id: u64, cn: &str) -> Entry {
    Entry::new(EntryId(id)).with_attribute("cn", [cn.as_bytes()])
}

fn ids(result: CandidateSet) -> Vec<u64> {
    match result {
        CandidateSet::Defined(ids) => ids.into_iter().map(|id| id.0).collect(),
        CandidateSet::NotTrusted => panic!("expected a trusted result"),
    }
}

#[test]
fn test_add_then_query_every_kind() {
    let index = cn_index();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();

    index.add_entry(&mut *txn, &person(1, "Alice Smith")).unwrap();
    index.add_entry(&mut *txn, &person(2, "Bob Jones")).unwrap();
    index.add_entry(&mut *txn, &person(3, "Carol Smith")).unwrap();
    txn.commit().unwrap();

    let rule = create_rule("case-ignore").unwrap();
    let mut txn = store.begin().unwrap();

    assert_eq!(ids(index.evaluate(&mut *txn, &Assertion::Present).unwrap()), vec![1, 2, 3]);

    let eq = Assertion::equality(rule.clone(), b"alice smith").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &eq).unwrap()), vec![1]);

    let ge = Assertion::greater_or_equal(rule.clone(), b"bob").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &ge).unwrap()), vec![2, 3]);

    let le = Assertion::less_or_equal(rule.clone(), b"bob jones").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &le).unwrap()), vec![1, 2]);

    let sub = Assertion::substring(rule.clone(), None, &[b"smith"], None).unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &sub).unwrap()), vec![1, 3]);

    let sub_initial = Assertion::substring(rule, Some(b"ali"), &[], None).unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &sub_initial).unwrap()), vec![1]);
}

#[test]
fn test_approximate_groups_similar_sounding_names() {
    let index = cn_index();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();

    index.add_entry(&mut *txn, &person(1, "Robert")).unwrap();
    index.add_entry(&mut *txn, &person(2, "Rupert")).unwrap();
    index.add_entry(&mut *txn, &person(3, "Alice")).unwrap();

    let approx = create_rule("approximate").unwrap();
    let sounds_like = Assertion::approximate(approx, b"Robert").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &sounds_like).unwrap()), vec![1, 2]);
}

#[test]
fn test_integer_range_uses_numeric_order() {
    let index = number_index();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();

    for (id, number) in [(1, "9"), (2, "10"), (3, "-3"), (4, "200")] {
        let entry =
            Entry::new(EntryId(id)).with_attribute("employeeNumber", [number.as_bytes()]);
        index.add_entry(&mut *txn, &entry).unwrap();
    }

    let rule = create_rule("integer").unwrap();
    // Byte-lexicographic order would put "10" before "9"; the encoded keys
    // must follow numeric order instead.
    let ge = Assertion::greater_or_equal(rule.clone(), b"9").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &ge).unwrap()), vec![1, 2, 4]);

    let le = Assertion::less_or_equal(rule, b"9").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &le).unwrap()), vec![1, 3]);
}

#[test]
fn test_replace_moves_entry_between_keys() {
    let index = cn_index();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();

    let old = person(1, "Alice");
    index.add_entry(&mut *txn, &old).unwrap();

    let new = person(1, "Alicia");
    index.replace_entry(&mut *txn, &old, &new).unwrap();

    let rule = create_rule("case-ignore").unwrap();
    let was = Assertion::equality(rule.clone(), b"Alice").unwrap();
    let now = Assertion::equality(rule, b"Alicia").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &was).unwrap()), Vec::<u64>::new());
    assert_eq!(ids(index.evaluate(&mut *txn, &now).unwrap()), vec![1]);
    // Presence is unaffected by a value change.
    assert_eq!(ids(index.evaluate(&mut *txn, &Assertion::Present).unwrap()), vec![1]);
}

#[test]
fn test_replace_to_absent_clears_presence_and_values() {
    let index = cn_index();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();

    let old = person(1, "Alice");
    index.add_entry(&mut *txn, &old).unwrap();

    let new = Entry::new(EntryId(1));
    index.replace_entry(&mut *txn, &old, &new).unwrap();

    let rule = create_rule("case-ignore").unwrap();
    let eq = Assertion::equality(rule, b"alice").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &eq).unwrap()), Vec::<u64>::new());
    assert_eq!(
        ids(index.evaluate(&mut *txn, &Assertion::Present).unwrap()),
        Vec::<u64>::new()
    );
}

#[test]
fn test_delete_removes_entry_everywhere() {
    let index = cn_index();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();

    let alice = person(1, "Alice");
    index.add_entry(&mut *txn, &alice).unwrap();
    index.add_entry(&mut *txn, &person(2, "Bob")).unwrap();
    index.delete_entry(&mut *txn, &alice).unwrap();

    let rule = create_rule("case-ignore").unwrap();
    let eq = Assertion::equality(rule, b"alice").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &eq).unwrap()), Vec::<u64>::new());
    assert_eq!(ids(index.evaluate(&mut *txn, &Assertion::Present).unwrap()), vec![2]);
}

#[test]
fn test_modify_equals_replace() {
    let index = cn_index();
    let store_a = MemoryIndexStore::new();
    let store_b = MemoryIndexStore::new();

    let old = person(1, "Alice");
    let mods = vec![Modification::new(
        ModificationOp::Replace,
        "cn",
        [b"Alicia".as_slice()],
    )];
    let new = old.apply(&mods);

    let mut txn_a = store_a.begin().unwrap();
    index.add_entry(&mut *txn_a, &old).unwrap();
    index.modify_entry(&mut *txn_a, &old, &new, &mods).unwrap();

    let mut txn_b = store_b.begin().unwrap();
    index.add_entry(&mut *txn_b, &old).unwrap();
    index.replace_entry(&mut *txn_b, &old, &new).unwrap();

    let rule = create_rule("case-ignore").unwrap();
    for target in [b"alice".as_slice(), b"alicia"] {
        let eq = Assertion::equality(rule.clone(), target).unwrap();
        assert_eq!(
            index.evaluate(&mut *txn_a, &eq).unwrap(),
            index.evaluate(&mut *txn_b, &eq).unwrap()
        );
    }
}

#[test]
fn test_oversized_posting_list_is_not_trusted() {
    let config = AttributeIndexConfig::new("cn", [IndexKind::Presence, IndexKind::Equality])
        .with_entry_limit(2);
    let index = AttributeIndex::new(config, &schema()).unwrap();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();

    for id in 1..=3 {
        index.add_entry(&mut *txn, &person(id, "Smith")).unwrap();
    }

    let rule = create_rule("case-ignore").unwrap();
    let eq = Assertion::equality(rule, b"smith").unwrap();
    assert_eq!(index.evaluate(&mut *txn, &eq).unwrap(), CandidateSet::NotTrusted);
    assert_eq!(
        index.evaluate(&mut *txn, &Assertion::Present).unwrap(),
        CandidateSet::NotTrusted
    );
}

#[test]
fn test_short_substring_component_is_not_trusted() {
    let index = cn_index();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();
    index.add_entry(&mut *txn, &person(1, "Alice")).unwrap();

    let rule = create_rule("case-ignore").unwrap();
    // "al" is shorter than the 3-cluster window and has no usable key.
    let sub = Assertion::substring(rule, Some(b"al"), &[], None).unwrap();
    assert_eq!(index.evaluate(&mut *txn, &sub).unwrap(), CandidateSet::NotTrusted);
}

#[test]
fn test_unconfigured_kind_is_not_trusted() {
    let index = AttributeIndex::new(
        AttributeIndexConfig::new("cn", [IndexKind::Equality]),
        &schema(),
    )
    .unwrap();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();
    index.add_entry(&mut *txn, &person(1, "Alice")).unwrap();

    assert_eq!(
        index.evaluate(&mut *txn, &Assertion::Present).unwrap(),
        CandidateSet::NotTrusted
    );

    let rule = create_rule("case-ignore").unwrap();
    let eq = Assertion::equality(rule, b"alice").unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &eq).unwrap()), vec![1]);
}

#[test]
fn test_uncommitted_mutation_is_invisible() {
    let index = cn_index();
    let store = MemoryIndexStore::new();

    {
        let mut txn = store.begin().unwrap();
        index.add_entry(&mut *txn, &person(1, "Alice")).unwrap();
        // Dropped without commit.
    }

    let rule = create_rule("case-ignore").unwrap();
    let eq = Assertion::equality(rule, b"alice").unwrap();
    let mut txn = store.begin().unwrap();
    assert_eq!(ids(index.evaluate(&mut *txn, &eq).unwrap()), Vec::<u64>::new());
}

#[test]
fn test_index_set_spans_attributes() {
    let set = IndexSet::from_configs(
        [
            AttributeIndexConfig::new("cn", [IndexKind::Presence, IndexKind::Equality]),
            AttributeIndexConfig::new("employeeNumber", [IndexKind::Equality, IndexKind::Ordering]),
        ],
        &schema(),
    )
    .unwrap();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();

    let entry = Entry::new(EntryId(1))
        .with_attribute("cn", [b"Alice".as_slice()])
        .with_attribute("employeeNumber", [b"42".as_slice()]);
    set.add_entry(&mut *txn, &entry).unwrap();
    txn.commit().unwrap();

    let mut txn = store.begin().unwrap();
    let ci = create_rule("case-ignore").unwrap();
    let integer = create_rule("integer").unwrap();

    let by_name = Assertion::equality(ci, b"ALICE").unwrap();
    assert_eq!(ids(set.evaluate(&mut *txn, "cn", &by_name).unwrap()), vec![1]);

    let by_number = Assertion::greater_or_equal(integer, b"40").unwrap();
    assert_eq!(
        ids(set.evaluate(&mut *txn, "employeeNumber", &by_number).unwrap()),
        vec![1]
    );
}

#[test]
fn test_candidate_sets_compose_across_assertions() {
    let index = cn_index();
    let store = MemoryIndexStore::new();
    let mut txn = store.begin().unwrap();

    index.add_entry(&mut *txn, &person(1, "Alice Smith")).unwrap();
    index.add_entry(&mut *txn, &person(2, "Alice Jones")).unwrap();
    index.add_entry(&mut *txn, &person(3, "Bob Smith")).unwrap();

    let rule = create_rule("case-ignore").unwrap();
    let alice = Assertion::substring(rule.clone(), Some(b"alice"), &[], None).unwrap();
    let smith = Assertion::substring(rule, None, &[], Some(b"smith")).unwrap();

    let both = index
        .evaluate(&mut *txn, &alice)
        .unwrap()
        .intersect(index.evaluate(&mut *txn, &smith).unwrap());
    assert_eq!(ids(both), vec![1]);
}
