//! Tests for building, labelling, copying and reshaping chains.

mod test_utils;

use relay_chain::prelude::*;
use test_utils::{CallLog, logging_step, point_labels, step_names};

fn named(name: &str) -> Step {
    Step::new(|_| Ok(Returned::None)).named(name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// APPEND AND LABELS
// ═══════════════════════════════════════════════════════════════════════════════

/// Points run in append order and the chain ends are tracked.
#[test]
fn append_order() {
    let mut runner = Runner::new();
    assert!(runner.is_empty());
    assert!(runner.start().is_none() && runner.end().is_none());

    runner
        .extend([named("a"), named("b"), named("c")])
        .unwrap();

    assert_eq!(step_names(&runner), ["a", "b", "c"]);
    assert_eq!(runner.len(), 3);
    let start = runner.get(runner.start().unwrap()).unwrap();
    assert!(start.previous().is_none());
    let end = runner.get(runner.end().unwrap()).unwrap();
    assert!(end.next().is_none());
}

/// A label follows unlabelled insertions made through its modifier.
#[test]
fn label_follows_insertion() {
    let mut runner = Runner::new();
    runner
        .add(Registration::new(named("f1")).label("a"))
        .unwrap();
    runner.at("a").unwrap().add(named("f2")).unwrap();
    runner.add(named("f3")).unwrap();

    assert_eq!(step_names(&runner), ["f1", "f2", "f3"]);
    let owner = runner.labelled("a").unwrap();
    assert_eq!(runner.get(owner).unwrap().step().name(), "f2");
    assert_eq!(
        point_labels(&runner),
        [Vec::<String>::new(), vec!["a".to_string()], Vec::new()]
    );
}

/// Inserting through a label splices into the middle of the chain.
#[test]
fn insert_in_middle() {
    let mut runner = Runner::new();
    runner
        .add(Registration::new(named("first")).label("head"))
        .unwrap();
    runner.add(named("last")).unwrap();

    runner
        .at("head")
        .unwrap()
        .add(named("second"))
        .unwrap()
        .add(named("third"))
        .unwrap();

    assert_eq!(step_names(&runner), ["first", "second", "third", "last"]);
    let head = runner.labelled("head").unwrap();
    assert_eq!(runner.get(head).unwrap().step().name(), "third");
    let end = runner.end().unwrap();
    assert_eq!(runner.get(end).unwrap().step().name(), "last");
}

/// An explicit label stops the previous label from following.
#[test]
fn explicit_label_takes_over() {
    let mut runner = Runner::new();
    runner
        .add(Registration::new(named("x")).label("a"))
        .unwrap();
    runner
        .at("a")
        .unwrap()
        .add(Registration::new(named("y")).label("b"))
        .unwrap()
        .add(named("z"))
        .unwrap();

    assert_eq!(step_names(&runner), ["x", "y", "z"]);
    assert_eq!(
        point_labels(&runner),
        [vec!["a".to_string()], Vec::new(), vec!["b".to_string()]]
    );
}

/// Reusing a label fails and names the point that owns it.
#[test]
fn duplicate_label_names_owner() {
    let mut runner = Runner::new();
    runner
        .add(Registration::new(named("owner")).label("a"))
        .unwrap();

    let error = runner
        .add(Registration::new(named("intruder")).label("a"))
        .unwrap_err();
    match error {
        ChainError::DuplicateLabel { label, owner } => {
            assert_eq!(label, "a");
            assert!(owner.starts_with("owner"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(runner.len(), 1);
}

/// Unknown labels and labelling an empty chain are errors.
#[test]
fn label_errors() {
    let mut runner = Runner::new();
    assert!(matches!(runner.at("nope"), Err(ChainError::UnknownLabel(_))));
    assert!(matches!(runner.add_label("tail"), Err(ChainError::EmptyChain(_))));

    runner.add(named("only")).unwrap();
    runner.add_label("tail").unwrap();
    runner.add_label("tail").unwrap();
    assert_eq!(runner.labels(), ["tail"]);
}

/// Points record the labels of the modifier they were inserted through.
#[test]
fn provenance_is_recorded() {
    let mut runner = Runner::new();
    runner
        .add(Registration::new(named("base")).label("ext"))
        .unwrap();
    runner.at("ext").unwrap().add(named("plugin")).unwrap();
    runner.add(named("tail")).unwrap();

    let provenance: Vec<Vec<&str>> = runner
        .points()
        .map(|point| point.added_using().collect())
        .collect();
    assert_eq!(provenance, [vec![], vec!["ext"], vec![]]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLONING
// ═══════════════════════════════════════════════════════════════════════════════

/// Clones are structurally independent of their source.
#[test]
fn clone_is_independent() {
    let mut original = Runner::new();
    original
        .add(Registration::new(named("a")).label("mid"))
        .unwrap();

    let mut copy = original.clone();
    copy.add(named("copy_only")).unwrap();
    copy.at("mid").unwrap().add(named("copy_mid")).unwrap();
    original.add(named("original_only")).unwrap();

    assert_eq!(step_names(&original), ["a", "original_only"]);
    assert_eq!(step_names(&copy), ["a", "copy_mid", "copy_only"]);
    let mid = original.labelled("mid").unwrap();
    assert_eq!(original.get(mid).unwrap().step().name(), "a");
}

/// Clone ranges honour their bounds and inclusivity flags.
#[test]
fn clone_range_bounds() {
    let mut runner = Runner::new();
    for name in ["a", "b", "c", "d"] {
        runner
            .add(Registration::new(named(name)).label(name))
            .unwrap();
    }

    let middle = runner
        .clone_range(&CloneRange::new().start("a").end("d"))
        .unwrap();
    assert_eq!(step_names(&middle), ["b", "c"]);
    assert_eq!(middle.labels(), ["b", "c"]);

    let inclusive = runner
        .clone_range(
            &CloneRange::new()
                .start("b")
                .include_start(true)
                .end("c")
                .include_end(true),
        )
        .unwrap();
    assert_eq!(step_names(&inclusive), ["b", "c"]);

    let tail = runner.clone_range(&CloneRange::new().start("c")).unwrap();
    assert_eq!(step_names(&tail), ["d"]);
}

/// A range whose end precedes its start is empty.
#[test]
fn inverted_range_is_empty() {
    let mut runner = Runner::new();
    runner
        .add(Registration::new(named("a")).label("a"))
        .unwrap();
    runner
        .add(Registration::new(named("b")).label("b"))
        .unwrap();

    let clone = runner
        .clone_range(&CloneRange::new().start("b").end("a").include_start(true))
        .unwrap();
    assert!(clone.is_empty());
    assert!(clone.labels().is_empty());
}

/// Clone ranges can be filtered by provenance.
#[test]
fn clone_range_by_provenance() {
    let mut runner = Runner::new();
    runner
        .add(Registration::new(named("core")).label("hooks"))
        .unwrap();
    runner
        .at("hooks")
        .unwrap()
        .add(named("hook1"))
        .unwrap()
        .add(named("hook2"))
        .unwrap();
    runner.add(named("after")).unwrap();

    let hooks = runner
        .clone_range(&CloneRange::new().added_using("hooks"))
        .unwrap();
    assert_eq!(step_names(&hooks), ["hook1", "hook2"]);
}

/// Unknown range labels are reported.
#[test]
fn clone_range_unknown_label() {
    let runner = Runner::new();
    let error = runner
        .clone_range(&CloneRange::new().start("missing"))
        .unwrap_err();
    assert!(matches!(error, ChainError::UnknownLabel(label) if label == "missing"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPOSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Adding one runner to another copies its points.
#[test]
fn runners_concatenate() {
    let log = CallLog::default();
    let mut first = Runner::new();
    first.add(logging_step(&log, "one")).unwrap();
    let mut second = Runner::new();
    second
        .add(Registration::new(logging_step(&log, "two")).label("two"))
        .unwrap();

    let combined = (&first + &second).unwrap();
    assert_eq!(step_names(&combined), ["one", "two"]);
    assert!(combined.labelled("two").is_some());
    assert_eq!(first.len(), 1);

    combined.run().unwrap();
    assert_eq!(log.entries(), ["one", "two"]);

    first.extend([Chainable::from(&second)]).unwrap();
    assert_eq!(step_names(&first), ["one", "two"]);
}

/// Combining runners that share a label fails without changing either.
#[test]
fn concat_label_collision() {
    let mut first = Runner::new();
    first.add(Registration::new(named("a")).label("x")).unwrap();
    let mut second = Runner::new();
    second
        .add(Registration::new(named("b")).label("x"))
        .unwrap();

    assert!(matches!(
        first.add_runner(&second),
        Err(ChainError::DuplicateLabel { .. })
    ));
    assert_eq!(step_names(&first), ["a"]);
}

/// Lazy providers for the same key cannot be combined.
#[test]
fn lazy_provider_collision() {
    let provide = |name: &str| {
        Registration::new(named(name)).returns(ReturnsDeclaration::single("conn"))
    };
    let mut first = Runner::new();
    first.add_lazy(provide("primary")).unwrap();
    let mut second = Runner::new();
    second.add_lazy(provide("replica")).unwrap();

    match (&first + &second).unwrap_err() {
        ChainError::LazyProviderCollision {
            key,
            existing,
            incoming,
        } => {
            assert_eq!(key, ResourceKey::name("conn"));
            assert_eq!(existing, "primary");
            assert_eq!(incoming, "replica");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        first.add_lazy(provide("again")),
        Err(ChainError::LazyProviderCollision { .. })
    ));
}

/// Lazy steps must name the key they provide.
#[test]
fn lazy_needs_single_key() {
    let mut runner = Runner::new();
    let error = runner.add_lazy(named("vague")).unwrap_err();
    assert!(matches!(error, ChainError::LazyNeedsKey { step } if step == "vague"));
    assert_eq!(runner.lazy_keys().count(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPLACEMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Replacement keeps position and labels, matching by identity.
#[test]
fn replace_in_place() {
    let target = named("target");
    let lookalike = named("target");
    let mut runner = Runner::new();
    runner.add(named("before")).unwrap();
    runner
        .add(Registration::new(target.clone()).label("slot"))
        .unwrap();
    runner.add(lookalike).unwrap();
    runner.add(target.clone()).unwrap();

    let replacement = named("replacement");
    let count = runner.replace(
        &target,
        &replacement,
        DeclarationSource::Original,
        DeclarationSource::Original,
    );

    assert_eq!(count, 2);
    assert_eq!(
        step_names(&runner),
        ["before", "replacement", "target", "replacement"]
    );
    let slot = runner.labelled("slot").unwrap();
    assert_eq!(runner.get(slot).unwrap().step().name(), "replacement");
    let end = runner.end().unwrap();
    assert_eq!(runner.get(end).unwrap().step().name(), "replacement");
}

/// Declarations come from the source chosen for each.
#[test]
fn replace_declaration_sources() {
    struct Input;

    let original = named("original").returns(ReturnsDeclaration::Ignore);
    let replacement = named("replacement")
        .requires(Requirement::of::<Input>())
        .returns(ReturnsDeclaration::single("out"));

    let mut runner = Runner::new();
    runner.add(original.clone()).unwrap();
    runner.replace(
        &original,
        &replacement,
        DeclarationSource::Replacement,
        DeclarationSource::Original,
    );

    let point = runner.points().next().unwrap();
    assert_eq!(point.requirements().len(), 1);
    assert_eq!(point.returns(), &ReturnsDeclaration::Ignore);
}

/// Runners render one point per line.
#[test]
fn display_lists_points() {
    let mut runner = Runner::new();
    assert_eq!(runner.to_string(), "<Runner></Runner>");

    runner
        .add(Registration::new(named("a")).label("start"))
        .unwrap();
    runner
        .add(named("b").returns(ReturnsDeclaration::Ignore))
        .unwrap();
    assert_eq!(
        runner.to_string(),
        "<Runner>\n    a requires() returns(<inferred>) <-- start\n    b requires() returns(<ignored>)\n</Runner>"
    );
}
