//! Unit tests for the project registry.

use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn registry() -> ProjectRegistry {
    let registry = ProjectRegistry::default();
    assert!(registry.track(Utf8Path::new("/work")));
    assert!(registry.track(Utf8Path::new("/work/nested")));
    registry
}

#[rstest]
fn tracking_twice_is_rejected(registry: ProjectRegistry) {
    assert!(!registry.track(Utf8Path::new("/work")));
    assert_eq!(
        registry.roots(),
        vec![Utf8PathBuf::from("/work"), Utf8PathBuf::from("/work/nested")]
    );
}

#[rstest]
fn lookup_reflects_snapshot_state(registry: ProjectRegistry) {
    let root = Utf8Path::new("/work");
    assert_eq!(registry.lookup(Utf8Path::new("/elsewhere")), Lookup::Untracked);
    assert_eq!(registry.lookup(root), Lookup::Pending);
    assert!(!registry.has_snapshot(root));

    let project = IndexedProject::new("/work", vec![String::from("/work/a.txt")]);
    registry.install(root, project.clone());

    assert_eq!(registry.lookup(root), Lookup::Ready(Arc::new(project)));
    assert!(registry.has_snapshot(root));
}

#[rstest]
fn install_replaces_whole_snapshot(registry: ProjectRegistry) {
    let root = Utf8Path::new("/work");
    registry.install(root, IndexedProject::new("/work", vec![String::from("/work/a")]));
    registry.install(root, IndexedProject::new("/work", vec![String::from("/work/b")]));
    let Lookup::Ready(project) = registry.lookup(root) else {
        panic!("snapshot expected");
    };
    assert_eq!(project.paths(), [String::from("/work/b")]);
}

#[rstest]
fn install_for_untracked_root_is_ignored(registry: ProjectRegistry) {
    let root = Utf8Path::new("/other");
    registry.install(root, IndexedProject::new("/other", Vec::new()));
    assert_eq!(registry.lookup(root), Lookup::Untracked);
}

#[rstest]
#[case::nested_wins("/work/nested/file.rs", Some("/work/nested"))]
#[case::outer("/work/src/lib.rs", Some("/work"))]
#[case::prefix_is_not_enough("/workshop/file", None)]
#[case::outside("/tmp/file", None)]
fn owning_root_is_most_specific(
    registry: ProjectRegistry,
    #[case] path: &str,
    #[case] expected: Option<&str>,
) {
    assert_eq!(
        registry.owning_root(Utf8Path::new(path)),
        expected.map(Utf8PathBuf::from)
    );
}

#[rstest]
#[case::plain("/tmp/proj", Ok("/tmp/proj"))]
#[case::trailing_slash("/tmp/proj/", Ok("/tmp/proj"))]
#[case::dot_segments("/tmp/./proj", Ok("/tmp/proj"))]
#[case::doubled("/tmp//proj", Ok("/tmp/proj"))]
#[case::empty("", Err("path must not be empty"))]
#[case::relative("proj", Err("path must be absolute"))]
fn roots_are_normalised(#[case] input: &str, #[case] expected: Result<&str, &str>) {
    assert_eq!(
        normalise_root(input).map(Utf8PathBuf::into_string),
        expected.map(str::to_owned)
    );
}

#[test]
fn state_names_are_lowercase() {
    assert_eq!(ProjectState::Indexing.to_string(), "indexing");
    assert_eq!(ProjectState::Ready.to_string(), "ready");
}
