//! Tree model observation tests
//!
//! Structural changes below the root reach observers in delivery order once
//! the owner processes the queue.

use folio_model::{ChangeKind, ModelError, NodeModel, ObservableTreeModel, ObservationError};
use folio_repo::{EventFilter, EventMask, ItemPath, RepoError, Repository};
use folio_test_utils::{
    assert_kinds, init_test_logging, path, sample_repository, RecordingContext, RecordingObserver,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn content_tree() -> (Arc<folio_repo::InMemoryRepository>, ObservableTreeModel) {
    init_test_logging();
    let repo = sample_repository();
    let root = NodeModel::from_path(repo.clone(), path("/content"));
    (repo, ObservableTreeModel::new(root))
}

#[test]
fn structural_events_reach_observers_in_order() {
    let (repo, mut tree) = content_tree();
    let observer = RecordingObserver::new();
    tree.subscribe(observer.clone());
    tree.start_observation().unwrap();

    repo.add_node(&path("/content/documents"), "a", "hippo:handle").unwrap();
    repo.move_node(&path("/content/documents/a"), &path("/content/documents/b"))
        .unwrap();
    repo.remove_node(&path("/content/documents/b")).unwrap();
    repo.sync();

    // Nothing is delivered until the owner drains the queue.
    assert_eq!(observer.count(), 0);
    assert_eq!(tree.process_pending(), 3);

    assert_kinds(
        &observer,
        &[ChangeKind::Added, ChangeKind::Moved, ChangeKind::Removed],
    );
    assert_eq!(
        observer.paths(),
        vec![
            "/content/documents/a",
            "/content/documents/b",
            "/content/documents/b"
        ]
    );
    assert!(observer
        .events()
        .iter()
        .all(|event| event.root == path("/content")));
}

#[test]
fn property_changes_are_not_observed() {
    let (repo, mut tree) = content_tree();
    let observer = RecordingObserver::new();
    tree.subscribe(observer.clone());
    tree.start_observation().unwrap();

    repo.set_property(&path("/content/documents"), "hippo:name", serde_json::json!("Docs"))
        .unwrap();
    repo.remove_property(&path("/content"), "hippo:name").unwrap();
    repo.sync();

    assert_eq!(tree.process_pending(), 0);
    assert_eq!(observer.count(), 0);
}

#[test]
fn changes_outside_root_are_not_observed() {
    let (repo, mut tree) = content_tree();
    let observer = RecordingObserver::new();
    tree.subscribe(observer.clone());
    tree.start_observation().unwrap();

    repo.add_node(&ItemPath::root(), "elsewhere", "hippostd:folder")
        .unwrap();
    repo.sync();

    assert_eq!(tree.process_pending(), 0);
}

#[test]
fn every_observer_sees_every_event() {
    let (repo, mut tree) = content_tree();
    let first = RecordingObserver::new();
    let second = RecordingObserver::new();
    tree.subscribe(first.clone());
    let second_id = tree.subscribe(second.clone());
    tree.start_observation().unwrap();

    repo.add_node(&path("/content"), "x", "hippostd:folder").unwrap();
    repo.sync();
    tree.process_pending();

    tree.unsubscribe(second_id);
    repo.add_node(&path("/content"), "y", "hippostd:folder").unwrap();
    repo.sync();
    tree.process_pending();

    assert_eq!(first.count(), 2);
    assert_eq!(second.count(), 1);
}

#[test]
fn stop_observation_ends_delivery() {
    let (repo, mut tree) = content_tree();
    let observer = RecordingObserver::new();
    tree.subscribe(observer.clone());
    tree.start_observation().unwrap();
    tree.stop_observation();

    repo.add_node(&path("/content"), "late", "hippostd:folder").unwrap();
    repo.sync();

    assert_eq!(tree.process_pending(), 0);
    assert_eq!(repo.listener_count(), 0);
}

#[test]
fn session_loss_ends_observation() {
    let (repo, mut tree) = content_tree();
    tree.start_observation().unwrap();
    repo.invalidate_session();
    repo.sync();
    assert!(!tree.is_observing());

    // The session is gone, so the new registration fails.
    assert!(matches!(
        tree.start_observation(),
        Err(ModelError::Observation(ObservationError::Repository(
            RepoError::SessionInvalid
        )))
    ));
}

#[test]
fn lookup_returns_full_chain() {
    let (repo, tree) = content_tree();
    let target = NodeModel::from_path(repo.clone(), path("/content/documents/news/launch"));

    let tree_path = tree.lookup(&target).unwrap().unwrap();
    let names: Vec<String> = tree_path
        .iter()
        .map(|node| node.identity().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "/content",
            "/content/documents",
            "/content/documents/news",
            "/content/documents/news/launch"
        ]
    );
    assert!(!tree_path.last().is_virtual());
    assert!(NodeModel::from_path(repo, path("/content/by-tag")).is_virtual());
}

#[test]
fn lookup_by_identifier() {
    let (repo, tree) = content_tree();
    let handle = repo
        .add_node(&path("/content/documents/events"), "fair", "hippo:handle")
        .unwrap();

    let target = NodeModel::from_id(repo.clone(), handle.id).unwrap();
    let tree_path = tree.lookup(&target).unwrap().unwrap();
    assert_eq!(tree_path.len(), 4);
    assert_eq!(tree_path.last().item().id(), Some(handle.id));
    assert_eq!(
        tree_path.last(),
        &NodeModel::from_path(repo, path("/content/documents/events/fair"))
    );
}

#[test]
fn lookup_follows_a_moved_identifier_root() {
    init_test_logging();
    let repo = sample_repository();
    let documents = repo.node_by_path(&path("/content/documents")).unwrap().unwrap();
    let root = NodeModel::from_id(repo.clone(), documents.id).unwrap();
    let tree = ObservableTreeModel::new(root);

    repo.move_node(&path("/content/documents"), &path("/documents"))
        .unwrap();

    let target = NodeModel::from_path(repo.clone(), path("/documents/news"));
    let tree_path = tree.lookup(&target).unwrap().unwrap();
    assert_eq!(tree_path.len(), 2);
    assert_eq!(tree_path.last(), &target);

    let stale = NodeModel::from_path(repo, path("/content/documents/news"));
    assert!(tree.lookup(&stale).unwrap().is_none());
}

#[test]
fn moving_a_node_out_of_the_root_is_observed() {
    init_test_logging();
    let repo = sample_repository();
    let root = NodeModel::from_path(repo.clone(), path("/content/documents"));
    let mut tree = ObservableTreeModel::new(root.clone());
    let observer = RecordingObserver::new();
    tree.subscribe(observer.clone());
    assert_eq!(tree.children(&root).unwrap().len(), 2);
    tree.start_observation().unwrap();

    repo.move_node(&path("/content/documents/news"), &path("/content/news"))
        .unwrap();
    repo.sync();

    assert_eq!(tree.process_pending(), 1);
    assert_kinds(&observer, &[ChangeKind::Moved]);
    assert_eq!(observer.paths(), vec!["/content/news"]);
    assert_eq!(
        observer.events()[0].event.raw.moved_from,
        Some(path("/content/documents/news"))
    );

    let children = tree.children(&root).unwrap();
    assert_eq!(
        children,
        vec![NodeModel::from_path(repo, path("/content/documents/events"))]
    );
}

#[test]
fn removing_the_root_is_observed() {
    let (repo, mut tree) = content_tree();
    let observer = RecordingObserver::new();
    tree.subscribe(observer.clone());
    tree.start_observation().unwrap();

    repo.remove_node(&path("/content")).unwrap();
    repo.sync();

    assert_eq!(tree.process_pending(), 1);
    assert_kinds(&observer, &[ChangeKind::Removed]);
    assert_eq!(observer.paths(), vec!["/content"]);
    assert!(tree.children(tree.root()).unwrap().is_empty());
}

#[test]
fn adapter_batches_preserve_write_order() {
    let repo = sample_repository();
    let context = RecordingContext::new();
    let mut adapter = folio_model::EventListenerAdapter::new(repo.clone());
    adapter
        .start(
            context.clone(),
            EventFilter::new(EventMask::ALL, path("/content"), true),
        )
        .unwrap();

    for i in 0..20 {
        repo.add_node(&path("/content/documents"), &format!("d{i}"), "hippo:handle")
            .unwrap();
    }
    repo.sync();
    adapter.stop();

    let paths: Vec<String> = context
        .events()
        .iter()
        .map(|event| event.path.to_string())
        .collect();
    let expected: Vec<String> = (0..20)
        .map(|i| format!("/content/documents/d{i}"))
        .collect();
    assert_eq!(paths, expected);
    assert_eq!(context.batches().len(), 20);
}
