//! Testing utilities for Folio workspace
//!
//! Shared fixtures, recording observers, and assertions.

#![allow(missing_docs)]

use folio_model::{BridgeEvent, ChangeKind, ObservationContext, TreeModelEvent, TreeObserver};
use folio_repo::{InMemoryRepository, ItemPath};
use parking_lot::Mutex;
use std::sync::Arc;

/// Content tree shared by model and CLI tests
pub const SAMPLE_FIXTURE: &str = r"
children:
  - name: content
    type: hippostd:folder
    properties:
      hippo:name: Content
    children:
      - name: documents
        type: hippostd:folder
        children:
          - name: news
            type: hippostd:folder
            children:
              - name: launch
                type: hippo:handle
          - name: events
            type: hippostd:folder
      - name: by-tag
        projection_of: /content/documents
      - name: search
        virtual: true
      - name: scratch
        projectable: false
";

pub fn path(s: &str) -> ItemPath {
    s.parse().unwrap()
}

pub fn sample_repository() -> Arc<InMemoryRepository> {
    Arc::new(InMemoryRepository::from_yaml(SAMPLE_FIXTURE).unwrap())
}

/// Route `tracing` output through the test harness; safe to call repeatedly
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("folio=debug")
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<TreeModelEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<TreeModelEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn kinds(&self) -> Vec<ChangeKind> {
        self.events.lock().iter().map(TreeModelEvent::kind).collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| event.path().to_string())
            .collect()
    }
}

impl TreeObserver for RecordingObserver {
    fn on_tree_event(&self, event: &TreeModelEvent) {
        self.events.lock().push(event.clone());
    }
}

#[derive(Debug, Default)]
pub struct RecordingContext {
    batches: Mutex<Vec<Vec<BridgeEvent>>>,
}

impl RecordingContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn batches(&self) -> Vec<Vec<BridgeEvent>> {
        self.batches.lock().clone()
    }

    pub fn events(&self) -> Vec<BridgeEvent> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

impl ObservationContext for RecordingContext {
    fn notify_observers(&self, events: Vec<BridgeEvent>) {
        self.batches.lock().push(events);
    }
}

pub fn assert_kinds(observer: &RecordingObserver, expected: &[ChangeKind]) {
    assert_eq!(observer.kinds(), expected, "unexpected change kinds");
}
