//! End-to-end discovery tests: provider initialization through watcher
//! change delivery, across both config domains.

use std::fs;
use std::sync::Arc;

use config_discovery::prelude::*;
use config_discovery::watch::SubscriptionHandle;
use parking_lot::Mutex;
use tempfile::TempDir;

struct Harness {
    root: TempDir,
    provider: ConfigProvider,
    pipeline: Arc<DirectoryWatcher>,
    instance: Arc<DirectoryWatcher>,
}

fn harness() -> Harness {
    let root = TempDir::new().unwrap();
    let pipeline = Arc::new(DirectoryWatcher::new(ConfigDomain::Pipeline));
    let instance = Arc::new(DirectoryWatcher::new(ConfigDomain::Instance));
    let provider = ConfigProvider::new(
        Arc::new(StaticSettings::new(root.path())),
        pipeline.clone(),
        instance.clone(),
    );
    Harness {
        root,
        provider,
        pipeline,
        instance,
    }
}

fn collect(watcher: &DirectoryWatcher) -> (Arc<Mutex<Vec<ChangeBatch>>>, SubscriptionHandle) {
    let batches = Arc::new(Mutex::new(Vec::new()));
    let sink = batches.clone();
    let handle = watcher.subscribe(move |batch| sink.lock().push(batch.clone()));
    (batches, handle)
}

#[tokio::test]
async fn initialize_then_drop_in_a_pipeline_config() {
    let h = harness();
    h.provider.initialize("default");

    let pipeline_dir = h.root.path().join("pipeline_config/default");
    let instance_dir = h.root.path().join("instance_config/default");
    assert!(pipeline_dir.is_dir());
    assert!(instance_dir.is_dir());

    let (pipeline_batches, _p) = collect(&h.pipeline);
    let (instance_batches, _i) = collect(&h.instance);

    fs::write(pipeline_dir.join("p1.yaml"), "inputs: []\n").unwrap();
    h.pipeline.reconcile().await;
    h.instance.reconcile().await;

    let pipeline_batches = pipeline_batches.lock();
    assert_eq!(pipeline_batches.len(), 1);
    assert_eq!(pipeline_batches[0].domain, ConfigDomain::Pipeline);
    assert_eq!(pipeline_batches[0].new, vec!["p1.yaml"]);
    assert!(instance_batches.lock().is_empty());
}

#[tokio::test]
async fn repeated_initialize_does_not_duplicate_sources_or_events() {
    let h = harness();
    h.provider.initialize("default");
    h.provider.initialize("default");
    h.provider.initialize("default");

    assert_eq!(h.pipeline.sources().len(), 1);
    assert_eq!(h.instance.sources().len(), 1);

    let (batches, _sub) = collect(&h.pipeline);
    let dir = h.provider.source_dir(ConfigDomain::Pipeline, "default");
    fs::write(dir.join("p1.yaml"), "inputs: []\n").unwrap();
    h.pipeline.reconcile().await;

    // One source, one batch. A duplicated registration would deliver the
    // same file twice.
    let batches = batches.lock();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].new.len(), 1);
}

#[tokio::test]
async fn distinct_suffixes_watch_distinct_directories() {
    let h = harness();
    h.provider.initialize("default");
    h.provider.initialize("canary");

    assert_eq!(h.pipeline.sources().len(), 2);
    assert_eq!(h.instance.sources().len(), 2);

    let (batches, _sub) = collect(&h.pipeline);
    let canary = h.provider.source_dir(ConfigDomain::Pipeline, "canary");
    fs::write(canary.join("c.yaml"), "inputs: []\n").unwrap();
    h.pipeline.reconcile().await;

    let batches = batches.lock();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].dir, canary.canonicalize().unwrap());
}

#[tokio::test]
async fn domains_deliver_independent_streams() {
    let h = harness();
    h.provider.initialize("default");

    let (pipeline_batches, _p) = collect(&h.pipeline);
    let (instance_batches, _i) = collect(&h.instance);

    let pipeline_dir = h.provider.source_dir(ConfigDomain::Pipeline, "default");
    let instance_dir = h.provider.source_dir(ConfigDomain::Instance, "default");
    fs::write(pipeline_dir.join("p.yaml"), "inputs: []\n").unwrap();
    fs::write(instance_dir.join("i.yaml"), "cpu_limit: 2\n").unwrap();

    h.pipeline.reconcile().await;
    h.instance.reconcile().await;

    assert_eq!(pipeline_batches.lock()[0].new, vec!["p.yaml"]);
    assert_eq!(instance_batches.lock()[0].new, vec!["i.yaml"]);
}

#[tokio::test]
async fn consumer_snapshot_read_matches_delivered_events() {
    let h = harness();
    h.provider.initialize("default");

    let dir = h.provider.source_dir(ConfigDomain::Instance, "default");
    fs::write(dir.join("limits.yaml"), "cpu_limit: 2\n").unwrap();
    fs::write(dir.join("net.yaml"), "max_conns: 16\n").unwrap();
    h.instance.reconcile().await;

    let names = h
        .instance
        .with_snapshot(&dir, |snap| {
            let mut names: Vec<_> = snap.keys().cloned().collect();
            names.sort();
            names
        })
        .unwrap();
    assert_eq!(names, vec!["limits.yaml", "net.yaml"]);
}
