//! A full run wired from the reference adapters.

use edrr_application::{Agent, EdrrCoordinator, MemoryStore};
use edrr_domain::{CycleTask, MemoryKey, RecordKind};
use edrr_infrastructure::{
    ConfigLoader, InMemoryStore, JsonlAuditLogger, KeywordAgent, TaskPhaseHandler,
};
use std::sync::Arc;

#[tokio::test]
async fn reference_adapters_run_a_cycle_tree() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");

    let (config, issues) = ConfigLoader::load_defaults().to_edrr_config();
    assert!(issues.is_empty());

    let stores = InMemoryStore::standard_set();
    let agents: Vec<Arc<dyn Agent>> = vec![
        Arc::new(KeywordAgent::new("architect").with_expertise(["design"]).with_weight(2.0)),
        Arc::new(KeywordAgent::new("tester").with_expertise(["test"])),
    ];
    let coordinator = EdrrCoordinator::new(
        config,
        Arc::new(TaskPhaseHandler::new()),
        agents,
        stores
            .iter()
            .map(|s| Arc::new(s.clone()) as Arc<dyn MemoryStore>)
            .collect(),
    )
    .with_audit(Arc::new(JsonlAuditLogger::open(&audit_path).unwrap()));

    let task = CycleTask::new("root", "design and test the cache")
        .with_subtask(CycleTask::new("eviction", "design the eviction policy"));
    let report = coordinator.run(task).await.unwrap();

    assert!(report.all_completed());
    assert_eq!(report.cycles.len(), 2);
    assert_eq!(report.decisions[0].selected_option(), Some("design"));

    let summary = MemoryKey::new(None, "root", RecordKind::CycleSummary);
    for store in &stores {
        assert!(store.read(&summary).await.unwrap().is_some(), "{}", store.kind());
    }

    drop(coordinator);
    let audit = std::fs::read_to_string(&audit_path).unwrap();
    assert!(audit.lines().any(|l| l.contains("\"type\":\"cycle_completed\"")));
    assert!(audit.lines().any(|l| l.contains("\"type\":\"micro_cycle_spawned\"")));
}
