//! End-to-end runs of the EDRR coordinator against in-test ports.

use async_trait::async_trait;
use edrr_application::{
    Agent, AgentError, AuditEvent, AuditLogger, CycleEvent, EdrrConfig, EdrrCoordinator,
    FlushOutcome, MemoryStore, PhaseHandler, PhaseHandlerError, StoreError,
};
use edrr_domain::{
    AgentId, Context, Critique, Cycle, CycleTask, MemoryKey, Phase, PhaseOutput, Proposal,
    RecordKind, TaskMetrics, TerminationReason, Vote, VotingMethod,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Asks for the task's subtasks during expand and logs every phase.
struct SubtaskHandler;

#[async_trait]
impl PhaseHandler for SubtaskHandler {
    async fn execute(
        &self,
        phase: Phase,
        cycle: &Cycle,
        _context: &Context,
    ) -> Result<PhaseOutput, PhaseHandlerError> {
        let mut output = PhaseOutput::new(format!("{}:{}", cycle.id(), phase))
            .with_field("log", json!([format!("{}@{}", cycle.task().id, phase)]));
        if phase == Phase::Expand {
            output.micro_tasks = cycle.task().subtasks.clone();
        }
        Ok(output)
    }
}

struct MockAgent {
    id: AgentId,
    option: String,
    weight: f64,
}

impl MockAgent {
    fn arc(id: &str, option: &str, weight: f64) -> Arc<dyn Agent> {
        Arc::new(Self {
            id: AgentId::new(id),
            option: option.to_string(),
            weight,
        })
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn expertise(&self) -> &[String] {
        &[]
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    async fn propose(&self, _task: &CycleTask, _context: &Context) -> Result<Proposal, AgentError> {
        Ok(Proposal::new(
            self.id.clone(),
            self.option.clone(),
            format!("approach {}", self.option),
        ))
    }

    async fn review(&self, _proposal: &Proposal) -> Result<Critique, AgentError> {
        Ok(Critique::new(["needs a benchmark"]))
    }

    async fn vote(&self, _options: &[String], _context: &Context) -> Result<Vote, AgentError> {
        Ok(Vote::new(self.id.clone(), self.option.clone(), "my own proposal"))
    }
}

/// Map-backed store that rejects cycle summaries when `fail_summaries` is set.
struct TestStore {
    name: String,
    data: Mutex<BTreeMap<MemoryKey, Value>>,
    fail_summaries: bool,
}

impl TestStore {
    fn arc(name: &str, fail_summaries: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            data: Mutex::new(BTreeMap::new()),
            fail_summaries,
        })
    }

    fn has(&self, key: &MemoryKey) -> bool {
        self.data.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl MemoryStore for TestStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, key: &MemoryKey) -> Result<Option<Value>, StoreError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn write(&self, key: &MemoryKey, value: Value) -> Result<(), StoreError> {
        if self.fail_summaries && key.kind == RecordKind::CycleSummary {
            return Err(StoreError::Rejected {
                store: self.name.clone(),
                key: key.to_string(),
                reason: "read-only".into(),
            });
        }
        self.data.lock().unwrap().insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &MemoryKey) -> Result<(), StoreError> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
struct CollectingAudit {
    events: Mutex<Vec<&'static str>>,
}

impl AuditLogger for CollectingAudit {
    fn log(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event.event_type);
    }
}

fn coordinator(config: EdrrConfig, agents: Vec<Arc<dyn Agent>>) -> EdrrCoordinator {
    EdrrCoordinator::new(config, Arc::new(SubtaskHandler), agents, vec![])
}

#[tokio::test]
async fn quality_sufficient_stops_recursion_below_depth_two() {
    let deepest = CycleTask::new("level-3", "polish the error messages")
        .with_metrics(TaskMetrics::default().with_quality(0.95));
    let task = CycleTask::new("root", "build an interpreter").with_subtask(
        CycleTask::new("level-1", "design the parser")
            .with_subtask(CycleTask::new("level-2", "write the lexer").with_subtask(deepest)),
    );

    let report = coordinator(EdrrConfig::default().with_max_depth(3), vec![])
        .run(task)
        .await
        .unwrap();

    assert_eq!(report.cycles.len(), 3);
    assert_eq!(report.max_depth(), 2);
    assert!(report.all_completed());
    assert_eq!(report.declined.len(), 1);
    assert_eq!(
        report.declined[0].decision.criterion,
        Some(TerminationReason::QualitySufficient)
    );
    assert_eq!(report.declined[0].task_id, "level-3");
    assert!(report.recursion_errors.is_empty());
    assert!(report.steps <= report.step_bound);
}

#[tokio::test]
async fn weighted_vote_through_a_full_run() {
    let agents = vec![
        MockAgent::arc("a1", "A", 3.0),
        MockAgent::arc("a2", "B", 2.0),
        MockAgent::arc("a3", "A", 1.0),
    ];
    let report = coordinator(EdrrConfig::default(), agents)
        .run(CycleTask::new("root", "choose a storage engine"))
        .await
        .unwrap();

    assert_eq!(report.decisions.len(), 1);
    let decision = &report.decisions[0];
    assert_eq!(decision.selected_option(), Some("A"));
    assert_eq!(decision.tallies.get("A"), Some(&4.0));
    assert_eq!(decision.tallies.get("B"), Some(&2.0));
    assert_eq!(decision.method, VotingMethod::Weighted);
    assert_eq!(report.final_context.get("decision").unwrap()["chosen"], json!("A"));
}

#[tokio::test]
async fn tie_is_resolved_by_synthesis() {
    let agents = vec![MockAgent::arc("a1", "A", 1.0), MockAgent::arc("a2", "B", 1.0)];
    let report = coordinator(EdrrConfig::default(), agents)
        .run(CycleTask::new("root", "pick a wire format"))
        .await
        .unwrap();

    let decision = &report.decisions[0];
    assert!(decision.is_synthesis());
    assert_eq!(decision.method, VotingMethod::ConsensusSynthesis);
    assert!(decision.tie_break);
    assert_eq!(decision.conflicting_options, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(decision.contributors, vec![AgentId::new("a1"), AgentId::new("a2")]);
}

#[tokio::test]
async fn failed_flush_rolls_back_every_store_and_the_run_proceeds() {
    let stores = [
        TestStore::arc("vector", false),
        TestStore::arc("graph", true),
        TestStore::arc("document", false),
    ];
    let coordinator = EdrrCoordinator::new(
        EdrrConfig::default(),
        Arc::new(SubtaskHandler),
        vec![],
        stores
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn MemoryStore>)
            .collect(),
    );

    let report = coordinator
        .run(CycleTask::new("root", "migrate the schema"))
        .await
        .unwrap();

    let outcomes: Vec<_> = report.sync.iter().map(|s| s.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            FlushOutcome::Committed,
            FlushOutcome::Committed,
            FlushOutcome::Committed,
            FlushOutcome::RolledBack,
        ]
    );
    assert!(report.all_completed());

    let committed = MemoryKey::in_phase(Phase::Refine, "root", RecordKind::PhaseResult);
    let rolled_back = MemoryKey::in_phase(Phase::Retrospect, "root", RecordKind::PhaseResult);
    let summary = MemoryKey::new(None, "root", RecordKind::CycleSummary);
    for store in &stores {
        assert!(store.has(&committed), "{}", store.name);
        assert!(!store.has(&rolled_back), "{}", store.name);
        assert!(!store.has(&summary), "{}", store.name);
    }
}

#[tokio::test]
async fn wide_tree_stays_within_step_bound() {
    fn tree(prefix: &str, levels: u32) -> CycleTask {
        let mut task = CycleTask::new(prefix, format!("work on {prefix}"));
        if levels > 0 {
            for i in 0..2 {
                task = task.with_subtask(tree(&format!("{prefix}.{i}"), levels - 1));
            }
        }
        task
    }

    let config = EdrrConfig::default().with_max_depth(2);
    let mut recursion = config.recursion.clone();
    recursion.max_micro_cycles_per_phase = 2;
    let report = coordinator(config.with_recursion(recursion), vec![])
        .run(tree("root", 3))
        .await
        .unwrap();

    assert_eq!(report.cycles.len(), 7);
    assert_eq!(report.max_depth(), 2);
    assert_eq!(report.recursion_errors.len(), 8);
    assert_eq!(report.steps, 7 * 5 + 6);
    assert_eq!(report.step_bound, 13 * 73);
    assert!(report.steps <= report.step_bound);
}

#[tokio::test]
async fn broken_hooks_do_not_stop_the_run() {
    let audit = Arc::new(CollectingAudit::default());
    let coordinator = coordinator(EdrrConfig::default(), vec![MockAgent::arc("a1", "A", 1.0)])
        .with_audit(audit.clone());
    coordinator.register_cycle_hook("explodes", |_: &CycleEvent| panic!("hook bug"));
    coordinator.register_cycle_hook("fails", |_: &CycleEvent| Err("unavailable".into()));
    coordinator
        .consensus()
        .register_decision_hook("fails", |_| Err("unavailable".into()));

    let report = coordinator
        .run(CycleTask::new("root", "tune the cache"))
        .await
        .unwrap();
    assert!(report.all_completed());

    let events = audit.events.lock().unwrap();
    for expected in ["cycle_started", "phase_completed", "decision", "memory_sync", "cycle_completed"] {
        assert!(events.contains(&expected), "missing {expected}");
    }
}

#[tokio::test]
async fn child_context_is_aggregated_into_parent() {
    let task = CycleTask::new("root", "ship the release")
        .with_subtask(CycleTask::new("notes", "write release notes").with_type("writing"));
    let report = coordinator(EdrrConfig::default(), vec![])
        .run(task)
        .await
        .unwrap();

    let results = report.final_context.get("micro_cycle_results").unwrap();
    assert_eq!(results[0]["task"], json!("notes"));
    assert_eq!(
        results[0]["result"]["log"],
        json!(["notes@expand", "notes@differentiate", "notes@refine", "notes@retrospect"])
    );
    assert_eq!(
        report.final_context.get("log").unwrap()[0],
        json!("root@expand")
    );
}
