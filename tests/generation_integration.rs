//! End-to-end generation tests with mock strategies and models.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use synthset::{
    CompletionRequest, CompletionResponse, DataRow, Distribution, DocumentNode, DocumentStore,
    Evolution, EvolutionDeps, EvolutionError, GenerationError, GenerationEvent, GenerationModel,
    InMemoryDocumentStore, LlmError, NodeContext, RunConfig, TelemetrySink, TestsetGenerator,
};

struct EchoModel;

#[async_trait]
impl GenerationModel for EchoModel {
    fn id(&self) -> &str {
        "echo"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: "ok".into(),
            model: "echo".into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }
}

enum Behavior {
    Row { delay_ms: u64 },
    Filtered,
    Fail,
}

struct MockEvolution {
    name: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockEvolution {
    fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Evolution for MockEvolution {
    fn name(&self) -> &str {
        self.name
    }

    fn configure(&self, _deps: EvolutionDeps) {}

    async fn evolve(&self, context: NodeContext) -> Result<Option<DataRow>, EvolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = match self.behavior {
            Behavior::Row { delay_ms } => {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Ok(Some(DataRow {
                    question: context.root.id.clone(),
                    contexts: context.context_texts(),
                    ground_truth: "truth".into(),
                    evolution_type: self.name.into(),
                }))
            }
            Behavior::Filtered => Ok(None),
            Behavior::Fail => Err(EvolutionError::Execution("boom".into())),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn corpus(n: usize) -> Vec<DocumentNode> {
    (0..n)
        .map(|i| DocumentNode::new(format!("n{i}"), format!("content of node {i}")))
        .collect()
}

fn generator(nodes: Vec<DocumentNode>, seed: u64) -> TestsetGenerator {
    TestsetGenerator::new(
        Arc::new(EchoModel),
        Arc::new(EchoModel),
        Arc::new(InMemoryDocumentStore::with_seed(nodes, seed)),
    )
}

fn seeded_config() -> RunConfig {
    // Log output is handy when a property test fails; ignore the error
    // when another test already installed the subscriber.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    RunConfig {
        seed: Some(17),
        ..RunConfig::default()
    }
}

#[tokio::test]
async fn test_rows_follow_weighted_partition() {
    let a = MockEvolution::new("a", Behavior::Row { delay_ms: 0 });
    let b = MockEvolution::new("b", Behavior::Row { delay_ms: 0 });
    let c = MockEvolution::new("c", Behavior::Row { delay_ms: 0 });
    let distribution = Distribution::new()
        .push(a.clone() as Arc<dyn Evolution>, 0.5)
        .push(b.clone() as Arc<dyn Evolution>, 0.25)
        .push(c.clone() as Arc<dyn Evolution>, 0.25);

    let generator = generator(corpus(10), 3);
    let dataset = generator
        .generate(10, &distribution, &seeded_config())
        .await
        .unwrap();

    assert_eq!(dataset.len(), 10);
    assert_eq!(a.calls.load(Ordering::SeqCst), 5);
    assert_eq!(b.calls.load(Ordering::SeqCst), 3);
    assert_eq!(c.calls.load(Ordering::SeqCst), 2);

    let simple_rows = dataset
        .test_data
        .iter()
        .filter(|row| row.evolution_type == "a")
        .count();
    assert_eq!(simple_rows, 5);
}

#[tokio::test]
async fn test_concurrency_stays_within_unit_size() {
    let evolution = MockEvolution::new("slow", Behavior::Row { delay_ms: 30 });
    let distribution = Distribution::new().push(evolution.clone() as Arc<dyn Evolution>, 1.0);

    let config = RunConfig {
        max_concurrency: 3,
        seed: Some(17),
        ..RunConfig::default()
    };
    let generator = generator(corpus(9), 5);
    let dataset = generator.generate(9, &distribution, &config).await.unwrap();

    assert_eq!(dataset.len(), 9);
    assert_eq!(evolution.calls.load(Ordering::SeqCst), 9);
    assert!(evolution.peak_in_flight.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn test_fail_fast_aborts_before_later_units() {
    let failing = MockEvolution::new("failing", Behavior::Fail);
    let distribution = Distribution::new().push(failing.clone() as Arc<dyn Evolution>, 1.0);

    let generator = generator(corpus(12), 9);
    let err = generator
        .generate(12, &distribution, &seeded_config())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Evolution(_)));
    // Only the first unit (10 tasks) ever started.
    assert!(failing.calls.load(Ordering::SeqCst) <= 10);
}

#[tokio::test]
async fn test_tolerant_mode_keeps_surviving_rows() {
    let ok = MockEvolution::new("ok", Behavior::Row { delay_ms: 0 });
    let bad = MockEvolution::new("bad", Behavior::Fail);
    let distribution = Distribution::new()
        .push(ok.clone() as Arc<dyn Evolution>, 0.5)
        .push(bad.clone() as Arc<dyn Evolution>, 0.5);

    let config = RunConfig {
        raise_exceptions: false,
        seed: Some(17),
        ..RunConfig::default()
    };
    let generator = generator(corpus(10), 21);
    let dataset = generator.generate(10, &distribution, &config).await.unwrap();

    assert_eq!(dataset.len(), 5);
    assert!(dataset
        .test_data
        .iter()
        .all(|row| row.evolution_type == "ok"));
}

#[tokio::test]
async fn test_all_rows_filtered_is_fatal() {
    let filtered = MockEvolution::new("filtered", Behavior::Filtered);
    let distribution = Distribution::new().push(filtered as Arc<dyn Evolution>, 1.0);

    let generator = generator(corpus(5), 2);
    let err = generator
        .generate(5, &distribution, &seeded_config())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::EmptyTestset));
}

#[tokio::test]
async fn test_insufficient_corpus_is_fatal() {
    let ok = MockEvolution::new("ok", Behavior::Row { delay_ms: 0 });
    let distribution = Distribution::new().push(ok as Arc<dyn Evolution>, 1.0);

    let generator = generator(corpus(3), 2);
    let err = generator
        .generate(10, &distribution, &seeded_config())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::InsufficientCorpus { .. }));
}

#[tokio::test]
async fn test_rows_preserve_assignment_order_despite_delays() {
    // Two stores with the same seed sample the same contexts, so the
    // expected order can be precomputed. Delays vary per node to force
    // out-of-order completion inside each unit.
    let nodes = corpus(6);
    let probe = InMemoryDocumentStore::with_seed(nodes.clone(), 33);
    let expected: Vec<String> = probe
        .sample(6, None)
        .unwrap()
        .into_iter()
        .map(|context| context.root.id)
        .collect();

    struct JitterEvolution;

    #[async_trait]
    impl Evolution for JitterEvolution {
        fn name(&self) -> &str {
            "jitter"
        }

        fn configure(&self, _deps: EvolutionDeps) {}

        async fn evolve(&self, context: NodeContext) -> Result<Option<DataRow>, EvolutionError> {
            let digit = context
                .root
                .id
                .trim_start_matches('n')
                .parse::<u64>()
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis((6 - digit) * 15)).await;
            Ok(Some(DataRow {
                question: context.root.id.clone(),
                contexts: context.context_texts(),
                ground_truth: "truth".into(),
                evolution_type: "jitter".into(),
            }))
        }
    }

    let distribution = Distribution::new().push(Arc::new(JitterEvolution) as Arc<dyn Evolution>, 1.0);
    let generator = generator(nodes, 33);
    let dataset = generator
        .generate(6, &distribution, &seeded_config())
        .await
        .unwrap();

    let actual: Vec<String> = dataset
        .test_data
        .into_iter()
        .map(|row| row.question)
        .collect();
    assert_eq!(actual, expected);
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<GenerationEvent>>,
}

impl TelemetrySink for RecordingSink {
    fn track(&self, event: GenerationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[tokio::test]
async fn test_telemetry_emitted_once_per_run() {
    let ok = MockEvolution::new("ok", Behavior::Row { delay_ms: 0 });
    let distribution = Distribution::new().push(ok as Arc<dyn Evolution>, 1.0);

    let sink = Arc::new(RecordingSink::default());
    let generator = generator(corpus(4), 8).with_telemetry(sink.clone());
    generator
        .generate(4, &distribution, &seeded_config())
        .await
        .unwrap();

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].evolution_names, vec!["ok"]);
    assert_eq!(events[0].evolution_percentages, vec![1.0]);
    assert_eq!(events[0].num_rows, 4);
    assert_eq!(events[0].language, "english");
}

#[tokio::test]
async fn test_generate_with_nodes_ingests_then_generates() {
    let ok = MockEvolution::new("ok", Behavior::Row { delay_ms: 0 });
    let distribution = Distribution::new().push(ok as Arc<dyn Evolution>, 1.0);

    // Store starts empty; the nodes arrive with the call.
    let generator = generator(Vec::new(), 4);
    let dataset = generator
        .generate_with_nodes(corpus(5), 5, &distribution, &seeded_config())
        .await
        .unwrap();
    assert_eq!(dataset.len(), 5);
}

#[tokio::test]
async fn test_strategies_are_reusable_across_runs() {
    // configure is idempotent, so the same distribution instance can
    // drive consecutive runs.
    let ok = MockEvolution::new("ok", Behavior::Row { delay_ms: 0 });
    let distribution = Distribution::new().push(ok.clone() as Arc<dyn Evolution>, 1.0);

    let generator = generator(corpus(6), 13);
    let first = generator
        .generate(3, &distribution, &seeded_config())
        .await
        .unwrap();
    let second = generator
        .generate(3, &distribution, &seeded_config())
        .await
        .unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert_eq!(ok.calls.load(Ordering::SeqCst), 6);
}

/// Replays canned completions keyed on distinctive prompt phrases, so
/// the built-in evolutions run their full filter/generate path.
struct ScriptedModel;

#[async_trait]
impl GenerationModel for ScriptedModel {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request.prompt;
        let content = if prompt.contains("Rate how suitable") {
            "4.5"
        } else if prompt.contains("answerable from supporting documentation") {
            "yes"
        } else if prompt.contains("genuinely deeper question") {
            "yes"
        } else if prompt.contains("multi-step") {
            "Why does the retry budget interact with the unit boundary?"
        } else if prompt.contains("both context fragments") {
            "How does the scheduler relate to the executor unit size?"
        } else if prompt.contains("Write one exam question") {
            "What bounds the number of concurrent model calls?"
        } else if prompt.contains("Answer the question strictly") {
            "The execution unit size bounds them."
        } else {
            return Err(LlmError::InvalidRequest(format!(
                "unscripted prompt: {prompt}"
            )));
        };
        Ok(CompletionResponse {
            content: content.into(),
            model: "scripted".into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }
}

#[tokio::test]
async fn test_builtin_evolutions_full_path() {
    let nodes: Vec<DocumentNode> = (0..4)
        .map(|i| {
            DocumentNode::new(format!("n{i}"), format!("chunk {i} about schedulers"))
                .with_keyphrases(vec!["scheduler".into()])
                .with_embedding(vec![1.0, i as f32 * 0.1])
        })
        .collect();

    let model = Arc::new(ScriptedModel);
    let generator = TestsetGenerator::new(
        model.clone(),
        model,
        Arc::new(InMemoryDocumentStore::with_seed(nodes, 12)),
    );

    let dataset = generator
        .generate(4, &Distribution::default_mix(), &seeded_config())
        .await
        .unwrap();

    assert_eq!(dataset.len(), 4);
    let count = |name: &str| {
        dataset
            .test_data
            .iter()
            .filter(|row| row.evolution_type == name)
            .count()
    };
    assert_eq!(count("simple"), 2);
    assert_eq!(count("reasoning"), 1);
    assert_eq!(count("multi_context"), 1);

    // Multi-context rows accumulated a second supporting chunk.
    let multi = dataset
        .test_data
        .iter()
        .find(|row| row.evolution_type == "multi_context")
        .unwrap();
    assert_eq!(multi.contexts.len(), 2);

    for record in dataset.to_records() {
        assert_eq!(record["episode_done"], serde_json::Value::Bool(true));
    }
}

#[tokio::test]
async fn test_builtin_single_row_path() {
    let nodes = vec![DocumentNode::new("n0", "a chunk about schedulers")
        .with_keyphrases(vec!["scheduler".into()])
        .with_score(5.0)];
    let model = Arc::new(ScriptedModel);
    let generator = TestsetGenerator::new(
        model.clone(),
        model,
        Arc::new(InMemoryDocumentStore::with_seed(nodes, 12)),
    );

    let row = generator
        .generate_single(
            Arc::new(synthset::SimpleEvolution::new()) as Arc<dyn Evolution>,
            None,
            Some(0),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.evolution_type, "simple");
    assert!(!row.question.is_empty());
    assert!(!row.ground_truth.is_empty());
}
