//! The testset generator.
//!
//! Wires models, the node store, and filters into each evolution, then
//! drives the plan/execute/aggregate pipeline: validate the mix, sample
//! node contexts, plan assignments, run them through sequential
//! execution units, and collect the surviving rows into a dataset.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::info;

use crate::config::RunConfig;
use crate::dataset::{DataRow, TestDataset};
use crate::docstore::{DocumentNode, DocumentStore, NodeContext};
use crate::error::GenerationError;
use crate::evolutions::{Distribution, Evolution, EvolutionDeps};
use crate::executor::ExecutionUnit;
use crate::filters::{
    CriticEvolutionFilter, CriticNodeFilter, CriticQuestionFilter, EvolutionFilter,
};
use crate::llm::GenerationModel;
use crate::scheduler::{partition_batches, plan_assignments, validate_distribution};
use crate::telemetry::{GenerationEvent, TelemetrySink, TracingTelemetry};

/// Default node-quality threshold for the single-row path.
const SINGLE_SCORE_THRESHOLD: f64 = 4.0;

/// Generates labeled evaluation datasets from a corpus of document
/// nodes.
pub struct TestsetGenerator {
    generator_model: Arc<dyn GenerationModel>,
    critic_model: Arc<dyn GenerationModel>,
    docstore: Arc<dyn DocumentStore>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl TestsetGenerator {
    pub fn new(
        generator_model: Arc<dyn GenerationModel>,
        critic_model: Arc<dyn GenerationModel>,
        docstore: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            generator_model,
            critic_model,
            docstore,
            telemetry: Arc::new(TracingTelemetry),
        }
    }

    /// Replace the default telemetry sink.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Build the shared collaborators for one evolution and hand them
    /// over. Construction happens up front, once per run; `configure`
    /// itself is idempotent, so strategy instances can be reused across
    /// runs.
    fn configure_evolution(&self, evolution: &Arc<dyn Evolution>, run_config: &RunConfig) {
        let evolution_filter = evolution.is_composite().then(|| {
            Arc::new(CriticEvolutionFilter::new(
                self.critic_model.clone(),
                run_config.clone(),
            )) as Arc<dyn EvolutionFilter>
        });
        evolution.configure(EvolutionDeps {
            generator_model: self.generator_model.clone(),
            docstore: self.docstore.clone(),
            node_filter: Arc::new(CriticNodeFilter::new(
                self.critic_model.clone(),
                run_config.clone(),
            )),
            question_filter: Arc::new(CriticQuestionFilter::new(
                self.critic_model.clone(),
                run_config.clone(),
            )),
            evolution_filter,
            run_config: run_config.clone(),
        });
    }

    /// Add pre-chunked corpus nodes to the backing store, then
    /// generate.
    pub async fn generate_with_nodes(
        &self,
        nodes: Vec<DocumentNode>,
        test_size: usize,
        distribution: &Distribution,
        run_config: &RunConfig,
    ) -> Result<TestDataset, GenerationError> {
        self.docstore.add_nodes(nodes);
        self.generate(test_size, distribution, run_config).await
    }

    /// Generate a dataset of exactly `test_size` rows, minus any rows
    /// dropped in tolerant mode.
    ///
    /// Fails before any work starts when the mix is invalid, and after
    /// aggregation when no row survived.
    pub async fn generate(
        &self,
        test_size: usize,
        distribution: &Distribution,
        run_config: &RunConfig,
    ) -> Result<TestDataset, GenerationError> {
        validate_distribution(distribution)?;
        if test_size == 0 {
            return Ok(TestDataset::default());
        }

        for (evolution, _) in distribution.iter() {
            self.configure_evolution(evolution, run_config);
        }

        let contexts = self.docstore.sample(test_size, None)?;
        let mut rng = match run_config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let assignments = plan_assignments(distribution, contexts, &mut rng);
        let batches = partition_batches(assignments, run_config.max_concurrency);
        info!(
            test_size,
            units = batches.len(),
            "starting testset generation"
        );

        let mut rows: Vec<DataRow> = Vec::with_capacity(test_size);
        for (unit_index, batch) in batches.into_iter().enumerate() {
            let mut unit = ExecutionUnit::new(
                format!("generating-{unit_index}"),
                run_config.raise_exceptions,
                run_config.is_async,
            );
            for assignment in batch {
                unit.submit(assignment);
            }
            let outcomes = unit.run().await?;
            rows.extend(outcomes.into_iter().flatten());
        }

        if rows.is_empty() {
            return Err(GenerationError::EmptyTestset);
        }

        let dataset = TestDataset::new(rows);
        self.telemetry.track(GenerationEvent {
            evolution_names: distribution.names(),
            evolution_percentages: distribution.weights(),
            num_rows: dataset.len(),
            language: distribution
                .iter()
                .map(|(evolution, _)| evolution.language().to_string())
                .next()
                .unwrap_or_default(),
        });
        Ok(dataset)
    }

    /// One-shot mode: run a single assignment for `evolution` against
    /// either the node at `node_index` or a freshly sampled,
    /// score-filtered node. Returns `None` when the row was filtered
    /// out.
    pub async fn generate_single(
        &self,
        evolution: Arc<dyn Evolution>,
        score_threshold: Option<f64>,
        node_index: Option<usize>,
    ) -> Result<Option<DataRow>, GenerationError> {
        let threshold = score_threshold.unwrap_or(SINGLE_SCORE_THRESHOLD);

        // Bounds failure must precede any generation work.
        let context = match node_index {
            Some(index) => {
                let node =
                    self.docstore
                        .get(index)
                        .ok_or_else(|| GenerationError::NodeIndexOutOfRange {
                            index,
                            len: self.docstore.len(),
                        })?;
                NodeContext::new(node)
            }
            None => {
                let mut sampled = self.docstore.sample(1, Some(threshold))?;
                match sampled.pop() {
                    Some(context) => context,
                    None => {
                        return Err(GenerationError::InsufficientCorpus {
                            requested: 1,
                            available: 0,
                        })
                    }
                }
            }
        };

        self.configure_evolution(&evolution, &RunConfig::default());
        evolution
            .evolve(context)
            .await
            .map_err(GenerationError::from)
    }
}
