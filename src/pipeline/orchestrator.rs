// file: src/pipeline/orchestrator.rs
// description: drives one analysis run from preprocessing through report rendering
// reference: fan-out with tokio::spawn and a join barrier before aggregation

use crate::collaborators::{
    ArtifactLocation, ChatCompletionClient, IndexHandle, Indexer, KeywordIndex,
    MarkdownReportRenderer, ReportRenderer, TextModel,
};
use crate::config::{Config, PipelineConfig};
use crate::document::{DocumentLoader, DocumentRef, inspect};
use crate::error::{AnalysisError, Result};
use crate::extractor::{
    Agent, BasicInfoExtractor, ContractInfoExtractor, ExtractionScope, ScoringAnalyzer,
    SectionExtractor,
};
use crate::models::{TaskId, TaskOptions};
use crate::pipeline::aggregator::{Aggregator, ExtractedSections};
use crate::pipeline::context::StepContext;
use crate::pipeline::progress::{ProgressRegistry, ProgressReporter, ProgressSink};
use crate::pipeline::state::{ErrorLog, Fault, PipelineState, PipelineStep, StepEvent};
use crate::utils::OperationTimer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct AnalysisPipeline {
    loader: DocumentLoader,
    indexer: Arc<dyn Indexer>,
    model: Arc<dyn TextModel>,
    renderer: Arc<dyn ReportRenderer>,
    aggregator: Aggregator,
    config: PipelineConfig,
}

impl AnalysisPipeline {
    pub fn new(
        config: PipelineConfig,
        indexer: Arc<dyn Indexer>,
        model: Arc<dyn TextModel>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            loader: DocumentLoader::new(),
            indexer,
            model,
            renderer,
            aggregator: Aggregator::new(),
            config,
        }
    }

    /// Wires the default collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model = ChatCompletionClient::new(&config.llm)?;
        Ok(Self::new(
            config.pipeline.clone(),
            Arc::new(KeywordIndex::new(&config.index)),
            Arc::new(model),
            Arc::new(MarkdownReportRenderer::new(config.output.output_dir.clone())),
        ))
    }

    pub fn loader(&self) -> &DocumentLoader {
        &self.loader
    }

    /// Executes every step for one task and returns the finished state.
    /// Never fails: problems end up in the state's error list.
    pub async fn run(
        &self,
        task_id: TaskId,
        document: DocumentRef,
        options: &TaskOptions,
        cancel: CancellationToken,
        sink: ProgressSink,
    ) -> PipelineState {
        let timer = OperationTimer::new(&format!("analysis of {}", document.name()));
        let ctx = StepContext::new(cancel, self.config.step_timeout());
        let reporter = ProgressReporter::new(
            ProgressRegistry::with_agents(Agent::ALL.iter().map(Agent::name)),
            sink,
        );

        let mut state = PipelineState::new(task_id, document);
        if let Some(name) = options.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            state.result.document_name = name.to_string();
        }

        state = self.preprocess(state, &ctx, &reporter).await;
        let lease = state
            .index
            .map(|handle| IndexLease::new(Arc::clone(&self.indexer), handle));

        if state.current_step == PipelineStep::DocumentProcessed {
            state = self.extract_and_aggregate(state, &ctx, &reporter).await;
        }

        if matches!(
            state.current_step,
            PipelineStep::ParallelExtractionCompleted | PipelineStep::PartialExtractionCompleted
        ) {
            state = self.format(state, options, &ctx, &reporter).await;
        }

        if state.current_step == PipelineStep::Error {
            state = self.handle_error(state, options, &ctx, &reporter).await;
        }

        state.index = None;
        if let Some(lease) = lease {
            lease.release().await;
        }

        timer.finish();
        state
    }

    async fn preprocess(
        &self,
        mut state: PipelineState,
        ctx: &StepContext,
        reporter: &ProgressReporter,
    ) -> PipelineState {
        info!("Preprocessing {}", state.document.path().display());

        match self.load_and_index(&mut state, ctx).await {
            Ok(()) => match state.advance(StepEvent::Preprocessed) {
                Ok(step) => reporter.step(step),
                Err(e) => state.fail(Fault::Preprocessing, &e),
            },
            Err(AnalysisError::Cancelled) => state.fail(Fault::Cancelled, &AnalysisError::Cancelled),
            Err(e) => {
                error!("Document preprocessing failed: {}", e);
                state.fail(Fault::Preprocessing, &e);
            }
        }

        state
    }

    async fn load_and_index(&self, state: &mut PipelineState, ctx: &StepContext) -> Result<()> {
        let content = ctx
            .guard("document load", self.loader.load(&state.document))
            .await?;
        info!(
            "Loaded {} ({} characters, sha256 {})",
            content.name,
            content.char_count(),
            content.content_hash
        );
        state.result.add_note(format!(
            "Document fingerprint: sha256 {}",
            &content.content_hash[..16]
        ));

        for note in inspect(&content.text).notes() {
            warn!("{}", note);
            state.result.add_note(note);
        }

        let handle = ctx
            .guard("document indexing", self.indexer.index(&content))
            .await?;
        info!(
            "Document {} indexed into {} chunks",
            content.name, handle.chunk_count
        );
        state.result.add_note(format!(
            "Document indexed into {} chunks",
            handle.chunk_count
        ));

        state.index = Some(handle);
        state.content = Some(content);
        Ok(())
    }

    async fn extract_and_aggregate(
        &self,
        mut state: PipelineState,
        ctx: &StepContext,
        reporter: &ProgressReporter,
    ) -> PipelineState {
        let handle = match (state.index, state.advance(StepEvent::FannedOut)) {
            (Some(handle), Ok(step)) => {
                reporter.step(step);
                handle
            }
            (_, Err(e)) => {
                state.fail(Fault::Aggregation, &e);
                return state;
            }
            (None, Ok(_)) => {
                let e = AnalysisError::AggregationFailure("no index handle after preprocessing".into());
                state.fail(Fault::Aggregation, &e);
                return state;
            }
        };

        let scope = |agent: Agent| ExtractionScope {
            agent,
            indexer: Arc::clone(&self.indexer),
            handle,
            model: Arc::clone(&self.model),
            ctx: ctx.clone(),
            reporter: reporter.clone(),
            retrieval_k: self.config.retrieval_k,
            max_chunks: self.config.max_context_chunks,
        };

        info!("Starting parallel extraction with {} agents", Agent::ALL.len());
        let (basic_information, scoring_criteria, contract_information) = tokio::join!(
            run_extractor(BasicInfoExtractor, scope(Agent::BasicInfo), state.errors.clone()),
            run_extractor(ScoringAnalyzer, scope(Agent::Scoring), state.errors.clone()),
            run_extractor(ContractInfoExtractor, scope(Agent::Contract), state.errors.clone()),
        );

        if ctx.is_cancelled() {
            state.fail(Fault::Cancelled, &AnalysisError::Cancelled);
            return state;
        }

        let sections = ExtractedSections {
            basic_information,
            scoring_criteria,
            contract_information,
        };

        match self.aggregator.aggregate(&mut state, sections) {
            Ok(outcome) => {
                reporter.step(outcome.step());
                if outcome.step() == PipelineStep::ExtractionFailed
                    && let Err(e) = state.advance(StepEvent::Faulted(Fault::NothingExtracted))
                {
                    state.fail(Fault::NothingExtracted, &e);
                }
            }
            Err(e) => {
                error!("Aggregation failed: {}", e);
                if let Err(transition) = state.advance(StepEvent::AggregationFaulted) {
                    debug!("Aggregation fault outside parallel phase: {}", transition);
                }
                state.fail(Fault::Aggregation, &e);
            }
        }

        state
    }

    async fn format(
        &self,
        mut state: PipelineState,
        options: &TaskOptions,
        ctx: &StepContext,
        reporter: &ProgressReporter,
    ) -> PipelineState {
        if !options.render_report {
            debug!("Report rendering disabled for task {}", state.task_id);
            if let Err(e) = state.advance(StepEvent::RenderSkipped) {
                state.fail(Fault::Formatting, &e);
            }
            return state;
        }

        match self.render(&state, ctx).await {
            Ok(location) => {
                state.artifact = Some(location);
                let finished = state
                    .advance(StepEvent::Rendered)
                    .inspect(|step| reporter.step(*step))
                    .and_then(|_| state.advance(StepEvent::Finished));
                if let Err(e) = finished {
                    state.fail(Fault::Formatting, &e);
                }
            }
            Err(AnalysisError::Cancelled) => state.fail(Fault::Cancelled, &AnalysisError::Cancelled),
            Err(e) => {
                warn!("Report rendering failed: {}", e);
                state.fail(Fault::Formatting, &e);
            }
        }

        state
    }

    async fn render(
        &self,
        state: &PipelineState,
        ctx: &StepContext,
    ) -> Result<ArtifactLocation> {
        ctx.guard("report rendering", self.renderer.render(&state.result))
            .await
            .map_err(|e| match e {
                AnalysisError::Cancelled | AnalysisError::FormattingFailure(_) => e,
                other => AnalysisError::FormattingFailure(other.to_string()),
            })
    }

    /// Salvages what it can, then settles the run as completed or failed.
    async fn handle_error(
        &self,
        mut state: PipelineState,
        options: &TaskOptions,
        ctx: &StepContext,
        reporter: &ProgressReporter,
    ) -> PipelineState {
        reporter.step(PipelineStep::Error);
        let has_content = state.result.has_content();
        let salvage = options.render_report && has_content && !ctx.is_cancelled();

        let event = match state.fault {
            Some(Fault::Formatting) if has_content => {
                if salvage {
                    self.rerender(&mut state, ctx).await;
                }
                StepEvent::Recovered
            }
            Some(Fault::Aggregation) if salvage => {
                self.rerender(&mut state, ctx).await;
                StepEvent::Abandoned
            }
            _ => StepEvent::Abandoned,
        };

        match state.advance(event) {
            Ok(PipelineStep::Completed) => {
                info!("Task {} recovered with partial output", state.task_id)
            }
            Ok(step) => error!("Task {} ended in {}", state.task_id, step),
            Err(e) => {
                state.errors.push(e.to_string());
                state.current_step = PipelineStep::Failed;
                state.history.push(PipelineStep::Failed);
            }
        }

        state
    }

    async fn rerender(&self, state: &mut PipelineState, ctx: &StepContext) {
        state.retry_count += 1;
        info!(
            "Re-rendering report for task {} (attempt {})",
            state.task_id, state.retry_count
        );
        match self.render(state, ctx).await {
            Ok(location) => state.artifact = Some(location),
            Err(e) => {
                warn!("Report re-render failed: {}", e);
                state.errors.push(format!("Report re-render failed: {}", e));
            }
        }
    }
}

/// Holds a run's index until it is released. A lease dropped without
/// `release`, as happens when the run unwinds, releases in the background.
struct IndexLease {
    indexer: Arc<dyn Indexer>,
    handle: Option<IndexHandle>,
}

impl IndexLease {
    fn new(indexer: Arc<dyn Indexer>, handle: IndexHandle) -> Self {
        Self {
            indexer,
            handle: Some(handle),
        }
    }

    async fn release(mut self) {
        if let Some(handle) = self.handle.take() {
            release_index(self.indexer.as_ref(), handle).await;
        }
    }
}

impl Drop for IndexLease {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!("Run ended without releasing index {}", handle.id);
                let indexer = Arc::clone(&self.indexer);
                runtime.spawn(async move { release_index(indexer.as_ref(), handle).await });
            }
            Err(_) => warn!("Index {} leaked: no runtime to release it", handle.id),
        }
    }
}

async fn release_index(indexer: &dyn Indexer, handle: IndexHandle) {
    if let Err(e) = indexer.release(&handle).await {
        warn!("Failed to release index {}: {}", handle.id, e);
    }
}

/// Runs one extractor on its own task. Failures, timeouts and panics are
/// recorded once in `errors`; whatever the step filled in is returned.
async fn run_extractor<E>(extractor: E, scope: ExtractionScope, errors: ErrorLog) -> E::Section
where
    E: SectionExtractor,
{
    let agent = extractor.agent();
    let reporter = scope.reporter.clone();
    reporter.checkpoint(agent.name(), 10);

    let joined = tokio::spawn(async move {
        let mut section = E::Section::default();
        let outcome = extractor.extract(&scope, &mut section).await;
        (section, outcome)
    })
    .await;

    let section = match joined {
        Ok((section, Ok(()))) => {
            info!("{} finished", agent);
            section
        }
        Ok((section, Err(AnalysisError::Cancelled))) => {
            warn!("{} cancelled", agent);
            section
        }
        Ok((section, Err(e))) => {
            warn!("{} failed: {}", agent, e);
            errors.push(e.to_string());
            section
        }
        Err(join_error) => {
            let reason = if join_error.is_panic() {
                "step panicked"
            } else {
                "step was aborted"
            };
            error!("{} {}", agent, reason);
            errors.push(AnalysisError::extraction(agent.name(), reason).to_string());
            E::Section::default()
        }
    };

    reporter.checkpoint(agent.name(), 100);
    section
}
