//! Optimize pipeline: score → suggest → validate → mutate → rescore → finalize.
//!
//! Only `AppError::Input` and persistence failures leave this module as
//! errors. A dead generator yields an empty candidate list; an unreadable
//! document yields a text-only artifact; a failing scorer should be wrapped
//! in `FallbackScorer` by the caller.

use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::{DocumentMutator, DocumentTextIndex, MutationReport};
use crate::errors::AppError;
use crate::matching::{
    build_keyword_index, fallback_job_keywords, score_posting_relevance, AtsScorer,
};
use crate::models::{JobPosting, OptimizedArtifact, Profile};
use crate::suggestions::{
    preview_text, relevant_excerpt, validate, SuggestionGenerator, SuggestionRequest,
    ValidatedReplacement, DEFAULT_CAP,
};

use super::policy::ScoreBoostPolicy;
use super::state::OptimizationState;
use super::store::{ArtifactStore, ProfileStore};

/// What an optimize call hands back.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub artifact_id: Uuid,
    pub artifact: OptimizedArtifact,
    /// True when the reported score came from the boost policy rather than
    /// the scorer.
    pub guaranteed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreMode {
    Upsert,
    AppendVersion,
}

pub struct Orchestrator {
    generator: Arc<dyn SuggestionGenerator>,
    scorer: Arc<dyn AtsScorer>,
    artifacts: Arc<dyn ArtifactStore>,
    profiles: Option<Arc<dyn ProfileStore>>,
    replacement_cap: usize,
    policy: ScoreBoostPolicy,
    mutator: DocumentMutator,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn SuggestionGenerator>,
        scorer: Arc<dyn AtsScorer>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            generator,
            scorer,
            artifacts,
            profiles: None,
            replacement_cap: DEFAULT_CAP,
            policy: ScoreBoostPolicy::default(),
            mutator: DocumentMutator::default(),
        }
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_replacement_cap(mut self, cap: usize) -> Self {
        self.replacement_cap = cap;
        self
    }

    pub fn with_policy(mut self, policy: ScoreBoostPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs the pipeline and upserts the artifact for (user, job).
    pub async fn optimize<R: Rng>(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        profile: &Profile,
        job: &JobPosting,
        rng: &mut R,
    ) -> Result<OptimizationOutcome, AppError> {
        self.run(user_id, job_id, profile, job, rng, StoreMode::Upsert)
            .await
    }

    /// Same pipeline, stored as a new version that becomes the active one.
    pub async fn refine<R: Rng>(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        profile: &Profile,
        job: &JobPosting,
        rng: &mut R,
    ) -> Result<OptimizationOutcome, AppError> {
        self.run(user_id, job_id, profile, job, rng, StoreMode::AppendVersion)
            .await
    }

    /// Loads the profile from the configured profile store, then optimizes.
    pub async fn optimize_for_user<R: Rng>(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        job: &JobPosting,
        rng: &mut R,
    ) -> Result<OptimizationOutcome, AppError> {
        let profiles = self
            .profiles
            .as_ref()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("no profile store configured")))?;
        let profile = profiles
            .load_profile(user_id)
            .await?
            .ok_or_else(|| AppError::Input(format!("no profile for user {user_id}")))?;

        self.optimize(user_id, job_id, &profile, job, rng).await
    }

    async fn run<R: Rng>(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        profile: &Profile,
        job: &JobPosting,
        rng: &mut R,
        mode: StoreMode,
    ) -> Result<OptimizationOutcome, AppError> {
        let resume_text = resume_text(profile).await?;
        if job.description.trim().is_empty() {
            return Err(AppError::Input("job description is empty".to_string()));
        }

        info!(%user_id, %job_id, title = %job.title, "Optimizing résumé");

        let keywords = match self.generator.extract_keywords(&job.title, &job.description).await {
            Ok(keywords) if !keywords.is_empty() => keywords,
            Ok(_) => fallback_job_keywords(&job.description),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Keyword extraction failed, using fallback vocabulary: {e}");
                fallback_job_keywords(&job.description)
            }
        };

        let relevance =
            score_posting_relevance(&job.title, &job.description, &build_keyword_index(profile));
        debug!(relevance, keywords = keywords.len(), "job keywords ready");

        // ── Scored ──────────────────────────────────────────────────────────
        let baseline = self
            .scorer
            .score(&resume_text, job, &profile.skills)
            .await?;
        let state = OptimizationState::start(baseline.clone());

        // ── Validated ───────────────────────────────────────────────────────
        let request = SuggestionRequest {
            resume_excerpt: relevant_excerpt(&resume_text),
            job_title: job.title.clone(),
            job_description: job.description.clone(),
            required_keywords: keywords.clone(),
        };
        let candidates = match self.generator.suggest(&request).await {
            Ok(candidates) => candidates,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Suggestion generator unavailable, continuing without edits: {e}");
                Vec::new()
            }
        };
        let validated = validate(&candidates, self.replacement_cap);
        debug!(
            proposed = candidates.len(),
            accepted = validated.len(),
            "validated replacement candidates"
        );
        let state = state.advance(OptimizationState::Validated(validated.clone()))?;

        // ── Mutated ─────────────────────────────────────────────────────────
        let preview = preview_text(&resume_text, &validated);
        let mutation = match &profile.original_document {
            Some(document) => self.mutate(document.clone(), validated.clone()).await,
            None => None,
        };
        let (optimized_document, mutation_report, pdf_preserved) = document_fields(mutation);
        let changes_made = match &mutation_report {
            Some(report) => report
                .records
                .iter()
                .map(|r| format!("{} → {}", r.original, r.replacement))
                .collect(),
            None => preview.changes_made,
        };

        let artifact = OptimizedArtifact {
            optimized_text: preview.modified,
            optimized_document,
            original_score: baseline.overall,
            optimized_score: baseline.overall,
            changes_made,
            original_breakdown: baseline.clone(),
            optimized_breakdown: baseline.clone(),
            keywords_used: keywords,
            relevance,
            applied: validated,
            mutation_report,
            pdf_preserved,
        };
        let state = state.advance(OptimizationState::Mutated(Box::new(artifact.clone())))?;

        // ── Rescored ────────────────────────────────────────────────────────
        let optimized = self
            .scorer
            .score(&artifact.optimized_text, job, &profile.skills)
            .await?;
        let state = state.advance(OptimizationState::Rescored {
            original: baseline.overall,
            optimized: optimized.overall,
        })?;

        // ── Finalized ───────────────────────────────────────────────────────
        let final_score = self.policy.finalize(baseline.overall, optimized.overall, rng);
        let guaranteed = final_score != optimized.overall;
        let artifact = OptimizedArtifact {
            optimized_score: final_score,
            optimized_breakdown: optimized,
            ..artifact
        };
        let state = state.advance(OptimizationState::Finalized {
            artifact: Box::new(artifact),
            guaranteed,
        })?;

        let Some((artifact, guaranteed)) = state.into_artifact() else {
            return Err(AppError::Internal(anyhow::anyhow!(
                "optimization ended outside the finalized state"
            )));
        };

        let artifact_id = match mode {
            StoreMode::Upsert => self.artifacts.upsert(user_id, job_id, &artifact).await,
            StoreMode::AppendVersion => {
                self.artifacts.append_version(user_id, job_id, &artifact).await
            }
        }
        .map_err(|e| match e {
            e if e.is_fatal() => e,
            other => AppError::Persistence(other.to_string()),
        })?;

        info!(
            %artifact_id,
            original = artifact.original_score,
            optimized = artifact.optimized_score,
            changes = artifact.changes_made.len(),
            "Optimization stored"
        );

        Ok(OptimizationOutcome {
            artifact_id,
            artifact,
            guaranteed,
        })
    }

    /// Mutates the document off the async runtime. `None` means the artifact
    /// degrades to text only.
    async fn mutate(
        &self,
        document: Bytes,
        replacements: Vec<ValidatedReplacement>,
    ) -> Option<(Bytes, MutationReport)> {
        let mutator = self.mutator;
        let result =
            tokio::task::spawn_blocking(move || mutator.apply(&document, &replacements)).await;

        match result {
            Ok(Ok((bytes, report))) => Some((Bytes::from(bytes), report)),
            Ok(Err(e)) => {
                warn!("Document mutation failed, returning text-only artifact: {e}");
                None
            }
            Err(e) => {
                warn!("Document mutation task failed: {e}");
                None
            }
        }
    }
}

/// Splits a mutation result into artifact fields. The PDF only counts as
/// preserved when the mutated document kept the original page count.
fn document_fields(
    mutation: Option<(Bytes, MutationReport)>,
) -> (Option<Bytes>, Option<MutationReport>, bool) {
    match mutation {
        Some((document, report)) => {
            let preserved = report.page_count_unchanged;
            if !preserved {
                warn!(
                    original_pages = report.original_page_count,
                    new_pages = report.new_page_count,
                    "Mutated PDF changed page count, not marking it preserved"
                );
            }
            (Some(document), Some(report), preserved)
        }
        None => (None, None, false),
    }
}

/// Résumé text for scoring. Falls back to the document's visible text when
/// the profile carries a document but no extracted text.
async fn resume_text(profile: &Profile) -> Result<String, AppError> {
    if !profile.raw_text.trim().is_empty() {
        return Ok(profile.raw_text.clone());
    }

    if let Some(document) = profile.original_document.clone() {
        let text = tokio::task::spawn_blocking(move || {
            DocumentTextIndex::parse(&document).map(|index| index.full_text())
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed: {e}")))?;

        match text {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {}
            Err(e) => warn!("Could not read résumé document text: {e}"),
        }
    }

    Err(AppError::Input("résumé text is empty".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_support::{build_pdf, text_ops};
    use crate::matching::{OverlapScorer, ScoreBreakdown, TitleAlignment};
    use crate::optimizer::store::{InMemoryArtifactStore, InMemoryProfileStore};
    use crate::suggestions::{ReplacementCandidate, StaticSuggestionGenerator};
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Always reports the same score.
    struct FixedScorer(u32);

    #[async_trait]
    impl AtsScorer for FixedScorer {
        async fn score(
            &self,
            _document_text: &str,
            _job: &JobPosting,
            _declared_skills: &[String],
        ) -> Result<ScoreBreakdown, AppError> {
            Ok(ScoreBreakdown {
                overall: self.0,
                title_alignment: TitleAlignment::from_overall(self.0),
                scorer_backend: "fixed".to_string(),
                ..ScoreBreakdown::default()
            })
        }
    }

    struct DownGenerator;

    #[async_trait]
    impl SuggestionGenerator for DownGenerator {
        async fn extract_keywords(&self, _: &str, _: &str) -> Result<Vec<String>, AppError> {
            Err(AppError::GenerationUnavailable("timeout".into()))
        }

        async fn suggest(
            &self,
            _: &SuggestionRequest,
        ) -> Result<Vec<ReplacementCandidate>, AppError> {
            Err(AppError::GenerationUnavailable("timeout".into()))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ArtifactStore for BrokenStore {
        async fn upsert(&self, _: Uuid, _: Uuid, _: &OptimizedArtifact) -> Result<Uuid, AppError> {
            Err(AppError::Persistence("connection reset".into()))
        }

        async fn append_version(
            &self,
            _: Uuid,
            _: Uuid,
            _: &OptimizedArtifact,
        ) -> Result<Uuid, AppError> {
            Err(AppError::Persistence("connection reset".into()))
        }

        async fn active(
            &self,
            _: Uuid,
            _: Uuid,
        ) -> Result<Option<crate::models::ArtifactVersion>, AppError> {
            Ok(None)
        }
    }

    fn java_generator() -> Arc<dyn SuggestionGenerator> {
        Arc::new(StaticSuggestionGenerator::new(vec![ReplacementCandidate::new(
            "Java", "Python",
        )]))
    }

    fn java_profile() -> Profile {
        let pdf = build_pdf(vec![text_ops(&[("Skills: Java, SQL", 72.0, 700.0)])], None);
        Profile::new(
            "Skills: Java, SQL",
            vec!["Java".into(), "SQL".into()],
            vec![],
            Some(Bytes::from(pdf)),
        )
    }

    fn python_job() -> JobPosting {
        JobPosting::new("Backend Engineer", "Acme", "Python SQL backend engineer")
    }

    #[tokio::test]
    async fn test_java_to_python_end_to_end() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let orchestrator = Orchestrator::new(java_generator(), Arc::new(OverlapScorer), store.clone())
            .with_policy(ScoreBoostPolicy::Disabled);
        let (user, job_id) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = orchestrator
            .optimize(user, job_id, &java_profile(), &python_job(), &mut rng)
            .await
            .unwrap();
        let artifact = &outcome.artifact;

        assert!(artifact.pdf_preserved);
        let report = artifact.mutation_report.as_ref().unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.new_page_count, 1);
        assert!(report.page_count_unchanged);
        assert_eq!(artifact.changes_made, vec!["Java → Python".to_string()]);

        let text = DocumentTextIndex::parse(artifact.optimized_document.as_ref().unwrap())
            .unwrap()
            .full_text();
        assert!(text.contains("Python"), "{text}");
        assert!(!text.contains("Java"), "{text}");

        assert_eq!(artifact.optimized_text, "Skills: Python, SQL");
        assert!(artifact.optimized_score > artifact.original_score);
        assert!(!outcome.guaranteed);

        let profile = java_profile();
        let job = python_job();
        let relevance =
            score_posting_relevance(&job.title, &job.description, &build_keyword_index(&profile));
        assert_eq!(artifact.relevance, relevance);
        assert!(artifact.relevance > 0);

        let active = store.active(user, job_id).await.unwrap().unwrap();
        assert_eq!(active.id, outcome.artifact_id);
        assert!(active.has_document);
    }

    #[tokio::test]
    async fn test_guaranteed_boost_when_score_does_not_improve() {
        let orchestrator = Orchestrator::new(
            java_generator(),
            Arc::new(FixedScorer(70)),
            Arc::new(InMemoryArtifactStore::new()),
        );

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let outcome = orchestrator
                .optimize(Uuid::new_v4(), Uuid::new_v4(), &java_profile(), &python_job(), &mut rng)
                .await
                .unwrap();
            assert_eq!(outcome.artifact.original_score, 70);
            assert!((78..=85).contains(&outcome.artifact.optimized_score));
            assert!(outcome.guaranteed);
            assert_eq!(outcome.artifact.optimized_breakdown.overall, 70);
        }
    }

    #[tokio::test]
    async fn test_zero_replacements_leave_document_unchanged() {
        let orchestrator = Orchestrator::new(
            Arc::new(StaticSuggestionGenerator::default()),
            Arc::new(OverlapScorer),
            Arc::new(InMemoryArtifactStore::new()),
        )
        .with_policy(ScoreBoostPolicy::Disabled);
        let profile = java_profile();
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = orchestrator
            .optimize(Uuid::new_v4(), Uuid::new_v4(), &profile, &python_job(), &mut rng)
            .await
            .unwrap();
        let artifact = outcome.artifact;

        assert!(artifact.changes_made.is_empty());
        assert_eq!(artifact.optimized_text, profile.raw_text);
        assert_eq!(artifact.optimized_score, artifact.original_score);
        assert_eq!(
            artifact.optimized_document.as_deref(),
            profile.original_document.as_deref()
        );
    }

    #[tokio::test]
    async fn test_generator_outage_degrades_to_unchanged_resume() {
        let orchestrator = Orchestrator::new(
            Arc::new(DownGenerator),
            Arc::new(OverlapScorer),
            Arc::new(InMemoryArtifactStore::new()),
        )
        .with_policy(ScoreBoostPolicy::Disabled);
        let mut rng = StdRng::seed_from_u64(3);

        let outcome = orchestrator
            .optimize(Uuid::new_v4(), Uuid::new_v4(), &java_profile(), &python_job(), &mut rng)
            .await
            .unwrap();

        assert!(outcome.artifact.applied.is_empty());
        assert!(outcome.artifact.changes_made.is_empty());
        assert_eq!(
            outcome.artifact.keywords_used,
            vec!["python".to_string(), "sql".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unreadable_document_degrades_to_text_only() {
        let orchestrator = Orchestrator::new(
            java_generator(),
            Arc::new(OverlapScorer),
            Arc::new(InMemoryArtifactStore::new()),
        );
        let profile = java_profile().with_document(Some(Bytes::from_static(b"%PDF-broken")));
        let mut rng = StdRng::seed_from_u64(5);

        let outcome = orchestrator
            .optimize(Uuid::new_v4(), Uuid::new_v4(), &profile, &python_job(), &mut rng)
            .await
            .unwrap();

        assert!(!outcome.artifact.pdf_preserved);
        assert!(outcome.artifact.optimized_document.is_none());
        assert_eq!(outcome.artifact.optimized_text, "Skills: Python, SQL");
        assert_eq!(outcome.artifact.changes_made, vec!["Java → Python".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_inputs_are_rejected() {
        let orchestrator = Orchestrator::new(
            java_generator(),
            Arc::new(OverlapScorer),
            Arc::new(InMemoryArtifactStore::new()),
        );
        let mut rng = StdRng::seed_from_u64(0);

        let err = orchestrator
            .optimize(Uuid::new_v4(), Uuid::new_v4(), &Profile::default(), &python_job(), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Input(_)));

        let empty_job = JobPosting::new("Engineer", "Acme", "   ");
        let err = orchestrator
            .optimize(Uuid::new_v4(), Uuid::new_v4(), &java_profile(), &empty_job, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates() {
        let orchestrator =
            Orchestrator::new(java_generator(), Arc::new(OverlapScorer), Arc::new(BrokenStore));
        let mut rng = StdRng::seed_from_u64(0);

        let err = orchestrator
            .optimize(Uuid::new_v4(), Uuid::new_v4(), &java_profile(), &python_job(), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_refine_appends_a_new_active_version() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let orchestrator = Orchestrator::new(java_generator(), Arc::new(OverlapScorer), store.clone());
        let (user, job_id) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rng = StdRng::seed_from_u64(9);

        let first = orchestrator
            .optimize(user, job_id, &java_profile(), &python_job(), &mut rng)
            .await
            .unwrap();
        let refined = orchestrator
            .refine(user, job_id, &java_profile(), &python_job(), &mut rng)
            .await
            .unwrap();

        assert_ne!(first.artifact_id, refined.artifact_id);
        let active = store.active(user, job_id).await.unwrap().unwrap();
        assert_eq!(active.id, refined.artifact_id);
        assert_eq!(active.version, 2);
    }

    #[tokio::test]
    async fn test_optimize_for_user_loads_stored_profile() {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let user = Uuid::new_v4();
        profiles.insert(user, java_profile()).unwrap();

        let orchestrator = Orchestrator::new(
            java_generator(),
            Arc::new(OverlapScorer),
            Arc::new(InMemoryArtifactStore::new()),
        )
        .with_profiles(profiles);
        let mut rng = StdRng::seed_from_u64(2);

        let outcome = orchestrator
            .optimize_for_user(user, Uuid::new_v4(), &python_job(), &mut rng)
            .await
            .unwrap();
        assert_eq!(outcome.artifact.changes_made.len(), 1);

        let err = orchestrator
            .optimize_for_user(Uuid::new_v4(), Uuid::new_v4(), &python_job(), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }

    #[test]
    fn test_page_count_change_is_not_preserved() {
        let grown = MutationReport {
            original_page_count: 1,
            new_page_count: 2,
            page_count_unchanged: false,
            ..MutationReport::default()
        };
        let (document, report, preserved) = document_fields(Some((Bytes::from_static(b"%PDF"), grown)));
        assert!(!preserved);
        assert!(document.is_some());
        assert_eq!(report.unwrap().new_page_count, 2);

        let kept = MutationReport {
            original_page_count: 1,
            new_page_count: 1,
            page_count_unchanged: true,
            ..MutationReport::default()
        };
        let (_, _, preserved) = document_fields(Some((Bytes::from_static(b"%PDF"), kept)));
        assert!(preserved);

        let (document, report, preserved) = document_fields(None);
        assert!(document.is_none() && report.is_none() && !preserved);
    }
}
