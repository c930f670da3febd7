use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{Result, SubtranslateError};
use crate::paths::{derive_output_path, extract_source_language, PathResolver};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::subtitle::{read_document, write_document, Document};
use crate::translate::{TranslationRequest, Translator};

/// One translation invocation: a single document into a single language
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub id: Uuid,
    pub source_path: String,
    pub target_language: String,
    pub model: String,
    pub context: Option<String>,
    /// Only translate the first N entries (test mode)
    pub entry_limit: Option<NonZeroUsize>,
}

impl TranslationJob {
    pub fn new(source_path: impl Into<String>, target_language: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_path: source_path.into(),
            target_language: target_language.into().to_lowercase(),
            model: model.into(),
            context: None,
            entry_limit: None,
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context.filter(|ctx| !ctx.trim().is_empty());
        self
    }

    pub fn with_entry_limit(mut self, entry_limit: Option<NonZeroUsize>) -> Self {
        self.entry_limit = entry_limit;
        self
    }

    fn request(&self) -> TranslationRequest {
        TranslationRequest {
            target_language: self.target_language.clone(),
            model: self.model.clone(),
            context: self.context.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    Validating,
    Translating,
    Finalizing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowOptions {
    /// Emit extra log events (resolved path, source text per entry)
    pub verbose: bool,
}

/// Outcome of a completed job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub output_path: PathBuf,
    pub entries: usize,
    pub elapsed: Duration,
}

/// Drives a job from path validation to the written output file.
///
/// Entries are translated strictly one after another, in document order.
pub struct Workflow {
    translator: Box<dyn Translator>,
    resolver: PathResolver,
    options: WorkflowOptions,
}

impl Workflow {
    pub fn new(translator: Box<dyn Translator>, resolver: PathResolver, options: WorkflowOptions) -> Self {
        Self {
            translator,
            resolver,
            options,
        }
    }

    /// Run a job to completion. The last event emitted is always
    /// `Complete` or `Error`.
    pub async fn run(&self, job: &TranslationJob, sink: &dyn ProgressSink) -> Result<JobReport> {
        let span = info_span!("job", id = %job.id, lang = %job.target_language);
        self.enter(JobState::Init);

        let result = self.execute(job, sink).instrument(span).await;
        match &result {
            Ok(report) => {
                self.enter(JobState::Completed);
                sink.emit(ProgressEvent::Complete(report.output_path.clone()));
            }
            Err(e) => {
                self.enter(JobState::Failed);
                sink.emit(ProgressEvent::Error(e.to_string()));
            }
        }
        result
    }

    fn enter(&self, state: JobState) {
        debug!("Job state: {:?}", state);
    }

    fn log(&self, sink: &dyn ProgressSink, message: String) {
        debug!("{}", message);
        sink.emit(ProgressEvent::Log(message));
    }

    async fn execute(&self, job: &TranslationJob, sink: &dyn ProgressSink) -> Result<JobReport> {
        info!("Translating {} to {} with {}", job.source_path, job.target_language, job.model);

        // Validating
        self.enter(JobState::Validating);
        let source = self.resolver.resolve(&job.source_path);
        if !fs::try_exists(&source).await.unwrap_or(false) {
            return Err(SubtranslateError::PathNotFound(source.display().to_string()));
        }
        if self.options.verbose {
            self.log(sink, format!("Input file: {}", source.display()));
        }

        if !self.translator.check_availability(&job.model).await {
            return Err(SubtranslateError::ModelUnavailable(job.model.clone()));
        }

        // Translating
        self.enter(JobState::Translating);
        let mut document = read_document(&source).await?;
        if document.is_empty() {
            return Err(SubtranslateError::ParseFailure(source.display().to_string()));
        }

        let parsed = document.len();
        if let Some(limit) = job.entry_limit {
            document.truncate(limit.get());
            self.log(sink, format!("Test mode: processing first {} of {} entries", document.len(), parsed));
        }

        if self.options.verbose {
            let filename = source.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let source_language = extract_source_language(&filename).unwrap_or_else(|| "unknown".to_string());
            self.log(sink, format!("Source language: {}, target language: {}", source_language, job.target_language));
        }

        let started = Instant::now();
        let translated = self.translate_entries(&document, &job.request(), sink).await;
        let elapsed = started.elapsed();

        let entries = translated.len();
        self.log(sink, format!(
            "Translated {} entries in {:.1}s ({:.2}s per entry)",
            entries,
            elapsed.as_secs_f64(),
            elapsed.as_secs_f64() / entries as f64
        ));

        // Finalizing
        self.enter(JobState::Finalizing);
        let output_path = derive_output_path(&source, &job.target_language);
        let target = output_path.clone();
        tokio::task::spawn_blocking(move || write_document(&translated, &target))
            .await
            .map_err(|e| SubtranslateError::Write(e.to_string()))??;

        info!("Saved: {}", output_path.display());
        Ok(JobReport {
            output_path,
            entries,
            elapsed,
        })
    }

    async fn translate_entries(
        &self,
        document: &Document,
        request: &TranslationRequest,
        sink: &dyn ProgressSink,
    ) -> Document {
        let total = document.len();
        let mut translated = Vec::with_capacity(total);

        sink.emit(ProgressEvent::progress(0, total));

        for (idx, entry) in document.entries.iter().enumerate() {
            let original = entry.text();
            if self.options.verbose {
                self.log(sink, format!("[{}/{}] Source: {}", idx + 1, total, original.replace('\n', " / ")));
            }

            let mut text = self.translator.translate_one(&original, request).await;
            if text.trim().is_empty() {
                warn!("Entry {} came back empty, keeping original text", entry.index);
                text = original;
            }

            self.log(sink, format!("[{}/{}] {}", idx + 1, total, text.replace('\n', " / ")));
            translated.push(entry.with_text(&text));
            sink.emit(ProgressEvent::progress(idx + 1, total));
        }

        Document::new(translated)
    }
}
