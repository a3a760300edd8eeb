//! Generation orchestrator: prompt → service → manifest → new generation.
//!
//! One call allocates exactly one `projects_root/<project>/<n>/` directory.
//! The service is called once; a failed or malformed response goes through
//! the normalizer's fallback instead of being retried.

mod report;

use std::path::{Path, PathBuf};

pub use report::{GenerationReport, REPORT_FILE_NAME};

use crate::codec;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::manifest::{ManifestNormalizer, NormalizedManifest, Strictness};
use crate::models::{BatchJob, BatchOutcome, ManifestEntry, Project};
use crate::replay;
use crate::service::{build_prompt, GenerationRequest, GenerationService};
use crate::versions;
use crate::workspace;

/// Orchestrator knobs, usually taken from [`Config`].
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub projects_root: PathBuf,
    pub strictness: Strictness,
    pub allocation_attempts: u32,
    pub write_report: bool,
    /// System directive sent with every request; `None` uses the service default.
    pub system_directive: Option<String>,
}

impl GeneratorSettings {
    pub fn new(projects_root: impl Into<PathBuf>) -> Self {
        Self {
            projects_root: projects_root.into(),
            strictness: Strictness::Strict,
            allocation_attempts: 3,
            write_report: true,
            system_directive: None,
        }
    }
}

impl From<&Config> for GeneratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            projects_root: config.projects_root.clone(),
            strictness: config.strictness,
            allocation_attempts: config.allocation_attempts,
            write_report: config.write_report,
            system_directive: Some(config.system_directive.clone()),
        }
    }
}

/// A finished generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub project: Project,
    pub manifest: NormalizedManifest,
    pub files_written: usize,
}

impl Generation {
    pub fn output_path(&self) -> &Path {
        &self.project.root_path
    }
}

pub struct Generator<S> {
    service: S,
    settings: GeneratorSettings,
}

impl<S: GenerationService> Generator<S> {
    pub fn new(service: S, settings: GeneratorSettings) -> Self {
        Self { service, settings }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Generate a new version of `project_name` and return its directory.
    pub async fn generate(
        &self,
        prompt: &str,
        project_name: &str,
        template_root: Option<&Path>,
    ) -> Result<PathBuf> {
        let generation = self.generate_project(prompt, project_name, template_root).await?;
        Ok(generation.project.root_path)
    }

    /// Like [`Self::generate`], returning the allocated project and manifest.
    pub async fn generate_project(
        &self,
        prompt: &str,
        project_name: &str,
        template_root: Option<&Path>,
    ) -> Result<Generation> {
        if prompt.trim().is_empty() {
            return Err(PipelineError::InvalidManifest("prompt is empty".to_string()));
        }
        versions::validate_project_name(project_name)?;

        let full_prompt = match template_root {
            Some(template) => {
                workspace::require_template(template)?;
                let tree = workspace::load(template)?;
                let encoded = codec::encode(&tree)?;
                build_prompt(prompt, Some((&tree, &encoded)))
            }
            None => build_prompt(prompt, None),
        };

        let mut request = GenerationRequest::new(full_prompt);
        if let Some(system) = &self.settings.system_directive {
            request = request.with_system(system.clone());
        }

        tracing::info!(project = project_name, "requesting generation");
        let raw_text = match self.service.complete(&request).await {
            Ok(text) => text,
            Err(e) if e.is_configuration() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(project = project_name, error = %e, "generation service failed");
                format!("generation service error: {e}")
            }
        };

        let manifest = ManifestNormalizer::new(self.settings.strictness).normalize(&raw_text)?;
        let reserved = reserved_paths(&manifest.entries);
        for path in &reserved {
            tracing::warn!(
                project = project_name,
                path = %path.display(),
                "manifest path collides with a generated artifact"
            );
        }
        // A generated `.reports.md` is kept in place of the metrics report.
        let manifest_has_report = reserved.iter().any(|p| p == Path::new(REPORT_FILE_NAME));

        let project = versions::allocate_with_retry(
            &self.settings.projects_root,
            project_name,
            self.settings.allocation_attempts,
        )?;

        let written = match template_root {
            Some(template) => workspace::overlay(Some(template), &manifest.entries, &project.root_path),
            None => workspace::materialize(&manifest.entries, &project.root_path),
        };
        let files_written = written.inspect_err(|e| {
            tracing::error!(
                project = %project.name,
                generation = project.generation,
                path = %project.root_path.display(),
                error = %e,
                "writing generation failed"
            );
        })?;

        if self.settings.write_report && !manifest_has_report {
            let report = GenerationReport::collect(&request.prompt, &raw_text, &project.root_path)
                .and_then(|r| r.write(&project.root_path));
            if let Err(e) = report {
                tracing::warn!(path = %project.root_path.display(), error = %e, "failed to write report");
            }
        }
        versions::update_latest(&self.settings.projects_root, &project.name, project.generation)?;

        tracing::info!(
            project = %project.name,
            generation = project.generation,
            files = files_written,
            fallback = manifest.used_fallback(),
            "generation written"
        );
        Ok(Generation {
            project,
            manifest,
            files_written,
        })
    }

    /// Run jobs one after another. A failing job is recorded and the batch
    /// moves on. With `replay_entrypoint`, each generation is replayed.
    pub async fn run_batch(&self, jobs: &[BatchJob], replay_entrypoint: Option<&str>) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            let mut outcome = BatchOutcome {
                project: job.project.clone(),
                output_path: None,
                replay: None,
                error: None,
            };

            match self.generate(&job.prompt, &job.project, job.template.as_deref()).await {
                Ok(path) => {
                    if let Some(entrypoint) = replay_entrypoint {
                        match replay::replay_with(&path, entrypoint) {
                            Ok(result) => outcome.replay = Some(result.outcome.to_string()),
                            Err(e) => outcome.error = Some(e.to_string()),
                        }
                    }
                    outcome.output_path = Some(path);
                }
                Err(e) => {
                    tracing::warn!(project = %job.project, error = %e, "batch job failed");
                    outcome.error = Some(e.to_string());
                }
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Manifest paths that the metrics report or a later replay would write over.
fn reserved_paths(entries: &[ManifestEntry]) -> Vec<PathBuf> {
    entries
        .iter()
        .filter_map(|e| e.relative_path().ok())
        .filter(|path| {
            path == Path::new(REPORT_FILE_NAME)
                || path
                    .components()
                    .next()
                    .is_some_and(|c| c.as_os_str() == replay::REPLAY_DIR)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_report_and_replay_paths() {
        let entries = [
            ManifestEntry::new(".reports.md", "mine"),
            ManifestEntry::new("replay/test_bool.txt", "PASSED"),
            ManifestEntry::new("replay", "a file"),
            ManifestEntry::new("src/replay/mod.rs", ""),
            ManifestEntry::new("docs/.reports.md", ""),
        ];
        let reserved = reserved_paths(&entries);
        assert_eq!(
            reserved,
            vec![
                PathBuf::from(".reports.md"),
                PathBuf::from("replay/test_bool.txt"),
                PathBuf::from("replay"),
            ]
        );
    }
}
