// src/services/job_tracker.rs
use crate::errors::StitchyError;
use crate::models::GenerationStage;
use crate::services::pipeline::GenerationObserver;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub job_id: Uuid,
    pub stage: GenerationStage,
    pub failed_stage: Option<GenerationStage>,
    pub error: Option<String>,
    pub project_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    fn is_finished(&self) -> bool {
        matches!(
            self.stage,
            GenerationStage::Complete | GenerationStage::Error
        )
    }
}

/// Finished jobs stay queryable for this long after their last update.
const DEFAULT_RETENTION_MINUTES: i64 = 60;

/// In-memory progress of generation jobs started over HTTP.
#[derive(Clone)]
pub struct JobTracker {
    jobs: Arc<Mutex<HashMap<Uuid, JobStatus>>>,
    retention: Duration,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::with_retention(Duration::minutes(DEFAULT_RETENTION_MINUTES))
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            retention,
        }
    }

    pub fn create(&self) -> Uuid {
        let job_id = Uuid::new_v4();
        let mut jobs = self.lock();
        self.evict_finished(&mut jobs);
        jobs.insert(
            job_id,
            JobStatus {
                job_id,
                stage: GenerationStage::Analyzing,
                failed_stage: None,
                error: None,
                project_id: None,
                updated_at: Utc::now(),
            },
        );
        job_id
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, job_id: &Uuid) -> Option<JobStatus> {
        self.lock().get(job_id).cloned()
    }

    pub fn observer(&self, job_id: Uuid) -> JobObserver {
        JobObserver {
            tracker: self.clone(),
            job_id,
        }
    }

    pub fn set_project(&self, job_id: Uuid, project_id: Uuid) {
        self.with_job(job_id, |job| job.project_id = Some(project_id));
    }

    /// Marks a job failed after the pipeline itself succeeded, e.g. storage.
    pub fn fail(&self, job_id: Uuid, error: &StitchyError) {
        self.with_job(job_id, |job| {
            job.failed_stage = Some(job.stage);
            job.stage = GenerationStage::Error;
            job.error = Some(error.to_string());
        });
    }

    fn with_job(&self, job_id: Uuid, f: impl FnOnce(&mut JobStatus)) {
        match self.lock().get_mut(&job_id) {
            Some(job) => {
                f(job);
                job.updated_at = Utc::now();
            }
            None => warn!("Update for unknown job {}", job_id),
        }
    }

    fn evict_finished(&self, jobs: &mut HashMap<Uuid, JobStatus>) {
        let cutoff = Utc::now() - self.retention;
        let before = jobs.len();
        jobs.retain(|_, job| !job.is_finished() || job.updated_at > cutoff);
        if jobs.len() < before {
            debug!("Evicted {} finished jobs", before - jobs.len());
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, JobStatus>> {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Feeds pipeline callbacks for one job into its [`JobTracker`].
pub struct JobObserver {
    tracker: JobTracker,
    job_id: Uuid,
}

impl GenerationObserver for JobObserver {
    fn on_stage_change(&self, stage: GenerationStage) {
        debug!("Job {}: {}", self.job_id, stage);
        self.tracker.with_job(self.job_id, |job| job.stage = stage);
    }

    fn on_error(&self, error: &StitchyError, stage: GenerationStage) {
        debug!("Job {} failed during {}: {}", self.job_id, stage, error);
        self.tracker.with_job(self.job_id, |job| {
            job.stage = GenerationStage::Error;
            job.failed_stage = Some(stage);
            job.error = Some(error.to_string());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_tracks_stages_and_errors() {
        let tracker = JobTracker::new();
        let job_id = tracker.create();
        let observer = tracker.observer(job_id);

        observer.on_stage_change(GenerationStage::GeneratingImage);
        assert_eq!(tracker.get(&job_id).unwrap().stage, GenerationStage::GeneratingImage);

        observer.on_error(&StitchyError::EmptyGeneration, GenerationStage::GeneratingImage);
        let status = tracker.get(&job_id).unwrap();
        assert_eq!(status.stage, GenerationStage::Error);
        assert_eq!(status.failed_stage, Some(GenerationStage::GeneratingImage));
        assert_eq!(
            status.error.as_deref(),
            Some("Image generation returned no images")
        );
    }

    #[test]
    fn completed_job_records_project() {
        let tracker = JobTracker::new();
        let job_id = tracker.create();
        tracker.observer(job_id).on_stage_change(GenerationStage::Complete);
        let project_id = Uuid::new_v4();
        tracker.set_project(job_id, project_id);

        let status = tracker.get(&job_id).unwrap();
        assert_eq!(status.stage, GenerationStage::Complete);
        assert_eq!(status.project_id, Some(project_id));
    }

    #[test]
    fn storage_failure_after_completion() {
        let tracker = JobTracker::new();
        let job_id = tracker.create();
        tracker.observer(job_id).on_stage_change(GenerationStage::Complete);
        tracker.fail(job_id, &StitchyError::Redis("down".into()));

        let status = tracker.get(&job_id).unwrap();
        assert_eq!(status.stage, GenerationStage::Error);
        assert_eq!(status.failed_stage, Some(GenerationStage::Complete));
    }

    #[test]
    fn finished_jobs_are_evicted_after_retention() {
        let tracker = JobTracker::with_retention(Duration::zero());
        let done = tracker.create();
        tracker.observer(done).on_stage_change(GenerationStage::Complete);
        let failed = tracker.create();
        tracker
            .observer(failed)
            .on_error(&StitchyError::EmptyGeneration, GenerationStage::GeneratingImage);
        let running = tracker.create();
        tracker.observer(running).on_stage_change(GenerationStage::WritingPattern);

        let latest = tracker.create();

        assert!(tracker.get(&done).is_none());
        assert!(tracker.get(&failed).is_none());
        assert!(tracker.get(&running).is_some());
        assert!(tracker.get(&latest).is_some());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn finished_jobs_within_retention_are_kept() {
        let tracker = JobTracker::new();
        for _ in 0..100 {
            let job_id = tracker.create();
            tracker.observer(job_id).on_stage_change(GenerationStage::Complete);
        }
        assert_eq!(tracker.len(), 100);
    }

    #[test]
    fn status_serializes_stage_names() {
        let tracker = JobTracker::new();
        let job_id = tracker.create();
        tracker.observer(job_id).on_stage_change(GenerationStage::WritingPattern);

        let json = serde_json::to_value(tracker.get(&job_id).unwrap()).unwrap();
        assert_eq!(json["stage"], "writing_pattern");
        assert!(json["failed_stage"].is_null());
        assert!(json["updated_at"].is_string());
    }

    #[test]
    fn unknown_jobs_are_absent() {
        assert!(JobTracker::new().get(&Uuid::new_v4()).is_none());
    }
}
