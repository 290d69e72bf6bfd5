//! Reusable job definitions.
//!
//! A [`JobTemplate`] describes a set of operations once and stamps out
//! concrete [`Job`]s with unique operation IDs. Operation IDs of an
//! instance are `"{job_id}_{template_id}"`; template-local precedence is
//! remapped to those IDs.

use serde::{Deserialize, Serialize};

use super::metadata::{MetaValue, Metadata};
use super::{Job, Operation, ResourceRequirement};
use crate::error::{ScheduleError, ScheduleResult};

/// One operation inside a job template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationTemplate {
    /// Template-local identifier.
    pub template_id: String,
    /// Base processing time in seconds.
    pub duration_secs: i64,
    /// Resource requirements copied into every instance.
    pub requirements: Vec<ResourceRequirement>,
    /// Template-local predecessor IDs.
    pub precedence: Vec<String>,
    /// Metadata copied into every instance.
    pub metadata: Metadata,
}

impl OperationTemplate {
    /// Creates a template operation.
    pub fn new(template_id: impl Into<String>, duration_secs: i64) -> Self {
        Self {
            template_id: template_id.into(),
            duration_secs,
            requirements: Vec::new(),
            precedence: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Adds a requirement for one resource of `resource_type`.
    pub fn with_resource<I, S>(mut self, resource_type: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements
            .push(ResourceRequirement::new(resource_type).with_candidates(candidates));
        self
    }

    /// Adds a template-local predecessor.
    pub fn with_predecessor(mut self, template_id: impl Into<String>) -> Self {
        self.precedence.push(template_id.into());
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A reusable job definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    /// Template identifier.
    pub id: String,
    /// Operations in job order.
    pub operations: Vec<OperationTemplate>,
    /// Metadata copied into every instance.
    pub metadata: Metadata,
    /// Instances must run as a no-wait chain.
    pub blocking: bool,
}

impl JobTemplate {
    /// Creates an empty, non-blocking template.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operations: Vec::new(),
            metadata: Metadata::new(),
            blocking: false,
        }
    }

    /// Adds a template operation.
    pub fn with_operation(mut self, op: OperationTemplate) -> Self {
        self.operations.push(op);
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Marks instances as no-wait chains.
    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Default job ID for an instance: `"{template_id}_{instance_id}"`.
    pub fn instance_job_id(&self, instance_id: &str) -> String {
        format!("{}_{}", self.id, instance_id)
    }

    /// Creates a concrete job.
    ///
    /// `job_id` defaults to [`instance_job_id`](Self::instance_job_id).
    ///
    /// # Errors
    /// [`ScheduleError::UnknownOperation`] if a precedence entry names a
    /// template operation that does not exist.
    pub fn instantiate(&self, instance_id: &str, job_id: Option<&str>) -> ScheduleResult<Job> {
        let job_id = job_id
            .map(str::to_string)
            .unwrap_or_else(|| self.instance_job_id(instance_id));
        let op_id = |tid: &str| format!("{job_id}_{tid}");

        let mut job = Job::new(job_id.clone());
        job.metadata = self.metadata.clone();

        for t in &self.operations {
            let mut op = Operation::new(op_id(&t.template_id), job_id.clone(), t.duration_secs);
            op.requirements = t.requirements.clone();
            op.metadata = t.metadata.clone();
            for p in &t.precedence {
                if !self.operations.iter().any(|o| &o.template_id == p) {
                    return Err(ScheduleError::UnknownOperation(p.clone()));
                }
                op.predecessors.push(op_id(p));
            }
            job.operations.push(op);
        }
        Ok(job)
    }
}
