//! Job-by-job placement.
//!
//! # Algorithm
//!
//! 1. Jobs are placed one at a time in the given order.
//! 2. Within a job, operations go in job order at their earliest feasible
//!    slot on any eligible resource combination.
//! 3. A job runs as a no-wait chain when a blocking rule is active on the
//!    schedule, when its template is blocking, or when the scheduler is
//!    told to.
//! 4. A job that cannot be fully placed is rolled back.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 7: Job Shops

use tracing::{debug, info};

use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{JobTemplate, Timestamp};
use crate::schedule::{ChainStep, Schedule};

/// Committed steps of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlacement {
    /// Job ID.
    pub job_id: String,
    /// Steps in job order.
    pub steps: Vec<ChainStep>,
}

impl JobPlacement {
    /// Start of the first step.
    pub fn start(&self) -> Option<Timestamp> {
        self.steps.iter().map(|s| s.start).min()
    }

    /// End of the last step.
    pub fn end(&self) -> Option<Timestamp> {
        self.steps.iter().map(|s| s.end).max()
    }
}

/// Outcome of placing several jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequentialReport {
    /// Fully placed jobs, in order.
    pub placed: Vec<JobPlacement>,
    /// Jobs that did not fit and were rolled back.
    pub failed: Vec<String>,
}

/// Places whole jobs one after another.
///
/// # Example
///
/// ```
/// use u_jobshop::models::{JobTemplate, OperationTemplate, Resource};
/// use u_jobshop::schedule::Schedule;
/// use u_jobshop::scheduler::SequentialScheduler;
///
/// let template = JobTemplate::new("JOB_A")
///     .with_operation(OperationTemplate::new("OP1", 900).with_resource("processing", ["R1"]))
///     .with_operation(
///         OperationTemplate::new("OP2", 900)
///             .with_resource("packaging", ["R2"])
///             .with_predecessor("OP1"),
///     )
///     .with_blocking(true);
///
/// let mut schedule = Schedule::new();
/// schedule.add_resource(Resource::new("R1", "processing"));
/// schedule.add_resource(Resource::new("R2", "packaging"));
///
/// let scheduler = SequentialScheduler::new();
/// let placed = scheduler
///     .schedule_job_template(&mut schedule, &template, "1", 0)
///     .unwrap()
///     .unwrap();
/// assert_eq!(placed.job_id, "JOB_A_1");
/// assert_eq!(placed.end(), Some(1800));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialScheduler {
    force_no_wait: bool,
}

impl SequentialScheduler {
    /// Creates a scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every job as a no-wait chain.
    pub fn with_no_wait(mut self, no_wait: bool) -> Self {
        self.force_no_wait = no_wait;
        self
    }

    /// Places every unscheduled operation of `job_id` no earlier than
    /// `earliest`.
    ///
    /// Returns `None` (and leaves the job unscheduled) if some operation
    /// has no slot.
    ///
    /// # Errors
    /// [`ScheduleError::UnknownJob`] or a hard error from the schedule.
    pub fn schedule_job(
        &self,
        schedule: &mut Schedule,
        job_id: &str,
        earliest: Timestamp,
    ) -> ScheduleResult<Option<JobPlacement>> {
        let no_wait = self.force_no_wait || schedule.has_blocking_constraint();
        self.place(schedule, job_id, earliest, no_wait)
    }

    /// Instantiates `template`, registers the job and places it.
    ///
    /// The job ID is `"{template}_{instance}"`. The job stays registered
    /// even when it does not fit.
    pub fn schedule_job_template(
        &self,
        schedule: &mut Schedule,
        template: &JobTemplate,
        instance_id: &str,
        earliest: Timestamp,
    ) -> ScheduleResult<Option<JobPlacement>> {
        let job = template.instantiate(instance_id, None)?;
        let job_id = job.id.clone();
        schedule.add_job(job);
        let no_wait = template.blocking || self.force_no_wait || schedule.has_blocking_constraint();
        self.place(schedule, &job_id, earliest, no_wait)
    }

    /// Places jobs in the given order.
    pub fn schedule_jobs(
        &self,
        schedule: &mut Schedule,
        job_ids: &[&str],
        earliest: Timestamp,
    ) -> ScheduleResult<SequentialReport> {
        let mut report = SequentialReport::default();
        for job_id in job_ids {
            match self.schedule_job(schedule, job_id, earliest)? {
                Some(placement) => report.placed.push(placement),
                None => report.failed.push(job_id.to_string()),
            }
        }
        info!(
            placed = report.placed.len(),
            failed = report.failed.len(),
            "sequential placement finished"
        );
        Ok(report)
    }

    fn place(
        &self,
        schedule: &mut Schedule,
        job_id: &str,
        earliest: Timestamp,
        no_wait: bool,
    ) -> ScheduleResult<Option<JobPlacement>> {
        let job = schedule
            .job(job_id)
            .ok_or_else(|| ScheduleError::UnknownJob(job_id.to_string()))?;
        let op_ids: Vec<String> = job.unscheduled_operations().map(|o| o.id.clone()).collect();
        let ids: Vec<&str> = op_ids.iter().map(String::as_str).collect();

        let steps = if no_wait {
            schedule.schedule_no_wait_chain(&ids, earliest)?
        } else {
            place_in_order(schedule, &ids, earliest)?
        };
        match steps {
            Some(steps) => {
                debug!(job = job_id, operations = steps.len(), no_wait, "job placed");
                Ok(Some(JobPlacement {
                    job_id: job_id.to_string(),
                    steps,
                }))
            }
            None => {
                debug!(job = job_id, no_wait, "job does not fit, rolled back");
                Ok(None)
            }
        }
    }
}

/// Earliest slot per operation in order; all-or-nothing.
fn place_in_order(
    schedule: &mut Schedule,
    op_ids: &[&str],
    earliest: Timestamp,
) -> ScheduleResult<Option<Vec<ChainStep>>> {
    let mut steps: Vec<ChainStep> = Vec::with_capacity(op_ids.len());
    for id in op_ids {
        let placed = match schedule.find_earliest_slot_any_resource(id, earliest)? {
            Some(slot) => schedule
                .schedule_operation_multi(id, &slot.assignment, slot.start)?
                .is_placed()
                .then(|| ChainStep {
                    operation_id: id.to_string(),
                    start: slot.start,
                    end: slot.end,
                    assignment: slot.assignment,
                }),
            None => None,
        };
        match placed {
            Some(step) => steps.push(step),
            None => {
                for done in steps.iter().rev() {
                    schedule.unschedule_operation(&done.operation_id)?;
                }
                return Ok(None);
            }
        }
    }
    Ok(Some(steps))
}
