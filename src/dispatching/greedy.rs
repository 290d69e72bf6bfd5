//! Greedy dispatch with single-eviction repair.
//!
//! # Algorithm
//!
//! 1. **Fill.** Each round collects the ready operations, finds each one's
//!    earliest slot inside the dispatch day, ranks them with the rule
//!    engine and commits the best. Stops when no ready operation fits.
//! 2. **Repair.** Unscheduled operations with all predecessors placed are
//!    taken in descending value order. Each is first placed directly if
//!    possible; otherwise single bookings of lower value, sharing one of
//!    its resources and without successors, are evicted one at a time.
//!    The eviction sticks only if the operation is then placed over the
//!    freed interval; otherwise the evicted booking is restored as it was.
//! 3. Fill again, so evicted operations get a chance elsewhere.
//!
//! Value is `bucket weight × hours^gamma` (see
//! [`ScoreConfig::value_of`](crate::config::ScoreConfig::value_of)).
//!
//! # Complexity
//! One round costs one any-resource slot search per ready operation.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

use super::{Candidate, DispatchContext, RuleEngine, RuleScore};
use crate::config::DispatchConfig;
use crate::error::ScheduleResult;
use crate::models::Operation;
use crate::schedule::{Schedule, SlotCandidate};

/// One dispatch round as seen by an observer.
#[derive(Debug, Clone, Copy)]
pub struct Decision<'a> {
    /// Round number, from 0.
    pub round: usize,
    /// Every candidate considered this round.
    pub candidates: &'a [Candidate],
    /// Candidate indices, best first.
    pub ranking: &'a [usize],
    /// Engine score per candidate, aligned with `candidates`.
    pub scores: &'a [RuleScore],
}

impl Decision<'_> {
    /// The candidate that was committed.
    pub fn chosen(&self) -> Option<&Candidate> {
        self.ranking.first().map(|&i| &self.candidates[i])
    }
}

/// Outcome of a dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Fill rounds that committed an operation.
    pub rounds: usize,
    /// Operations committed by fill rounds, in order.
    pub placed: Vec<String>,
    /// Operations committed by the repair pass.
    pub repaired: Vec<String>,
    /// Operations evicted by the repair pass.
    pub evicted: Vec<String>,
    /// Operations left unscheduled at the end, sorted.
    pub unscheduled: Vec<String>,
}

type Observer = Box<dyn FnMut(&Decision<'_>)>;

/// Greedy priority dispatcher.
///
/// # Example
/// ```
/// use u_jobshop::config::DispatchConfig;
/// use u_jobshop::dispatching::GreedyDispatcher;
/// use u_jobshop::models::{Job, Operation, Resource};
/// use u_jobshop::schedule::Schedule;
///
/// let mut schedule = Schedule::new();
/// schedule.add_resource(Resource::new("S1", "site"));
/// schedule.add_job(Job::new("V1").with_operation(
///     Operation::new("T1", "V1", 3600).with_resource("site", ["S1"]),
/// ));
///
/// let mut dispatcher = GreedyDispatcher::new(DispatchConfig::for_day(0, 8 * 3600));
/// let report = dispatcher.run(&mut schedule).unwrap();
/// assert_eq!(report.placed, ["T1"]);
/// assert!(report.unscheduled.is_empty());
/// ```
pub struct GreedyDispatcher {
    engine: RuleEngine,
    config: DispatchConfig,
    observer: Option<Observer>,
}

impl GreedyDispatcher {
    /// Dispatcher with the weighted default engine.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            engine: RuleEngine::weighted_default(),
            config,
            observer: None,
        }
    }

    /// Replaces the ranking engine.
    pub fn with_engine(mut self, engine: RuleEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Installs a callback receiving every fill round's ranking.
    pub fn with_observer(mut self, observer: impl FnMut(&Decision<'_>) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Settings.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Fill, then repair and refill up to `repair_rounds` times.
    ///
    /// Builds a [`DispatchContext`] from the schedule.
    ///
    /// # Errors
    /// Invalid day bounds, or a hard error from the schedule.
    pub fn run(&mut self, schedule: &mut Schedule) -> ScheduleResult<DispatchReport> {
        self.config.validate()?;
        let ctx = DispatchContext::from_schedule(schedule, self.config.day_start, self.config.day_end);
        self.run_with_context(schedule, &ctx)
    }

    /// Like [`run`](Self::run) with a caller-built context.
    ///
    /// Slot searches are capped at the context's day end for the duration
    /// of the run.
    pub fn run_with_context(
        &mut self,
        schedule: &mut Schedule,
        ctx: &DispatchContext,
    ) -> ScheduleResult<DispatchReport> {
        let saved = *schedule.limits();
        let horizon = saved.horizon.map_or(ctx.day_end, |h| h.min(ctx.day_end));
        schedule.set_limits(saved.with_horizon(horizon));

        let result = self.dispatch(schedule, ctx);
        schedule.set_limits(saved);
        result
    }

    fn dispatch(&mut self, schedule: &mut Schedule, ctx: &DispatchContext) -> ScheduleResult<DispatchReport> {
        let mut report = DispatchReport::default();
        self.fill(schedule, ctx, &mut report)?;
        for pass in 0..self.config.repair_rounds {
            if !self.repair(schedule, ctx, &mut report)? {
                debug!(pass, "repair pass changed nothing");
                break;
            }
            self.fill(schedule, ctx, &mut report)?;
        }

        let mut unscheduled: Vec<String> = schedule.unscheduled_operations().map(|o| o.id.clone()).collect();
        unscheduled.sort();
        report.unscheduled = unscheduled;
        info!(
            rounds = report.rounds,
            placed = report.placed.len(),
            repaired = report.repaired.len(),
            evicted = report.evicted.len(),
            unscheduled = report.unscheduled.len(),
            "dispatch finished"
        );
        Ok(report)
    }

    /// Earliest in-day candidates for every ready operation.
    pub fn candidates(
        &self,
        schedule: &Schedule,
        ctx: &DispatchContext,
        skip: &HashSet<String>,
    ) -> ScheduleResult<Vec<Candidate>> {
        let mut out = Vec::new();
        for op in schedule.ready_operations() {
            if skip.contains(&op.id) {
                continue;
            }
            if let Some(slot) = in_day_slot(schedule, ctx, op)? {
                out.push(Candidate::new(op, slot));
            }
        }
        Ok(out)
    }

    fn fill(
        &mut self,
        schedule: &mut Schedule,
        ctx: &DispatchContext,
        report: &mut DispatchReport,
    ) -> ScheduleResult<()> {
        let mut skip: HashSet<String> = HashSet::new();
        loop {
            let candidates = self.candidates(schedule, ctx, &skip)?;
            if candidates.is_empty() {
                return Ok(());
            }
            let ranking = self.engine.sort_indices(&candidates, ctx);
            let scores: Vec<RuleScore> = candidates.iter().map(|c| self.engine.score(c, ctx)).collect();
            if let Some(observer) = self.observer.as_mut() {
                observer(&Decision {
                    round: report.rounds,
                    candidates: &candidates,
                    ranking: &ranking,
                    scores: &scores,
                });
            }

            let Some(best) = ranking.first().map(|&i| &candidates[i]) else {
                return Ok(());
            };
            let placement =
                schedule.schedule_operation_multi(&best.operation_id, &best.slot.assignment, best.slot.start)?;
            if placement.is_placed() {
                debug!(
                    round = report.rounds,
                    operation = %best.operation_id,
                    start = best.slot.start,
                    end = best.slot.end,
                    "dispatched"
                );
                report.rounds += 1;
                report.placed.push(best.operation_id.clone());
            } else {
                debug!(operation = %best.operation_id, ?placement, "candidate rejected at commit, skipping");
                skip.insert(best.operation_id.clone());
            }
        }
    }

    /// One repair pass. Returns whether anything was placed.
    fn repair(
        &mut self,
        schedule: &mut Schedule,
        ctx: &DispatchContext,
        report: &mut DispatchReport,
    ) -> ScheduleResult<bool> {
        let score = &self.config.score;
        let mut pool: Vec<(f64, String)> = schedule
            .ready_operations()
            .into_iter()
            .map(|op| (score.value_of(op), op.id.clone()))
            .collect();
        pool.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        pool.truncate(self.config.max_repair_candidates);

        let mut changed = false;
        for (value, op_id) in pool {
            if schedule.operation(&op_id).map_or(true, Operation::is_scheduled) {
                continue;
            }
            if let Some(slot) = in_day_slot(schedule, ctx, schedule.require_operation(&op_id)?)? {
                if schedule
                    .schedule_operation_multi(&op_id, &slot.assignment, slot.start)?
                    .is_placed()
                {
                    debug!(operation = %op_id, start = slot.start, "repair placed directly");
                    report.repaired.push(op_id);
                    changed = true;
                    continue;
                }
            }
            if let Some(victim) = self.evict_for(schedule, ctx, &op_id, value)? {
                info!(operation = %op_id, evicted = %victim, value, "repair eviction");
                report.repaired.push(op_id);
                report.evicted.push(victim);
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Tries single evictions for `op_id`. Returns the evicted ID on success.
    fn evict_for(
        &self,
        schedule: &mut Schedule,
        ctx: &DispatchContext,
        op_id: &str,
        value: f64,
    ) -> ScheduleResult<Option<String>> {
        let op = schedule.require_operation(op_id)?;
        let wanted: Vec<&str> = op.candidate_resources();
        let score = &self.config.score;

        let mut victims: Vec<(f64, Operation)> = schedule
            .scheduled_operations()
            .filter(|v| v.assignment.resource_ids().any(|r| wanted.contains(&r)))
            .filter(|v| schedule.successors_of(&v.id).next().is_none())
            .map(|v| (score.value_of(v), v.clone()))
            .filter(|(v_value, _)| *v_value < value)
            .collect();
        victims.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        for (_, snapshot) in victims {
            schedule.release(&snapshot.id);
            let attempt = Self::place_over(schedule, ctx, op_id, &snapshot);
            if matches!(attempt, Ok(true)) {
                return Ok(Some(snapshot.id));
            }
            if !schedule.reinstate(&snapshot)? {
                warn!(operation = %snapshot.id, "could not restore evicted operation");
            }
            attempt?;
        }
        Ok(None)
    }

    /// Places `op_id` if its earliest in-day slot reuses the room freed by
    /// `evicted`.
    fn place_over(
        schedule: &mut Schedule,
        ctx: &DispatchContext,
        op_id: &str,
        evicted: &Operation,
    ) -> ScheduleResult<bool> {
        let op = schedule.require_operation(op_id)?;
        let Some(slot) = in_day_slot(schedule, ctx, op)? else {
            return Ok(false);
        };
        let Some(freed) = evicted.interval() else {
            return Ok(false);
        };
        let reuses = slot.start < freed.end
            && freed.start < slot.end
            && slot.assignment.resource_ids().any(|r| evicted.assignment.contains(r));
        if !reuses {
            return Ok(false);
        }
        Ok(schedule
            .schedule_operation_multi(op_id, &slot.assignment, slot.start)?
            .is_placed())
    }
}

impl fmt::Debug for GreedyDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreedyDispatcher")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

fn in_day_slot(
    schedule: &Schedule,
    ctx: &DispatchContext,
    op: &Operation,
) -> ScheduleResult<Option<SlotCandidate>> {
    Ok(schedule
        .find_earliest_slot_any_resource(&op.id, ctx.day_start)?
        .filter(|slot| slot.start >= ctx.day_start && slot.end <= ctx.day_end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatching::{rules, TieBreaker};
    use crate::models::{Job, Resource};
    use std::cell::RefCell;
    use std::rc::Rc;

    const H: i64 = 3600;

    fn single_op_job(job: &str, op: &str, hours: i64, priority: i32, site: &str) -> Job {
        Job::new(job).with_operation(
            Operation::new(op, job, hours * H)
                .with_resource("site", [site])
                .with_metadata("priority", priority),
        )
    }

    #[test]
    fn test_fill_orders_by_priority() {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("S1", "site"));
        s.add_job(single_op_job("J1", "A", 2, 1, "S1"));
        s.add_job(single_op_job("J2", "B", 2, 5, "S1"));
        s.add_job(single_op_job("J3", "C", 2, 3, "S1"));

        let mut d = GreedyDispatcher::new(DispatchConfig::for_day(0, 8 * H));
        let report = d.run(&mut s).unwrap();
        assert_eq!(report.placed, ["A", "C", "B"]);
        assert_eq!(report.rounds, 3);
        assert_eq!(s.operation("A").unwrap().start, Some(0));
        assert_eq!(s.operation("C").unwrap().start, Some(2 * H));
        assert_eq!(s.operation("B").unwrap().start, Some(4 * H));
    }

    #[test]
    fn test_day_end_leaves_leftovers() {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("S1", "site"));
        s.add_job(single_op_job("J1", "A", 3, 1, "S1"));
        s.add_job(single_op_job("J2", "B", 2, 5, "S1"));

        let mut d = GreedyDispatcher::new(DispatchConfig::for_day(0, 4 * H));
        let report = d.run(&mut s).unwrap();
        assert_eq!(report.placed, ["A"]);
        assert_eq!(report.unscheduled, ["B"]);
        // Horizon is restored after the run.
        assert_eq!(s.limits().horizon, None);
    }

    #[test]
    fn test_precedence_respected() {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("S1", "site"));
        s.add_resource(Resource::new("S2", "site"));
        s.add_job(
            Job::new("J1")
                .with_operation(Operation::new("A", "J1", 2 * H).with_resource("site", ["S1"]))
                .with_operation(
                    Operation::new("B", "J1", H)
                        .with_resource("site", ["S2"])
                        .with_predecessor("A"),
                ),
        );

        let mut d = GreedyDispatcher::new(DispatchConfig::for_day(0, 8 * H));
        let report = d.run(&mut s).unwrap();
        assert_eq!(report.placed, ["A", "B"]);
        assert_eq!(s.operation("B").unwrap().start, Some(2 * H));
    }

    #[test]
    fn test_observer_sees_every_round() {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("S1", "site"));
        s.add_job(single_op_job("J1", "A", 1, 2, "S1"));
        s.add_job(single_op_job("J2", "B", 1, 1, "S1"));

        let seen: Rc<RefCell<Vec<(usize, usize, String)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut d = GreedyDispatcher::new(DispatchConfig::for_day(0, 8 * H)).with_observer(move |dec| {
            let chosen = dec.chosen().map(|c| c.operation_id.clone()).unwrap_or_default();
            assert_eq!(dec.scores.len(), dec.candidates.len());
            sink.borrow_mut().push((dec.round, dec.candidates.len(), chosen));
        });
        d.run(&mut s).unwrap();

        let seen = seen.borrow();
        assert_eq!(
            *seen,
            vec![(0, 2, "B".to_string()), (1, 1, "A".to_string())]
        );
    }

    fn repair_problem() -> Schedule {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("S1", "site"));
        s.add_resource(Resource::new("S2", "site"));
        s.add_job(single_op_job("J1", "L", 2, 5, "S1"));
        s.add_job(
            Job::new("J2")
                .with_operation(Operation::new("P", "J2", H).with_resource("site", ["S2"]))
                .with_operation(
                    Operation::new("H", "J2", 3 * H)
                        .with_resource("site", ["S1"])
                        .with_predecessor("P")
                        .with_metadata("priority", 1),
                ),
        );
        s
    }

    fn earliest_first() -> RuleEngine {
        RuleEngine::new()
            .with_rule(rules::EarliestStart)
            .with_final_tie_breaker(TieBreaker::ById)
    }

    #[test]
    fn test_repair_evicts_lower_value() {
        let mut s = repair_problem();
        let mut d = GreedyDispatcher::new(DispatchConfig::for_day(0, 4 * H)).with_engine(earliest_first());
        let report = d.run(&mut s).unwrap();

        assert_eq!(report.placed, ["L", "P"]);
        assert_eq!(report.repaired, ["H"]);
        assert_eq!(report.evicted, ["L"]);
        assert_eq!(report.unscheduled, ["L"]);
        assert_eq!(s.operation("H").unwrap().start, Some(H));
        assert!(!s.resource("S1").unwrap().holds("L"));
    }

    #[test]
    fn test_repair_disabled() {
        let mut s = repair_problem();
        let config = DispatchConfig {
            repair_rounds: 0,
            ..DispatchConfig::for_day(0, 4 * H)
        };
        let report = GreedyDispatcher::new(config)
            .with_engine(earliest_first())
            .run(&mut s)
            .unwrap();
        assert_eq!(report.unscheduled, ["H"]);
        assert!(report.evicted.is_empty());
    }

    #[test]
    fn test_failed_eviction_restores_victim() {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("S1", "site"));
        s.add_job(single_op_job("J1", "L", 2, 5, "S1"));
        // Five hours never fit a four-hour day.
        s.add_job(single_op_job("J2", "BIG", 5, 1, "S1"));

        let mut d = GreedyDispatcher::new(DispatchConfig::for_day(0, 4 * H));
        let report = d.run(&mut s).unwrap();
        assert!(report.evicted.is_empty());
        assert_eq!(report.unscheduled, ["BIG"]);
        let l = s.operation("L").unwrap();
        assert_eq!((l.start, l.end), (Some(0), Some(2 * H)));
        assert!(s.resource("S1").unwrap().holds("L"));
    }

    #[test]
    fn test_invalid_day() {
        let mut s = Schedule::new();
        let mut d = GreedyDispatcher::new(DispatchConfig::for_day(10, 10));
        assert!(d.run(&mut s).is_err());
    }
}
