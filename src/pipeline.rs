use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::duration::{self, DurationError};
use crate::error::ReasonerError;
use crate::oms::{
    Credentials, LocationId, OmsGateway, OutageRecord, PendingFilter, Session, Submission,
};
use crate::pager::{self, PagerSettings};
use crate::rules::{DurationRule, RuleBook};

/// Picks the pole an outage is attributed to.
pub trait CandidateSelector {
    /// Returns `None` only when `candidates` is empty.
    fn select(&mut self, candidates: &[LocationId]) -> Option<LocationId>;
}

/// Uniform choice over the candidates.
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible selector for tests and dry runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateSelector for RandomSelector {
    fn select(&mut self, candidates: &[LocationId]) -> Option<LocationId> {
        candidates.choose(&mut self.rng).copied()
    }
}

/// An outage with its resolved duration and matching rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedOutage {
    pub record: OutageRecord,
    pub elapsed_hours: f64,
    pub rule: DurationRule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Unresolvable(DurationError),
    /// Past every bucket and outside every tolerance band.
    Unmatched { hours: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOutage {
    pub record: OutageRecord,
    pub reason: SkipReason,
}

/// Result of classifying one fetched batch, in fetch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub classified: Vec<ClassifiedOutage>,
    pub skipped: Vec<SkippedOutage>,
}

/// Resolves and classifies every record. Nothing here fails the run:
/// records that cannot be placed are collected as skipped.
pub fn classify_outages(
    records: Vec<OutageRecord>,
    rules: &RuleBook,
    now: DateTime<Utc>,
) -> Classification {
    let mut result = Classification::default();
    for record in records {
        let hours = match duration::resolve_at(&record, now) {
            Ok(hours) => hours,
            Err(err) => {
                warn!(outage_id = %record.id, error = %err, "skipping outage: duration unresolvable");
                result.skipped.push(SkippedOutage {
                    record,
                    reason: SkipReason::Unresolvable(err),
                });
                continue;
            }
        };
        match rules.classify(hours) {
            Some(rule) => {
                debug!(outage_id = %record.id, hours, bucket = %rule.label, "classified");
                result.classified.push(ClassifiedOutage {
                    record,
                    elapsed_hours: hours,
                    rule,
                });
            }
            None => {
                warn!(outage_id = %record.id, hours, "skipping outage: no matching duration rule");
                result.skipped.push(SkippedOutage {
                    record,
                    reason: SkipReason::Unmatched { hours },
                });
            }
        }
    }
    result
}

#[derive(Debug)]
pub enum OutageOutcome {
    Submitted { location_id: LocationId },
    /// A pole was picked but nothing was sent.
    DryRun { location_id: LocationId },
    Failed(ReasonerError),
}

impl OutageOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, OutageOutcome::Failed(_))
    }
}

#[derive(Debug)]
pub struct OutageReport {
    pub outage_id: String,
    pub reason_code: u32,
    pub outcome: OutageOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Classified outages that went through lookup and submission.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Outages left out before processing (unresolvable or unmatched).
    pub skipped: usize,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub outages: Vec<OutageReport>,
}

/// Hooks for the presentation layer. Every method defaults to doing nothing.
pub trait ProgressReporter {
    fn classified(&self, _classification: &Classification) {}
    fn outage_started(&self, _index: usize, _total: usize, _outage: &ClassifiedOutage) {}
    fn outage_finished(&self, _outage: &ClassifiedOutage, _outcome: &OutageOutcome) {}
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Only poles of this type are candidates; `None` accepts any pole.
    pub pole_type: Option<String>,
    /// Fixed pause between processed outages.
    pub outage_delay: Duration,
    pub dry_run: bool,
}

/// Drives a run: login, fetch, classify, then attribute and submit each outage.
pub struct Pipeline<'a, G, S> {
    gateway: &'a G,
    rules: &'a RuleBook,
    settings: PipelineSettings,
    selector: S,
}

impl<'a, G: OmsGateway, S: CandidateSelector> Pipeline<'a, G, S> {
    pub fn new(
        gateway: &'a G,
        rules: &'a RuleBook,
        settings: PipelineSettings,
        selector: S,
    ) -> Self {
        Self {
            gateway,
            rules,
            settings,
            selector,
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ReasonerError> {
        self.gateway
            .login(credentials)
            .await
            .map_err(ReasonerError::Auth)
    }

    pub async fn fetch(
        &self,
        session: &Session,
        filter: &PendingFilter,
        pager: &PagerSettings,
    ) -> Result<Vec<OutageRecord>, ReasonerError> {
        let records = pager::fetch_all(self.gateway, session, filter, pager)
            .await
            .map_err(ReasonerError::Fetch)?;
        info!(count = records.len(), "fetched pending outages");
        Ok(records)
    }

    pub fn classify(&self, records: Vec<OutageRecord>, now: DateTime<Utc>) -> Classification {
        classify_outages(records, self.rules, now)
    }

    /// The whole workflow. Only login and fetch errors are returned;
    /// per-outage failures are counted in the report.
    pub async fn run(
        &mut self,
        credentials: &Credentials,
        filter: &PendingFilter,
        pager: &PagerSettings,
        reporter: &impl ProgressReporter,
    ) -> Result<RunReport, ReasonerError> {
        let session = self.login(credentials).await?;
        let records = self.fetch(&session, filter, pager).await?;
        let classification = self.classify(records, Utc::now());
        reporter.classified(&classification);
        Ok(self.process(&session, &classification, reporter).await)
    }

    /// Looks up, picks and submits each classified outage in order.
    /// Submissions already made stay made if a later one fails.
    pub async fn process(
        &mut self,
        session: &Session,
        classification: &Classification,
        reporter: &impl ProgressReporter,
    ) -> RunReport {
        let outages = &classification.classified;
        let total = outages.len();
        let mut summary = RunSummary {
            total,
            skipped: classification.skipped.len(),
            dry_run: self.settings.dry_run,
            ..RunSummary::default()
        };
        let mut reports = Vec::with_capacity(total);

        for (index, outage) in outages.iter().enumerate() {
            reporter.outage_started(index, total, outage);
            info!(
                "[{}/{}] outage {} | {:.2}h | reason_id={}",
                index + 1,
                total,
                outage.record.id,
                outage.elapsed_hours,
                outage.rule.reason_code
            );

            let outcome = match self.attribute(session, outage).await {
                Ok(outcome) => outcome,
                Err(err) => OutageOutcome::Failed(err),
            };
            match &outcome {
                OutageOutcome::Submitted { location_id } => {
                    info!(outage_id = %outage.record.id, location_id, "submitted");
                    summary.succeeded += 1;
                }
                OutageOutcome::DryRun { location_id } => {
                    info!(outage_id = %outage.record.id, location_id, "dry run, not submitted");
                    summary.succeeded += 1;
                }
                OutageOutcome::Failed(err) => {
                    warn!(outage_id = %outage.record.id, error = %err, "outage failed");
                    summary.failed += 1;
                }
            }
            reporter.outage_finished(outage, &outcome);
            reports.push(OutageReport {
                outage_id: outage.record.id.clone(),
                reason_code: outage.rule.reason_code,
                outcome,
            });

            if index + 1 < total && !self.settings.outage_delay.is_zero() {
                sleep(self.settings.outage_delay).await;
            }
        }

        RunReport {
            summary,
            outages: reports,
        }
    }

    async fn attribute(
        &mut self,
        session: &Session,
        outage: &ClassifiedOutage,
    ) -> Result<OutageOutcome, ReasonerError> {
        let record = &outage.record;
        let candidates = self
            .gateway
            .fetch_location_candidates(
                session,
                &record.id,
                record.feeder(),
                self.settings.pole_type.as_deref(),
            )
            .await
            .map_err(|source| ReasonerError::Locations {
                outage_id: record.id.clone(),
                source,
            })?;

        let location_id = self
            .selector
            .select(&candidates)
            .ok_or_else(|| ReasonerError::EmptyCandidateSet(record.id.clone()))?;
        debug!(location_id, poles = candidates.len(), "picked pole");

        if self.settings.dry_run {
            return Ok(OutageOutcome::DryRun { location_id });
        }

        let submission = Submission {
            outage_id: record.id.clone(),
            location_id,
            reason_code: outage.rule.reason_code,
        };
        self.gateway
            .submit_classification(session, &submission)
            .await
            .map_err(|source| ReasonerError::Submit {
                outage_id: record.id.clone(),
                source,
            })?;
        Ok(OutageOutcome::Submitted { location_id })
    }
}
