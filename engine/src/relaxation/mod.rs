//! Progressive constraint relaxation
//!
//! A gene starts with the strict template. After every attempt the controller
//! decides whether to stop or loosen exactly one more constraint and search
//! again. The ladder is fixed and strictly ordered:
//!
//! | Stage | Label | Fires when | Change |
//! |---|---|---|---|
//! | `Strict` | `strict` | always | none |
//! | `IntronRemoved` | (kept) | template has no intron | drop `SPAN_INTRON` |
//! | `Gc1` | `GC1` | no primers or off-targets | `GC_CLAMP=1` |
//! | `Gc0` | `GC0` | no primers or off-targets | `GC_CLAMP=0` |
//! | `GcContent` | `GC_content` | no primers or off-targets | GC band 35–65 |
//! | `LowTm` | `Low_TM` | no primers or off-targets | `PRIMER_MIN_TM=52` |
//! | `PotentialDimers` | `Potential_Dimers` | no primers or off-targets | `SELF_ANY=5`, `SELF_END=2` |
//! | `ProbableDimers` | `Probable_Dimers` | no primers or off-targets | `SELF_ANY=8`, `SELF_END=3` |
//! | `NoRepeatFilter` | `No_repeat_filter` | no primers or off-targets | drop `LOW_COMPLEXITY_FILTER` |
//!
//! The intron stage depends only on the intron verdict, so it also fires
//! after an otherwise acceptable strict attempt. Every change is applied to
//! the previous attempt's parameters, so earlier relaxations persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use sdk::types::ParameterSet;

use crate::attempt::{Attempt, AttemptRunner, Status};
use crate::blast::Result;

/// Position on the relaxation ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Strict,
    IntronRemoved,
    Gc1,
    Gc0,
    GcContent,
    LowTm,
    PotentialDimers,
    ProbableDimers,
    NoRepeatFilter,
}

impl Stage {
    /// Every stage in ladder order
    pub const ALL: [Stage; 9] = [
        Stage::Strict,
        Stage::IntronRemoved,
        Stage::Gc1,
        Stage::Gc0,
        Stage::GcContent,
        Stage::LowTm,
        Stage::PotentialDimers,
        Stage::ProbableDimers,
        Stage::NoRepeatFilter,
    ];

    /// Label attempts of this stage run under
    ///
    /// `None` for the intron stage, which keeps the previous label.
    pub fn status(&self) -> Option<Status> {
        match self {
            Stage::Strict => Some(Status::Strict),
            Stage::IntronRemoved => None,
            Stage::Gc1 => Some(Status::Gc1),
            Stage::Gc0 => Some(Status::Gc0),
            Stage::GcContent => Some(Status::GcContent),
            Stage::LowTm => Some(Status::LowTm),
            Stage::PotentialDimers => Some(Status::PotentialDimers),
            Stage::ProbableDimers => Some(Status::ProbableDimers),
            Stage::NoRepeatFilter => Some(Status::NoRepeatFilter),
        }
    }

    /// Human-readable description used in progress notices
    pub fn notice(&self) -> &'static str {
        match self {
            Stage::Strict => "Running strict search",
            Stage::IntronRemoved => "Record has no introns, dropping intron span",
            Stage::Gc1 => "Relaxing GC clamp to 1",
            Stage::Gc0 => "Disabling GC clamp",
            Stage::GcContent => "Relaxing GC content",
            Stage::LowTm => "Relaxing primer TM",
            Stage::PotentialDimers => "Relaxing primer self-complementarity",
            Stage::ProbableDimers => "Using default primer self-complementarity (caution)",
            Stage::NoRepeatFilter => "Disabling repeat filter",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status() {
            Some(status) => write!(f, "{}", status),
            None => f.write_str("no_intron_span"),
        }
    }
}

/// One parameter change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Drop a constraint entirely
    Remove(&'static str),

    /// Set constraints to new values
    Set(&'static [(&'static str, &'static str)]),
}

impl Mutation {
    /// Derive the next parameter set; `parameters` is left untouched
    pub fn apply(&self, parameters: &ParameterSet) -> ParameterSet {
        match self {
            Mutation::Remove(key) => parameters.without(key),
            Mutation::Set(pairs) => pairs
                .iter()
                .fold(parameters.clone(), |next, (key, value)| next.with(*key, *value)),
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Remove(key) => write!(f, "remove {}", key),
            Mutation::Set(pairs) => {
                let assignments: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "set {}", assignments.join(", "))
            }
        }
    }
}

/// A rung of the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaxationStep {
    pub stage: Stage,
    pub mutation: Mutation,
}

impl RelaxationStep {
    pub fn apply(&self, parameters: &ParameterSet) -> ParameterSet {
        self.mutation.apply(parameters)
    }
}

/// Fires on the intron verdict alone
pub const INTRON_STEP: RelaxationStep = RelaxationStep {
    stage: Stage::IntronRemoved,
    mutation: Mutation::Remove("SPAN_INTRON"),
};

/// Fires while primers are missing or off-target, in this order
pub const LADDER: [RelaxationStep; 7] = [
    RelaxationStep {
        stage: Stage::Gc1,
        mutation: Mutation::Set(&[("GC_CLAMP", "1")]),
    },
    RelaxationStep {
        stage: Stage::Gc0,
        mutation: Mutation::Set(&[("GC_CLAMP", "0")]),
    },
    RelaxationStep {
        stage: Stage::GcContent,
        mutation: Mutation::Set(&[("PRIMER_MIN_GC", "35"), ("PRIMER_MAX_GC", "65")]),
    },
    RelaxationStep {
        stage: Stage::LowTm,
        mutation: Mutation::Set(&[("PRIMER_MIN_TM", "52")]),
    },
    RelaxationStep {
        stage: Stage::PotentialDimers,
        mutation: Mutation::Set(&[("SELF_ANY", "5"), ("SELF_END", "2")]),
    },
    RelaxationStep {
        stage: Stage::ProbableDimers,
        mutation: Mutation::Set(&[("SELF_ANY", "8"), ("SELF_END", "3")]),
    },
    RelaxationStep {
        stage: Stage::NoRepeatFilter,
        mutation: Mutation::Remove("LOW_COMPLEXITY_FILTER"),
    },
];

/// Every step after the strict attempt, in ladder order
pub fn steps() -> impl Iterator<Item = &'static RelaxationStep> {
    std::iter::once(&INTRON_STEP).chain(LADDER.iter())
}

/// Final label for a finished attempt
///
/// Missing primers win over off-targets when both are set.
pub fn classify(attempt: &Attempt) -> Status {
    if attempt.flags.no_primers_found {
        Status::PrimerQualityTooLow
    } else if attempt.flags.off_targets {
        Status::NoSpecificPrimers
    } else {
        attempt.status
    }
}

/// Outcome of one gene's relaxation sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxationReport {
    pub target: String,

    /// Stages that ran, in order; always starts with `Strict`
    pub stages: Vec<Stage>,

    /// Last attempt, with its status replaced by the final classification
    pub attempt: Attempt,

    pub finished_at: DateTime<Utc>,
}

impl RelaxationReport {
    pub fn status(&self) -> Status {
        self.attempt.status
    }

    pub fn attempts(&self) -> usize {
        self.stages.len()
    }
}

/// Drives one gene through the ladder
#[derive(Clone)]
pub struct RelaxationController {
    runner: AttemptRunner,
}

impl RelaxationController {
    pub fn new(runner: AttemptRunner) -> Self {
        Self { runner }
    }

    /// Search for `target`, relaxing until primers are acceptable or the
    /// ladder is exhausted
    ///
    /// `template` is never modified; the sequence works on its own copies.
    /// Exhausting the ladder is not an error: the report's status says
    /// `primer_quality_too_low` or `no_specific_primers`.
    pub async fn run_iterative(
        &self,
        target: &str,
        template: &ParameterSet,
    ) -> Result<RelaxationReport> {
        let mut stages = vec![Stage::Strict];
        let mut attempt = self
            .runner
            .run(target, template.clone(), Status::Strict)
            .await?;

        if attempt.flags.has_no_intron {
            attempt = self.advance(target, &attempt, &INTRON_STEP).await?;
            stages.push(INTRON_STEP.stage);
        }

        for step in LADDER.iter() {
            if attempt.flags.is_acceptable() {
                break;
            }
            attempt = self.advance(target, &attempt, step).await?;
            stages.push(step.stage);
        }

        attempt.status = classify(&attempt);
        info!(
            gene = target,
            status = %attempt.status,
            attempts = stages.len(),
            "{}: finished as {}",
            target,
            attempt.status
        );

        Ok(RelaxationReport {
            target: target.to_string(),
            stages,
            attempt,
            finished_at: Utc::now(),
        })
    }

    async fn advance(
        &self,
        target: &str,
        previous: &Attempt,
        step: &RelaxationStep,
    ) -> Result<Attempt> {
        info!(
            gene = target,
            stage = %step.stage,
            "{}: {}",
            target,
            step.stage.notice()
        );

        let parameters = step.apply(&previous.parameters);
        let status = step.stage.status().unwrap_or(previous.status);
        self.runner.run(target, parameters, status).await
    }
}
