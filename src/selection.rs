//! Candidate Selection - Bounded Best-of-N Search
//!
//! A fold over at most `max_attempts` attempts that keeps the best-scoring
//! candidate and stops at the first one meeting the quality threshold.
//! Attempts run strictly in sequence. Errors from an attempt propagate
//! unchanged.

use std::ops::ControlFlow;

use tracing::debug;

/// One scored attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<T> {
    pub value: T,
    pub score: u8,
}

impl<T> Candidate<T> {
    pub fn new(value: T, score: u8) -> Self {
        Self { value, score }
    }
}

/// Result of a selection run.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<T> {
    pub best: T,
    pub score: u8,
    /// Attempts actually executed, including the winning one.
    pub attempts_used: u32,
    /// True when the run stopped because the threshold was met.
    pub threshold_met: bool,
}

/// How an attempt changed the running best.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Improved,
    Unchanged,
}

/// Run attempts `1..=max_attempts` and keep the best candidate.
///
/// `max_attempts` is raised to 1 so a result always exists. Ties keep the
/// earlier candidate, so the returned score never decreases as more
/// attempts are allowed.
pub fn select_best<T, E, F>(
    max_attempts: u32,
    quality_threshold: u8,
    mut attempt: F,
) -> Result<Selection<T>, E>
where
    F: FnMut(u32) -> Result<Candidate<T>, E>,
{
    let max_attempts = max_attempts.max(1);

    let first = attempt(1)?;
    debug!(attempt = 1, score = first.score, "initial candidate");
    let initial = Selection {
        threshold_met: first.score >= quality_threshold,
        best: first.value,
        score: first.score,
        attempts_used: 1,
    };
    if initial.threshold_met {
        return Ok(initial);
    }

    let flow = (2..=max_attempts).try_fold(initial, |best, n| {
        let candidate = match attempt(n) {
            Ok(candidate) => candidate,
            Err(e) => return ControlFlow::Break(Err(e)),
        };

        let (next, outcome) = if candidate.score > best.score {
            let next = Selection {
                best: candidate.value,
                score: candidate.score,
                attempts_used: n,
                threshold_met: candidate.score >= quality_threshold,
            };
            (next, AttemptOutcome::Improved)
        } else {
            (Selection { attempts_used: n, ..best }, AttemptOutcome::Unchanged)
        };
        debug!(attempt = n, score = candidate.score, best = next.score, ?outcome, "candidate scored");

        if next.threshold_met {
            ControlFlow::Break(Ok(next))
        } else {
            ControlFlow::Continue(next)
        }
    });

    match flow {
        ControlFlow::Break(result) => result,
        ControlFlow::Continue(selection) => Ok(selection),
    }
}
