//! Severity tiers computed from a patient's pain log.
//!
//! Each rule is a streak scan over the log, most recent entry first: the
//! first entry failing the rule's predicate ends the scan, and the rule
//! fires only if the uninterrupted run reaches back past its threshold.
//! Rules are tried in clinical priority order and the first match wins.

use crate::models::enums::{EatingStatus, PainSeverity};
use crate::models::PainLog;

pub const PAIN_SEVERITY_LEVEL_0: i32 = 0;
pub const PAIN_SEVERITY_LEVEL_1: i32 = 10;
pub const PAIN_SEVERITY_LEVEL_2: i32 = 30;
pub const PAIN_SEVERITY_LEVEL_3: i32 = 90;
/// Reserved. No rule produces this tier.
pub const PAIN_SEVERITY_LEVEL_4: i32 = 100;

const HOUR_MS: i64 = 60 * 60 * 1000;

struct StreakRule {
    name: &'static str,
    window_ms: i64,
    level: i32,
    holds: fn(&PainLog) -> bool,
}

fn is_severe(log: &PainLog) -> bool {
    log.severity >= PainSeverity::Severe
}

fn is_moderate_or_worse(log: &PainLog) -> bool {
    log.severity >= PainSeverity::Moderate
}

fn is_not_eating(log: &PainLog) -> bool {
    log.eating >= EatingStatus::NotEating
}

const RULES: [StreakRule; 3] = [
    StreakRule {
        name: "severe_pain_12h",
        window_ms: 12 * HOUR_MS,
        level: PAIN_SEVERITY_LEVEL_3,
        holds: is_severe,
    },
    StreakRule {
        name: "moderate_pain_16h",
        window_ms: 16 * HOUR_MS,
        level: PAIN_SEVERITY_LEVEL_2,
        holds: is_moderate_or_worse,
    },
    StreakRule {
        name: "not_eating_12h",
        window_ms: 12 * HOUR_MS,
        level: PAIN_SEVERITY_LEVEL_1,
        holds: is_not_eating,
    },
];

impl StreakRule {
    /// `logs` must already be ordered most recent first.
    fn matches(&self, logs: &[&PainLog], now: i64) -> bool {
        let cutoff = now - self.window_ms;
        for log in logs {
            if !(self.holds)(log) {
                return false;
            }
            if log.created <= cutoff {
                return true;
            }
        }
        false
    }
}

/// Compute the severity tier (0, 10, 30 or 90) for a pain log.
///
/// Input order does not matter; entries are scanned newest first, with a
/// stable sort so equal timestamps keep their input order.
pub fn evaluate(pain_logs: &[PainLog], now: i64) -> i32 {
    let mut ordered: Vec<&PainLog> = pain_logs.iter().collect();
    ordered.sort_by(|a, b| b.created.cmp(&a.created));

    for rule in &RULES {
        if rule.matches(&ordered, now) {
            tracing::debug!(rule = rule.name, level = rule.level, "Severity rule matched");
            return rule.level;
        }
    }
    PAIN_SEVERITY_LEVEL_0
}
