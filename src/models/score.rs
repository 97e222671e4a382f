use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Controlled vocabulary for deduction reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeductionReason {
    Tapp,
    StortMissatMoment,
    OsynkTajming,
    Stegfel,
    Annan,
}

/// A single point deduction with an approximate timestamp in the routine.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Deduction {
    #[garde(skip)]
    pub reason: DeductionReason,

    /// Negative integer, e.g. -2.
    #[garde(range(max = -1))]
    pub points: i64,

    /// Timestamp into the routine, mm:ss.
    #[garde(custom(is_mm_ss))]
    pub time: String,
}

/// Rubric category sub-scores.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryScores {
    #[garde(range(min = 0, max = 10))]
    pub teknik: i64,

    #[garde(range(min = 0, max = 10))]
    pub utforande: i64,

    #[garde(range(min = 0, max = 10))]
    pub koreografi_svarighet: i64,

    #[garde(range(min = 0, max = 5))]
    pub musikalitet_tajming: i64,

    #[garde(range(min = 0, max = 5))]
    pub scennarvaro_helhet: i64,
}

/// Structured assessment returned by the judge model.
///
/// Validated against rubric bounds at the remote-call boundary before being
/// stored in a completed job; a report that violates them never reaches the
/// `done` state.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScoreReport {
    /// Category sum minus deductions, as computed by the model. Not
    /// recomputed server-side.
    #[garde(skip)]
    pub total: i64,

    #[garde(dive)]
    pub categories: CategoryScores,

    #[garde(dive)]
    pub deductions: Vec<Deduction>,

    #[garde(skip)]
    pub key_observations: Vec<String>,

    /// 3-6 concrete training recommendations.
    #[garde(length(min = 3, max = 6))]
    pub training_focus: Vec<String>,

    /// How confident the assessment is given the video quality.
    #[garde(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
}

fn is_mm_ss(value: &str, _context: &()) -> garde::Result {
    let (minutes, seconds) = value
        .split_once(':')
        .ok_or_else(|| garde::Error::new("expected mm:ss"))?;
    if minutes.is_empty() || minutes.len() > 2 || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return Err(garde::Error::new("expected mm:ss"));
    }
    if seconds.len() != 2 || !seconds.bytes().all(|b| b.is_ascii_digit()) {
        return Err(garde::Error::new("expected mm:ss"));
    }
    if seconds.parse::<u32>().map_err(|_| garde::Error::new("expected mm:ss"))? > 59 {
        return Err(garde::Error::new("seconds out of range"));
    }
    Ok(())
}
