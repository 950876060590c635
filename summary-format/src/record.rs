use crate::Status;

/// The result of one solver run on one instance, i.e. a single line of a summary file.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRecord {
    pub status: Status,
    pub objective: Option<f64>,
    /// Wall-clock time spent by the solver, in seconds.
    pub runtime: Option<f64>,
    /// Time spent constructing the warm-start solution, in seconds.
    pub warmstart_time: Option<f64>,
    pub lower_bound: Option<f64>,
    /// The optimality gap in percent, see [`compute_gap`].
    pub gap: Option<f64>,
    pub time_limit: f64,
    pub solver: String,
    pub instance_name: String,
    pub warmstart: bool,
    /// The makespan of the warm-start solution, if one was constructed.
    pub warmstart_makespan: Option<f64>,
}

impl SummaryRecord {
    /// The column names of a summary file, in the order in which they are written.
    pub const COLUMNS: [&'static str; 11] = [
        "status",
        "objective",
        "runtime",
        "warmstart_time",
        "lower_bound",
        "gap",
        "time_limit",
        "solver",
        "instance_name",
        "warmstart",
        "warmstart_makespan",
    ];

    /// Create a record for a run which did not produce any result values.
    pub fn failed(
        status: Status,
        time_limit: f64,
        solver: impl Into<String>,
        instance_name: impl Into<String>,
        warmstart: bool,
    ) -> SummaryRecord {
        SummaryRecord {
            status,
            objective: None,
            runtime: None,
            warmstart_time: None,
            lower_bound: None,
            gap: None,
            time_limit,
            solver: solver.into(),
            instance_name: instance_name.into(),
            warmstart,
            warmstart_makespan: None,
        }
    }

    /// The cells of this record, formatted as they appear in a summary file, in the order of
    /// [`SummaryRecord::COLUMNS`].
    pub fn cells(&self) -> [Option<String>; 11] {
        [
            Some(self.status.to_string()),
            self.objective.map(format_float),
            self.runtime.map(format_float),
            self.warmstart_time.map(format_float),
            self.lower_bound.map(format_float),
            self.gap.map(format_float),
            Some(format_float(self.time_limit)),
            Some(self.solver.clone()),
            Some(self.instance_name.clone()),
            Some(format_bool(self.warmstart).to_owned()),
            self.warmstart_makespan.map(format_float),
        ]
    }
}

/// The relative distance between the objective and the lower bound, in percent and rounded to
/// three decimals.
///
/// Returns `None` if either value is missing, or if the lower bound is zero.
///
/// ```
/// use summary_format::compute_gap;
///
/// assert_eq!(compute_gap(Some(110.0), Some(100.0)), Some(10.0));
/// assert_eq!(compute_gap(Some(3.0), Some(0.0)), None);
/// assert_eq!(compute_gap(None, Some(100.0)), None);
/// ```
pub fn compute_gap(objective: Option<f64>, lower_bound: Option<f64>) -> Option<f64> {
    let objective = objective?;
    let lower_bound = lower_bound?;

    if lower_bound == 0.0 {
        return None;
    }

    Some(round_to(
        100.0 * (objective - lower_bound) / lower_bound,
        3,
    ))
}

/// Round `value` to the given number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Format a float the way it appears in a summary file. Integral values keep a trailing `.0`.
///
/// ```
/// use summary_format::format_float;
///
/// assert_eq!(format_float(60.0), "60.0");
/// assert_eq!(format_float(0.25), "0.25");
/// ```
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Format a boolean the way it appears in a summary file.
pub fn format_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Parse a boolean cell. Accepts `True`/`False` in any case, and `1`/`0`.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
