//! Expansion of an experiment into the individual runs.

use itertools::iproduct;
use summary_format::format_bool;

use crate::instance::instance_stem;

/// A single combination of an instance and parameter values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSpec {
    pub instance_name: String,
    /// The solver time limit in seconds.
    pub time_limit: u64,
    pub warmstart: bool,
    pub solver: String,
}

impl RunSpec {
    /// The name of the batch job executing this run, e.g.
    /// `V100_NBA-wsTrue-tl60-scpoptimizer`.
    pub fn job_name(&self) -> String {
        format!(
            "{}-ws{}-tl{}-s{}",
            instance_stem(&self.instance_name),
            format_bool(self.warmstart),
            self.time_limit,
            self.solver
        )
    }
}

/// The cartesian product of the parameter values.
///
/// The instance varies slowest and the solver fastest, so that all runs of an instance are
/// submitted together.
///
/// ```
/// use biosched::grid::expand;
///
/// let runs = expand(&["a.json".to_owned()], &[60, 600], &[true, false], &["x".to_owned()]);
/// let names = runs.iter().map(|run| run.job_name()).collect::<Vec<_>>();
///
/// assert_eq!(
///     names,
///     [
///         "a-wsTrue-tl60-sx",
///         "a-wsFalse-tl60-sx",
///         "a-wsTrue-tl600-sx",
///         "a-wsFalse-tl600-sx",
///     ]
/// );
/// ```
pub fn expand(
    instance_names: &[String],
    time_limits: &[u64],
    warmstarts: &[bool],
    solvers: &[String],
) -> Vec<RunSpec> {
    iproduct!(instance_names, time_limits, warmstarts, solvers)
        .map(|(instance_name, &time_limit, &warmstart, solver)| RunSpec {
            instance_name: instance_name.clone(),
            time_limit,
            warmstart,
            solver: solver.clone(),
        })
        .collect()
}
