use std::fmt::Display;
use std::fmt::Formatter;

/// The outcome of a single solver run as recorded in the `status` column.
///
/// The first five variants are reported by the solver backend itself. The remaining ones are
/// assigned by the orchestrator when the run did not finish normally.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// The solution is proven optimal.
    Optimal,
    /// A solution was found, but it is not proven optimal.
    Feasible,
    /// The instance is proven to have no solution.
    Infeasible,
    /// The backend reached its time limit before finding a solution.
    TimeLimit,
    /// The backend finished without a conclusion.
    Unknown,
    /// The run was killed because it exceeded its time budget.
    TimeLimitException,
    /// The run ran out of memory.
    MemoryException,
    /// The run was stopped by a termination signal.
    Interrupted,
    /// Any other outcome, usually an error message.
    Failure(String),
}

impl Status {
    /// Classify a status string.
    ///
    /// This never fails; text that is not one of the known statuses becomes
    /// [`Status::Failure`]. The comparison ignores surrounding whitespace and ASCII case, and
    /// treats `-`, `_` and spaces as the same character.
    ///
    /// ```
    /// use summary_format::Status;
    ///
    /// assert_eq!(Status::parse("Optimal"), Status::Optimal);
    /// assert_eq!(Status::parse("time_limit"), Status::TimeLimit);
    /// assert_eq!(Status::parse("Time-Limit-Exception"), Status::TimeLimitException);
    /// assert_eq!(
    ///     Status::parse("ValueError('bad')"),
    ///     Status::Failure("ValueError('bad')".to_owned())
    /// );
    /// ```
    pub fn parse(text: &str) -> Status {
        let trimmed = text.trim();
        let normalised = trimmed
            .chars()
            .map(|c| match c {
                '_' | ' ' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect::<String>();

        match normalised.as_str() {
            "optimal" => Status::Optimal,
            "feasible" => Status::Feasible,
            "infeasible" => Status::Infeasible,
            "time-limit" | "timelimit" => Status::TimeLimit,
            "unknown" => Status::Unknown,
            "time-limit-exception" => Status::TimeLimitException,
            "memory-exception" => Status::MemoryException,
            "interrupted" => Status::Interrupted,
            _ => Status::Failure(trimmed.to_owned()),
        }
    }

    /// Whether the run produced a schedule.
    pub fn has_solution(&self) -> bool {
        matches!(self, Status::Optimal | Status::Feasible)
    }

    /// Whether the run ended abnormally, i.e. it was not concluded by the backend.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Status::TimeLimitException
                | Status::MemoryException
                | Status::Interrupted
                | Status::Failure(_)
        )
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Optimal => write!(f, "Optimal"),
            Status::Feasible => write!(f, "Feasible"),
            Status::Infeasible => write!(f, "Infeasible"),
            Status::TimeLimit => write!(f, "Time-limit"),
            Status::Unknown => write!(f, "Unknown"),
            Status::TimeLimitException => write!(f, "Time-Limit-Exception"),
            Status::MemoryException => write!(f, "Memory-Exception"),
            Status::Interrupted => write!(f, "Interrupted"),
            Status::Failure(message) => write!(f, "{message}"),
        }
    }
}
