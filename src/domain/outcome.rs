/// Result of a read that never fails outright.
///
/// Display paths prefer an empty listing over an error, but callers still
/// need to tell "nothing stored" apart from "storage unreadable".
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    Fresh(T),
    Degraded { value: T, reason: String },
}

impl<T> ReadOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ReadOutcome::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            ReadOutcome::Fresh(value) | ReadOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            ReadOutcome::Fresh(value) | ReadOutcome::Degraded { value, .. } => value,
        }
    }
}
