use serde::{Deserialize, Serialize};

/// The settled result of one input to [`Deferred::all_settled`].
///
/// [`Deferred::all_settled`]: crate::Deferred::all_settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum SettledOutcome<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> SettledOutcome<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, SettledOutcome::Fulfilled(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            SettledOutcome::Fulfilled(value) => Ok(value),
            SettledOutcome::Rejected(reason) => Err(reason),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, op: F) -> SettledOutcome<U, E> {
        match self {
            SettledOutcome::Fulfilled(value) => SettledOutcome::Fulfilled(op(value)),
            SettledOutcome::Rejected(reason) => SettledOutcome::Rejected(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for SettledOutcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => SettledOutcome::Fulfilled(value),
            Err(reason) => SettledOutcome::Rejected(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let outcome: SettledOutcome<u8, String> = SettledOutcome::Rejected("nope".into());
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"status":"rejected","payload":"nope"}"#);
    }

    #[test]
    fn test_outcome_conversions() {
        let outcome: SettledOutcome<u8, String> = Ok(2).into();
        assert!(outcome.is_fulfilled());
        assert_eq!(outcome.map(|v| v * 2).into_result(), Ok(4));
    }
}
