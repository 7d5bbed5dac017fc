//! State transitions.

use serde::{Deserialize, Serialize};

/// Where execution goes after a state completes.
///
/// Serialized inline as either `"Next": "<state>"` or `"End": true`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "TransitionRepr", try_from = "TransitionRepr")]
pub enum Transition {
    /// Continue with the named state.
    Next(String),
    /// End the execution (or the enclosing branch/iteration).
    #[default]
    End,
}

impl Transition {
    /// Returns the next state name, if any.
    pub fn next(&self) -> Option<&str> {
        match self {
            Self::Next(name) => Some(name),
            Self::End => None,
        }
    }

    /// Returns whether this transition ends the execution.
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TransitionRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<bool>,
}

impl From<Transition> for TransitionRepr {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Next(name) => Self {
                next: Some(name),
                end: None,
            },
            Transition::End => Self {
                next: None,
                end: Some(true),
            },
        }
    }
}

impl TryFrom<TransitionRepr> for Transition {
    type Error = String;

    fn try_from(repr: TransitionRepr) -> Result<Self, Self::Error> {
        match (repr.next, repr.end) {
            (Some(name), None | Some(false)) => Ok(Self::Next(name)),
            (None, Some(true)) => Ok(Self::End),
            (Some(_), Some(true)) => Err("state has both Next and End".into()),
            (None, _) => Err("state has neither Next nor End".into()),
        }
    }
}
