pub mod collapsed;

use ember_protocol::SharedStr;
use serde::{Deserialize, Serialize};

pub use collapsed::{CollapsedParseError, parse_collapsed};

/// One weighted call stack, outermost frame first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSample {
    pub frames: Vec<SharedStr>,
    pub weight: f64,
}

impl StackSample {
    pub fn new<I, S>(frames: I, weight: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SharedStr>,
    {
        Self {
            frames: frames.into_iter().map(Into::into).collect(),
            weight,
        }
    }
}
