use std::fmt;
use std::str::FromStr;

use crate::graphql::queries;

/// Kind of work; each kind is stored in its own satellite table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkType {
    Essay,
    Characterization,
}

impl WorkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Essay => "essay",
            Self::Characterization => "characterization",
        }
    }

    /// Mutation inserting the satellite row that links a work to its subject.
    pub fn insert_query(&self) -> &'static str {
        match self {
            Self::Essay => queries::INSERT_ESSAY,
            Self::Characterization => queries::INSERT_CHARACTERIZATION,
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown work type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWorkTypeError {
    invalid: String,
}

impl fmt::Display for ParseWorkTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid work type '{}'", self.invalid)
    }
}

impl std::error::Error for ParseWorkTypeError {}

impl FromStr for WorkType {
    type Err = ParseWorkTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "essay" => Ok(Self::Essay),
            "characterization" => Ok(Self::Characterization),
            _ => Err(ParseWorkTypeError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// Review status of a work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    Pending,
    Approved,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
