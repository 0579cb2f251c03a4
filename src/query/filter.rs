use crate::error::{ReportError, Result};
use crate::model::{Changeset, DateRange};
use crate::util::parse_date;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Range,
}

impl Operator {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Operator::Eq),
            "gt" => Some(Operator::Gt),
            "lt" => Some(Operator::Lt),
            "range" => Some(Operator::Range),
            _ => None,
        }
    }
}

/// Fields that can only be checked against fetched changesets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SequentialField {
    Committer,
    CommitterName,
    CommitterEmail,
}

impl fmt::Display for SequentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SequentialField::Committer => "committer",
            SequentialField::CommitterName => "committer_name",
            SequentialField::CommitterEmail => "committer_email",
        })
    }
}

/// A single, already validated filter request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// `date__range=[start, end]`
    DateRange { start: DateTime<Utc>, end: DateTime<Utc> },
    /// `date__gt=start`
    DateAfter(DateTime<Utc>),
    /// `date__lt=end`
    DateBefore(DateTime<Utc>),
    /// `branch_name=name`
    BranchName(String),
    /// Recorded for later sequential filtering. Never applied.
    Sequential {
        field: SequentialField,
        op: Operator,
        value: String,
    },
}

impl FilterSpec {
    pub fn date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(ReportError::InvalidDate(format!(
                "Invalid range: start ({start}) is after end ({end})"
            )));
        }
        Ok(FilterSpec::DateRange { start, end })
    }

    /// Parse a `field` / `field__operator` key with its textual value.
    ///
    /// Unknown fields, and operators a field does not support, yield
    /// `Ok(None)`. A known key with a malformed value is an error.
    pub fn parse(key: &str, value: &str) -> Result<Option<Self>> {
        let (field, op) = match key.split_once("__") {
            Some((field, op)) => (field, op),
            None => (key, "eq"),
        };
        let Some(op) = Operator::parse(op) else {
            return Ok(None);
        };

        let spec = match (field, op) {
            ("date", Operator::Range) => {
                let (start, end) = value.split_once(',').ok_or_else(|| {
                    ReportError::Parse(format!("date__range expects 'start,end', got '{value}'"))
                })?;
                Self::date_range(parse_date(start)?, parse_date(end)?)?
            }
            ("date", Operator::Gt) => FilterSpec::DateAfter(parse_date(value)?),
            ("date", Operator::Lt) => FilterSpec::DateBefore(parse_date(value)?),
            ("branch_name", Operator::Eq) => FilterSpec::BranchName(value.to_string()),
            ("committer", op) => Self::sequential(SequentialField::Committer, op, value),
            ("committer_name", op) => Self::sequential(SequentialField::CommitterName, op, value),
            ("committer_email", op) => Self::sequential(SequentialField::CommitterEmail, op, value),
            _ => return Ok(None),
        };
        Ok(Some(spec))
    }

    fn sequential(field: SequentialField, op: Operator, value: &str) -> Self {
        FilterSpec::Sequential {
            field,
            op,
            value: value.to_string(),
        }
    }

    /// Split this spec into the native filter or the sequential set.
    pub fn translate(self, native: &mut NativeFilter, sequential: &mut SequentialFilters) {
        match self {
            FilterSpec::DateRange { start, end } => {
                native.start_date = Some(start);
                native.end_date = Some(end);
            }
            FilterSpec::DateAfter(start) => native.start_date = Some(start),
            FilterSpec::DateBefore(end) => native.end_date = Some(end),
            FilterSpec::BranchName(name) => native.branch_name = Some(name),
            FilterSpec::Sequential { field, op, value } => {
                sequential.insert((field, op), value);
            }
        }
    }
}

pub type SequentialFilters = BTreeMap<(SequentialField, Operator), String>;

/// The part of a query a backend evaluates itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub branch_name: Option<String>,
}

impl NativeFilter {
    pub fn window(&self) -> DateRange {
        DateRange {
            since: self.start_date,
            until: self.end_date,
        }
    }

    /// Reference evaluation for backends that filter in process.
    pub fn matches(&self, changeset: &Changeset) -> bool {
        if !self.window().contains(&changeset.timestamp) {
            return false;
        }
        match &self.branch_name {
            Some(name) => changeset.branch.as_deref() == Some(name.as_str()),
            None => true,
        }
    }
}
