//! Error aggregation across rows and fields.
//!
//! One malformed row must not stop the rest of a pass. Orchestrators thread an
//! [`AggregatedError`] value through the pass, append every row/field failure to it, and
//! turn it into a single combined result at the end.

use std::collections::HashSet;
use std::fmt;

use crate::error::{SheetError, SheetResult};

/// Ordered collection of distinct errors, deduplicated by message text.
#[derive(Debug, Default)]
pub struct AggregatedError {
    errors: Vec<SheetError>,
    seen: HashSet<String>,
}

impl AggregatedError {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `err`, returning `false` if an error with the same message was already present.
    ///
    /// Appending a [`SheetError::Aggregated`] flattens it into this aggregate.
    pub fn append(&mut self, err: SheetError) -> bool {
        match err {
            SheetError::Aggregated(inner) => {
                let mut added = false;
                for e in inner.errors {
                    added |= self.append(e);
                }
                added
            }
            other => {
                if !self.seen.insert(other.to_string()) {
                    return false;
                }
                self.errors.push(other);
                true
            }
        }
    }

    /// Append the error of `result`, if any, and return its value.
    pub fn collect<T>(&mut self, result: SheetResult<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.append(e);
                None
            }
        }
    }

    /// Number of distinct errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate errors in append order.
    pub fn iter(&self) -> impl Iterator<Item = &SheetError> {
        self.errors.iter()
    }

    /// `Ok(())` when empty, otherwise the whole aggregate as one [`SheetError`].
    pub fn into_result(self) -> SheetResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SheetError::Aggregated(self))
        }
    }
}

impl IntoIterator for AggregatedError {
    type Item = SheetError;
    type IntoIter = std::vec::IntoIter<SheetError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl Extend<SheetError> for AggregatedError {
    fn extend<I: IntoIterator<Item = SheetError>>(&mut self, iter: I) {
        for e in iter {
            self.append(e);
        }
    }
}

impl fmt::Display for AggregatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "no errors"),
            [only] => write!(f, "1 error occurred: {only}"),
            errors => {
                write!(f, "{} errors occurred:", errors.len())?;
                for e in errors {
                    write!(f, "\n\t* {e}")?;
                }
                Ok(())
            }
        }
    }
}
