//! CSV summary output.

use std::io::Write;

use thiserror::Error;

use crate::aggregate::SummaryRow;
use crate::classify::Category;

/// Failure writing the report.
#[derive(Debug, Error)]
#[error("failed to write report: {0}")]
pub struct ReportError(#[from] csv::Error);

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        Self(csv::Error::from(err))
    }
}

/// Writes one CSV row per calendar.
///
/// Each row is flushed as soon as it is written, so rows for calendars that
/// were processed before a later failure are not lost.
pub struct ReportWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: csv::Writer::from_writer(writer),
        }
    }

    /// Column names, in order.
    pub fn header() -> Vec<&'static str> {
        let mut columns = vec!["email", "tz", "free slots"];
        columns.extend(Category::ALL.iter().map(|c| c.as_str()));
        columns.extend(["meeting hours", "% meetings"]);
        columns
    }

    pub fn write_header(&mut self) -> Result<(), ReportError> {
        self.inner.write_record(Self::header())?;
        self.inner.flush()?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &SummaryRow) -> Result<(), ReportError> {
        self.inner.write_record(row.to_record())?;
        self.inner.flush()?;
        Ok(())
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> Result<W, ReportError> {
        self.inner
            .into_inner()
            .map_err(|e| ReportError::from(std::io::Error::other(e.to_string())))
    }
}
