//! Decoding of the availability feed into typed records.
//!
//! The feed is comma-delimited text with a header row. Only the four
//! [`RequiredColumn`]s are read; they are located by exact header name once,
//! so upstream column reordering is harmless while a rename is reported as a
//! malformed dataset.

use maskmap_core::{AvailabilityRecord, FeedColumns};

use crate::error::{FeedError, MalformedReason};

/// The columns every feed row must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredColumn {
    StoreId,
    AdultCount,
    ChildCount,
    UpdatedAt,
}

impl RequiredColumn {
    pub const ALL: [RequiredColumn; 4] = [
        RequiredColumn::StoreId,
        RequiredColumn::AdultCount,
        RequiredColumn::ChildCount,
        RequiredColumn::UpdatedAt,
    ];

    /// Header name for this column under the given configuration.
    #[must_use]
    pub fn header_name(self, columns: &FeedColumns) -> &str {
        match self {
            RequiredColumn::StoreId => &columns.store_id,
            RequiredColumn::AdultCount => &columns.adult_count,
            RequiredColumn::ChildCount => &columns.child_count,
            RequiredColumn::UpdatedAt => &columns.updated_at,
        }
    }
}

/// Header positions of the required columns.
struct ColumnLayout<'a> {
    columns: &'a FeedColumns,
    store_id: usize,
    adult_count: usize,
    child_count: usize,
    updated_at: usize,
}

impl<'a> ColumnLayout<'a> {
    fn resolve(headers: &csv::StringRecord, columns: &'a FeedColumns) -> Result<Self, FeedError> {
        let position = |column: RequiredColumn| -> Result<usize, FeedError> {
            let name = column.header_name(columns);
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| malformed(0, MalformedReason::MissingColumn(name.to_owned())))
        };

        Ok(Self {
            columns,
            store_id: position(RequiredColumn::StoreId)?,
            adult_count: position(RequiredColumn::AdultCount)?,
            child_count: position(RequiredColumn::ChildCount)?,
            updated_at: position(RequiredColumn::UpdatedAt)?,
        })
    }

    fn index_of(&self, column: RequiredColumn) -> usize {
        match column {
            RequiredColumn::StoreId => self.store_id,
            RequiredColumn::AdultCount => self.adult_count,
            RequiredColumn::ChildCount => self.child_count,
            RequiredColumn::UpdatedAt => self.updated_at,
        }
    }

    fn cell<'r>(
        &self,
        record: &'r csv::StringRecord,
        row: usize,
        column: RequiredColumn,
    ) -> Result<&'r str, FeedError> {
        record.get(self.index_of(column)).ok_or_else(|| {
            malformed(
                row,
                MalformedReason::MissingColumn(column.header_name(self.columns).to_owned()),
            )
        })
    }

    fn count(
        &self,
        record: &csv::StringRecord,
        row: usize,
        column: RequiredColumn,
    ) -> Result<u32, FeedError> {
        let value = self.cell(record, row, column)?;
        value.trim().parse::<u32>().map_err(|_| {
            malformed(
                row,
                MalformedReason::InvalidCount {
                    column: column.header_name(self.columns).to_owned(),
                    value: value.to_owned(),
                },
            )
        })
    }

    fn read_row(
        &self,
        record: &csv::StringRecord,
        row: usize,
    ) -> Result<AvailabilityRecord, FeedError> {
        let store_id = self.cell(record, row, RequiredColumn::StoreId)?.trim();
        if store_id.is_empty() {
            return Err(malformed(
                row,
                MalformedReason::EmptyStoreId(self.columns.store_id.clone()),
            ));
        }

        Ok(AvailabilityRecord {
            store_id: store_id.to_owned(),
            adult_mask_count: self.count(record, row, RequiredColumn::AdultCount)?,
            child_mask_count: self.count(record, row, RequiredColumn::ChildCount)?,
            updated_at: self
                .cell(record, row, RequiredColumn::UpdatedAt)?
                .to_owned(),
        })
    }
}

/// Parses the raw feed body into availability records, in input order.
///
/// Rows are numbered from 1 (the header is row 0). Blank lines are skipped.
///
/// # Errors
///
/// Returns [`FeedError::Malformed`] for the first row that is missing a
/// required column, has an empty store id, has a count that is not a
/// non-negative integer, or cannot be decoded. No partial result is returned.
pub fn parse_dataset(
    raw: &str,
    columns: &FeedColumns,
) -> Result<Vec<AvailabilityRecord>, FeedError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| malformed(0, MalformedReason::Csv(e.to_string())))?
        .clone();
    let layout = ColumnLayout::resolve(&headers, columns)?;

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = index + 1;
        let record = result.map_err(|e| malformed(row, MalformedReason::Csv(e.to_string())))?;
        records.push(layout.read_row(&record, row)?);
    }

    tracing::debug!(records = records.len(), "parsed availability dataset");
    Ok(records)
}

fn malformed(row: usize, reason: MalformedReason) -> FeedError {
    FeedError::Malformed { row, reason }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
