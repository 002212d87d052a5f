//! Band selection from the `indexes` query parameter.

use crate::error::PreviewError;

const BAD_INDEXES: &str = "bad indexes param; expected comma-separated integers";

/// Ordered, non-empty, duplicate-free 1-based band indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandSelection(Vec<usize>);

impl BandSelection {
    /// `(1, 2, 3)` for rasters with at least three bands, `(1,)` otherwise.
    pub fn default_for(band_count: usize) -> Self {
        if band_count >= 3 {
            Self(vec![1, 2, 3])
        } else {
            Self(vec![1])
        }
    }

    pub fn indexes(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse an explicit `indexes` value.
///
/// `None` or a blank value means "use the default" and yields `Ok(None)`.
/// Tokens are trimmed; an empty token, anything that is not a positive
/// integer, or a repeated index is rejected.
pub fn parse_requested(requested: Option<&str>) -> Result<Option<BandSelection>, PreviewError> {
    let Some(raw) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let mut indexes = Vec::new();
    for token in raw.split(',') {
        let index: i64 = token
            .trim()
            .parse()
            .map_err(|_| PreviewError::Validation(BAD_INDEXES.to_string()))?;
        if index < 1 {
            return Err(PreviewError::Validation(format!(
                "band indexes are 1-based, got {}",
                index
            )));
        }
        let index = index as usize;
        if indexes.contains(&index) {
            return Err(PreviewError::Validation(format!(
                "band index {} requested more than once",
                index
            )));
        }
        indexes.push(index);
    }

    Ok(Some(BandSelection(indexes)))
}

/// Use the explicit selection if there is one, else the default rule.
///
/// Indices past `band_count` are left for the dataset to reject.
pub fn select_or_default(explicit: Option<BandSelection>, band_count: usize) -> BandSelection {
    explicit.unwrap_or_else(|| BandSelection::default_for(band_count))
}

/// Parse and resolve in one step.
pub fn select(requested: Option<&str>, band_count: usize) -> Result<BandSelection, PreviewError> {
    Ok(select_or_default(parse_requested(requested)?, band_count))
}
