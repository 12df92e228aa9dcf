use crate::error::Result;
use polars::prelude::*;

/// Replace each listed column with `UInt32` codes in order of first appearance.
///
/// Returns a new frame; the input is left untouched. Nulls stay null.
pub fn encode_categoricals(frame: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut encoded = frame.clone();

    for name in columns {
        // Fresh categories per column; the global mapping is shared process-wide.
        let categories = Categories::random(name.as_str().into(), CategoricalPhysical::U32);
        let categorical = frame
            .column(name)?
            .cast(&DataType::String)?
            .cast(&DataType::from_categories(categories.clone()))?;
        let codes = categorical.to_physical_repr();

        log::debug!(
            "Encoded '{}' into {} categories",
            name,
            categories.mapping().num_cats_upper_bound()
        );
        encoded.with_column(codes.with_name(name.as_str().into()))?;
    }

    Ok(encoded)
}
