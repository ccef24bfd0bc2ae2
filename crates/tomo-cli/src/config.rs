pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;

use crate::error::{CliError, Result};
use reliontomo::core::params::{FormSchema, ParamValues};

/// Applies repeated `NAME=VALUE` overrides on top of `values`, parsing each value with the
/// kind the schema declares for that option.
pub fn apply_set_values(
    schema: &FormSchema,
    mut values: ParamValues,
    set_values: &[String],
) -> Result<ParamValues> {
    for kv_pair in set_values {
        let (name, raw) = kv_pair.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{}'. Expected NAME=VALUE.",
                kv_pair
            ))
        })?;
        let name = name.trim();
        let value = schema.parse_value(name, raw.trim())?;
        values.set(name, value);
    }
    Ok(values)
}
