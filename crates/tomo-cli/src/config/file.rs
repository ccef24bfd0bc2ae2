use crate::error::{CliError, Result};
use reliontomo::core::params::{FormSchema, ParamError, ParamKind, ParamValue, ParamValues};
use reliontomo::core::utils::paths::resolve_star_relative;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// A run file: one TOML table per form section, keyed by option name.
///
/// ```toml
/// [input]
/// input_pseudo_subtomos_prot = "Runs/005_prepare"
///
/// [optimisation]
/// mask_diameter = 230
/// symmetry = "C6"
/// ```
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    input: Option<toml::Table>,
    ctf: Option<toml::Table>,
    optimisation: Option<toml::Table>,
    compute: Option<toml::Table>,
    additional: Option<toml::Table>,
    parallel: Option<toml::Table>,
}

impl RunFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading run file from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn sections(self) -> [(&'static str, &'static str, Option<toml::Table>); 6] {
        [
            ("input", "Input", self.input),
            ("ctf", "CTF", self.ctf),
            ("optimisation", "Optimisation", self.optimisation),
            ("compute", "Compute", self.compute),
            ("additional", "Additional", self.additional),
            ("parallel", "Parallelization", self.parallel),
        ]
    }

    /// Converts the file into form values, checking every option against `schema`.
    ///
    /// Relative paths and object references are taken relative to `base_dir`, the
    /// directory holding the run file.
    pub fn into_values(self, schema: &FormSchema, base_dir: &Path) -> Result<ParamValues> {
        let mut values = ParamValues::new();
        for (key, label, table) in self.sections() {
            let Some(table) = table else { continue };
            for (name, raw) in table {
                let spec = schema.param(&name).ok_or_else(|| ParamError::Unknown {
                    protocol: schema.protocol,
                    name: name.clone(),
                })?;
                let declared = schema.section_of(&name).map(|s| s.label);
                if declared != Some(label) {
                    return Err(CliError::Config(format!(
                        "Option '{}' does not belong in section [{}]",
                        name, key
                    )));
                }

                let value = match (&spec.kind, to_param_value(&name, raw)?) {
                    (ParamKind::Path | ParamKind::Pointer { .. }, ParamValue::Text(p))
                        if !p.is_empty() =>
                    {
                        let resolved = resolve_star_relative(base_dir, Path::new(&p));
                        ParamValue::Text(resolved.to_string_lossy().into_owned())
                    }
                    (_, v) => v,
                };
                values.set(spec.name, value);
            }
        }
        Ok(values)
    }
}

fn to_param_value(name: &str, value: toml::Value) -> Result<ParamValue> {
    match value {
        toml::Value::Boolean(b) => Ok(ParamValue::Bool(b)),
        toml::Value::Integer(i) => Ok(ParamValue::Int(i)),
        toml::Value::Float(x) => Ok(ParamValue::Float(x)),
        toml::Value::String(s) => Ok(ParamValue::Text(s)),
        other => Err(CliError::Config(format!(
            "Option '{}' must be a boolean, number or string, got {}",
            name,
            other.type_str()
        ))),
    }
}
