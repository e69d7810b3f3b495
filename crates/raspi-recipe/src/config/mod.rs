use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use toml::Value;

use crate::error::{Error, Result};
use crate::facts::DEFAULT_MIRROR;

pub const DEFAULT_TEMPLATE: &str = "raspi_master.yaml";

fn default_template() -> String {
    DEFAULT_TEMPLATE.into()
}

fn default_output_dir() -> String {
    ".".into()
}

fn default_mirror() -> String {
    DEFAULT_MIRROR.into()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AptConfig {
    #[serde(default = "default_mirror")]
    pub mirror: String,
}

impl Default for AptConfig {
    fn default() -> Self {
        Self {
            mirror: default_mirror(),
        }
    }
}

/// Generator settings. Relative paths are taken as-is, i.e. relative to the
/// working directory.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub paths: PathsConfig,
    pub apt: AptConfig,
}

impl GeneratorConfig {
    pub fn from_doc(doc: &ConfigDoc) -> Result<Self> {
        Ok(doc.deserialize_path("")?.unwrap_or_default())
    }

    pub fn template_path(&self) -> PathBuf {
        PathBuf::from(self.paths.template.trim())
    }

    pub fn output_dir(&self) -> PathBuf {
        let dir = self.paths.output_dir.trim();
        PathBuf::from(if dir.is_empty() { "." } else { dir })
    }

    pub fn mirror(&self) -> &str {
        let m = self.apt.mirror.trim();
        if m.is_empty() { DEFAULT_MIRROR } else { m }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigDoc {
    pub path: PathBuf,
    pub value: Value,
}

impl ConfigDoc {
    pub fn value_path(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        if path.is_empty() {
            return Some(&self.value);
        }

        let mut cur = &self.value;
        for seg in path.split('.') {
            let tbl = cur.as_table()?;
            cur = tbl.get(seg)?;
        }
        Some(cur)
    }

    pub fn deserialize_path<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let Some(v) = self.value_path(path) else {
            return Ok(None);
        };
        let owned = v.clone();
        let parsed = owned.try_into().map_err(|e| {
            Error::config(format!(
                "invalid config in {} at '{}': {e}",
                self.path.display(),
                path
            ))
        })?;
        Ok(Some(parsed))
    }
}

fn merge_values(base: &mut Value, child: Value) {
    match (base, child) {
        (Value::Table(base_tbl), Value::Table(child_tbl)) => {
            for (k, v) in child_tbl {
                match base_tbl.get_mut(&k) {
                    Some(existing) => merge_values(existing, v),
                    None => {
                        base_tbl.insert(k, v);
                    }
                }
            }
        }
        (base_slot, child_val) => {
            *base_slot = child_val;
        }
    }
}

fn resolve_ref_path(from_file: &Path, reference: &str) -> PathBuf {
    let p = PathBuf::from(reference);
    if p.is_absolute() {
        p
    } else {
        from_file.parent().unwrap_or_else(|| Path::new(".")).join(p)
    }
}

fn load_value_inner(path: &Path, stack: &mut HashSet<PathBuf>) -> Result<Value> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !stack.insert(canonical.clone()) {
        return Err(Error::config(format!(
            "config extends cycle detected at {}",
            canonical.display()
        )));
    }

    let data = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read config {}: {e}", path.display())))?;
    let mut value: Value = toml::from_str(&data)
        .map_err(|e| Error::config(format!("TOML parse error in {}: {e}", path.display())))?;

    // Single-parent extends; the child wins on conflicts.
    let mut out = Value::Table(Default::default());
    if let Some(ext) = value.get("extends") {
        let Some(ext) = ext.as_str() else {
            return Err(Error::config(format!(
                "invalid extends in {} (expected string)",
                path.display()
            )));
        };
        let base_path = resolve_ref_path(path, ext.trim());
        tracing::debug!(config = %path.display(), base = %base_path.display(), "extending config");
        out = load_value_inner(&base_path, stack)?;
    }
    if let Some(tbl) = value.as_table_mut() {
        tbl.remove("extends");
    }

    merge_values(&mut out, value);

    stack.remove(&canonical);
    Ok(out)
}

pub fn load(path: &Path) -> Result<ConfigDoc> {
    let mut stack = HashSet::<PathBuf>::new();
    let value = load_value_inner(path, &mut stack)?;
    Ok(ConfigDoc {
        path: path.to_path_buf(),
        value,
    })
}
