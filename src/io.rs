//! Reading inputs and writing compiled artifacts.
//!
//! A compiled model is written as four files next to each other:
//!
//! - `<name>.program`: the program text
//! - `<name>.program.sha256`: the hex digest of the program text
//! - `<name>.data.json`: the numeric input
//! - `<name>.inits.json`: the initial parameter values
//!
//! The program file is only rewritten when its stored digest differs from the digest of
//! the new text, so downstream tools that key a build cache on the file keep their cache.

use std::fs;
use std::path::{Path, PathBuf};

use schemars::schema::RootSchema;
use serde::Serialize;
use thiserror::Error;

use crate::compile::CompiledModel;
use crate::config::CompilerConfig;
use crate::model::RawModel;

/// Whether the program file was written or left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// The program changed, or no previous program existed.
    Fresh,
    /// The stored digest matched and the program file was not touched.
    Cached,
}

/// Loads a model from a JSON file.
///
/// # Arguments
///
/// * `path` - Path to the JSON file holding a [`RawModel`]
///
/// # Errors
///
/// * `IOError::FileNotFound` if the file cannot be opened
/// * `IOError::JsonParseError` if the contents are not a valid model
pub fn load_raw_model(path: impl Into<PathBuf>) -> Result<RawModel, IOError> {
    let path = path.into();
    let file = fs::File::open(path).map_err(IOError::FileNotFound)?;
    serde_json::from_reader(file).map_err(IOError::JsonParseError)
}

/// Loads a compiler configuration from a JSON file. Missing fields take their defaults.
pub fn load_config(path: impl Into<PathBuf>) -> Result<CompilerConfig, IOError> {
    let path = path.into();
    let file = fs::File::open(path).map_err(IOError::FileNotFound)?;
    serde_json::from_reader(file).map_err(IOError::JsonParseError)
}

/// JSON schema of the model input.
pub fn input_schema() -> RootSchema {
    schemars::schema_for!(RawModel)
}

/// Writes the artifacts of a compiled model into a directory.
///
/// # Arguments
///
/// * `dir` - Target directory, created if missing
/// * `compiled` - The compiled model; its name prefixes every file
///
/// # Returns
///
/// Whether the program file was rewritten. Data and initial values are always written.
pub fn write_artifacts(
    dir: impl AsRef<Path>,
    compiled: &CompiledModel,
) -> Result<ArtifactStatus, IOError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(IOError::WriteError)?;

    let program_path = dir.join(format!("{}.program", compiled.name));
    let hash_path = dir.join(format!("{}.program.sha256", compiled.name));

    let stored_hash = fs::read_to_string(&hash_path).ok();
    let unchanged = stored_hash.as_deref().map(str::trim) == Some(compiled.program.hash())
        && program_path.exists();

    let status = if unchanged {
        log::info!(
            "Program of '{}' unchanged, keeping {}",
            compiled.name,
            program_path.display()
        );
        ArtifactStatus::Cached
    } else {
        fs::write(&program_path, compiled.program.text()).map_err(IOError::WriteError)?;
        fs::write(&hash_path, compiled.program.hash()).map_err(IOError::WriteError)?;
        log::info!("Wrote {}", program_path.display());
        ArtifactStatus::Fresh
    };

    write_json(dir.join(format!("{}.data.json", compiled.name)), &compiled.data)?;
    write_json(dir.join(format!("{}.inits.json", compiled.name)), &compiled.inits)?;

    Ok(status)
}

fn write_json(path: PathBuf, value: &impl Serialize) -> Result<(), IOError> {
    let file = fs::File::create(&path).map_err(IOError::WriteError)?;
    serde_json::to_writer_pretty(file, value).map_err(IOError::JsonParseError)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Errors while reading inputs or writing artifacts.
#[derive(Error, Debug)]
pub enum IOError {
    /// The input file could not be found or opened.
    #[error("File not found: {0}")]
    FileNotFound(std::io::Error),

    /// Input or output JSON could not be parsed or serialised.
    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    /// An artifact could not be written.
    #[error("Failed to write artifact: {0}")]
    WriteError(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_raw_model() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "m", "compartments": [{{"id": "c", "volume": 2.0}}]}}"#
        )
        .unwrap();

        let raw = load_raw_model(file.path()).unwrap();
        assert_eq!(raw.name, "m");
        assert_eq!(raw.compartments[0].volume, 2.0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_raw_model(dir.path().join("missing.json"));
        assert!(matches!(result, Err(IOError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(IOError::JsonParseError(_))
        ));
    }

    #[test]
    fn test_input_schema_lists_records() {
        let schema = serde_json::to_value(input_schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties["reactions"].is_object());
        assert!(properties["priors"].is_object());
    }
}
