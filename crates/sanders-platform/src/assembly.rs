//! Cloud assembly output.
//!
//! An assembly directory holds the stack template plus a `manifest.json`
//! describing where and how to deploy it. Files are written to a temporary
//! path and renamed into place, so a reader never observes a half-written
//! template.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use sanders_common::constants::ASSEMBLY_MANIFEST_FILE;
use sanders_common::error::{InfraError, Result};
use sanders_common::tags::TagSet;
use serde::Serialize;

use crate::stack::Stack;

/// Version of the assembly manifest layout.
pub const ASSEMBLY_VERSION: &str = "1";

const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Serialization format of the emitted template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

impl TemplateFormat {
    /// File extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Renders the stack's template in this format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render(self, stack: &Stack) -> Result<String> {
        match self {
            Self::Json => stack.template().to_json_pretty(),
            Self::Yaml => stack.template().to_yaml(),
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TemplateFormat {
    type Err = InfraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(InfraError::config(format!(
                "unknown template format \"{other}\" (expected json or yaml)"
            ))),
        }
    }
}

/// Top level of `manifest.json`.
#[derive(Debug, Serialize)]
struct AssemblyManifest<'a> {
    version: &'static str,
    artifacts: BTreeMap<&'a str, StackArtifact<'a>>,
}

#[derive(Debug, Serialize)]
struct StackArtifact<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    environment: String,
    properties: StackProperties<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StackProperties<'a> {
    template_file: String,
    stack_name: &'a str,
    description: &'a str,
    tags: &'a TagSet,
    digest: String,
}

/// Paths and digest of a written assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Assembly directory.
    pub directory: PathBuf,
    /// Path of `manifest.json`.
    pub manifest_path: PathBuf,
    /// Path of the stack template.
    pub template_path: PathBuf,
    /// SHA-256 of the JSON template.
    pub digest: String,
}

/// File name of the stack template, e.g. `Stack-dev.template.json`.
#[must_use]
pub fn template_file_name(stack: &Stack, format: TemplateFormat) -> String {
    format!("{}.template.{}", stack.name(), format.extension())
}

/// Writes the assembly for `stack` into `directory`, creating it if needed.
///
/// # Errors
///
/// Returns an error if rendering fails or a file cannot be written.
pub fn write_assembly(stack: &Stack, directory: &Path, format: TemplateFormat) -> Result<Assembly> {
    fs::create_dir_all(directory).map_err(|e| InfraError::Io {
        path: directory.to_path_buf(),
        source: e,
    })?;

    let digest = stack.digest()?;
    let template_file = template_file_name(stack, format);
    let template_path = directory.join(&template_file);
    write_atomic(&template_path, &format.render(stack)?)?;

    let config = stack.config();
    let tags = config.stack_tags();
    let manifest = AssemblyManifest {
        version: ASSEMBLY_VERSION,
        artifacts: BTreeMap::from([(
            stack.name(),
            StackArtifact {
                kind: STACK_ARTIFACT_TYPE,
                environment: stack.target(),
                properties: StackProperties {
                    template_file,
                    stack_name: stack.name(),
                    description: stack.template().description(),
                    tags: &tags,
                    digest: digest.clone(),
                },
            },
        )]),
    };
    let mut rendered = serde_json::to_string_pretty(&manifest)?;
    rendered.push('\n');
    let manifest_path = directory.join(ASSEMBLY_MANIFEST_FILE);
    write_atomic(&manifest_path, &rendered)?;

    tracing::info!(
        directory = %directory.display(),
        template = %template_path.display(),
        digest = %digest,
        "cloud assembly written"
    );
    Ok(Assembly {
        directory: directory.to_path_buf(),
        manifest_path,
        template_path,
        digest,
    })
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    fs::write(&temp_path, contents).map_err(|e| InfraError::Io {
        path: temp_path.clone(),
        source: e,
    })?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        InfraError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })
}
