mod definition;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

pub use definition::{
    apply_provider_fixups, parse_security_definitions, SchemeType, Scope, SecurityDefinition,
};

use crate::error::{AuthError, Result};

/// An external API as far as authentication is concerned.
#[derive(Debug, Clone)]
pub struct Integration {
    pub name: String,
    pub security_definitions: Vec<SecurityDefinition>,
}

pub trait IntegrationLoader {
    fn load(&self, name: &str) -> Result<Integration>;
}

/// Reads Swagger documents from an integrations directory, either
/// `<dir>/<name>/openapi.json` or `<dir>/<name>.json`.
pub struct FsIntegrationLoader {
    dir: PathBuf,
}

impl FsIntegrationLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn spec_path(&self, name: &str) -> Option<PathBuf> {
        [
            self.dir.join(name).join("openapi.json"),
            self.dir.join(format!("{}.json", name)),
        ]
        .into_iter()
        .find(|path| path.is_file())
    }
}

impl IntegrationLoader for FsIntegrationLoader {
    fn load(&self, name: &str) -> Result<Integration> {
        let load_error = |reason: String| AuthError::IntegrationLoad {
            name: name.to_string(),
            reason,
        };

        let path = self
            .spec_path(name)
            .ok_or_else(|| load_error(format!("no spec found under {}", self.dir.display())))?;
        debug!(integration = name, path = %path.display(), "loading integration");

        parse_integration(name, &path).map_err(load_error)
    }
}

fn parse_integration(name: &str, path: &Path) -> std::result::Result<Integration, String> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("reading {}: {}", path.display(), e))?;
    let spec: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| format!("parsing {}: {}", path.display(), e))?;

    let security_definitions = match spec.get("securityDefinitions") {
        Some(serde_json::Value::Object(raw)) => parse_security_definitions(name, raw)
            .map_err(|e| format!("invalid securityDefinitions: {}", e))?,
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(_) => return Err("securityDefinitions must be an object".to_string()),
    };

    Ok(Integration {
        name: name.to_string(),
        security_definitions,
    })
}
