//! Model weight resolution.
//!
//! A model source is either a local directory or an `hf://owner/repo`
//! registry identifier (optionally pinned with `@revision`). Resolution
//! happens once at startup and fails fast: a service that cannot load its
//! model must not come up.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use habla_core::{TtsError, TtsResult};

/// Model configuration file name inside a model directory.
pub const CONFIG_FILE: &str = "config.json";

/// Weight file name inside a model directory.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Where model files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A local directory containing `config.json` and `model.safetensors`.
    Local(PathBuf),
    /// A Hugging Face hub repository.
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
    },
}

impl ModelSource {
    /// Parse a source string: `hf://owner/repo[@revision]` or a local path.
    pub fn parse(s: &str) -> TtsResult<Self> {
        if let Some(stripped) = s.strip_prefix("hf://") {
            let (repo_id, revision) = match stripped.split_once('@') {
                Some((repo, rev)) => (repo.to_string(), Some(rev.to_string())),
                None => (stripped.to_string(), None),
            };
            if repo_id.split('/').filter(|p| !p.is_empty()).count() != 2 {
                return Err(TtsError::config(format!(
                    "invalid hf:// source (expected hf://owner/repo): {s}"
                )));
            }
            return Ok(Self::HuggingFace { repo_id, revision });
        }

        if s.starts_with("http://") || s.starts_with("https://") {
            return Err(TtsError::config(format!(
                "raw HTTP(S) model sources are not supported: {s}"
            )));
        }

        Ok(Self::Local(PathBuf::from(s)))
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::HuggingFace { repo_id, revision } => match revision {
                Some(rev) => write!(f, "hf://{repo_id}@{rev}"),
                None => write!(f, "hf://{repo_id}"),
            },
        }
    }
}

/// Resolved paths to model files.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    /// Path to the model configuration JSON.
    pub config_path: PathBuf,
    /// Path to the safetensors weight file.
    pub weights_path: PathBuf,
    /// Original source identifier, for diagnostics.
    pub source_id: String,
}

/// Resolve a model source to local file paths, downloading from the hub
/// when necessary.
pub fn resolve(source: &ModelSource) -> TtsResult<ResolvedModel> {
    let source_id = source.to_string();
    match source {
        ModelSource::Local(dir) => resolve_local(dir, &source_id),
        ModelSource::HuggingFace { repo_id, revision } => {
            resolve_hub(repo_id, revision.as_deref(), &source_id)
        }
    }
}

fn resolve_local(dir: &Path, source_id: &str) -> TtsResult<ResolvedModel> {
    if !dir.is_dir() {
        return Err(TtsError::model_load(
            source_id,
            "model directory does not exist",
        ));
    }

    let config_path = dir.join(CONFIG_FILE);
    let weights_path = dir.join(WEIGHTS_FILE);

    for (path, what) in [(&config_path, CONFIG_FILE), (&weights_path, WEIGHTS_FILE)] {
        if !path.is_file() {
            return Err(TtsError::model_load(
                source_id,
                format!("missing {what} in model directory"),
            ));
        }
    }

    info!(dir = %dir.display(), "resolved local model");
    Ok(ResolvedModel {
        config_path,
        weights_path,
        source_id: source_id.to_string(),
    })
}

fn resolve_hub(repo_id: &str, revision: Option<&str>, source_id: &str) -> TtsResult<ResolvedModel> {
    let api = hf_hub::api::sync::Api::new()
        .map_err(|e| TtsError::model_load(source_id, format!("hub api: {e}")))?;

    let repo = match revision {
        Some(rev) => api.repo(hf_hub::Repo::with_revision(
            repo_id.to_string(),
            hf_hub::RepoType::Model,
            rev.to_string(),
        )),
        None => api.repo(hf_hub::Repo::model(repo_id.to_string())),
    };

    let config_path = repo
        .get(CONFIG_FILE)
        .map_err(|e| TtsError::model_load(source_id, format!("fetch {CONFIG_FILE}: {e}")))?;
    let weights_path = repo
        .get(WEIGHTS_FILE)
        .map_err(|e| TtsError::model_load(source_id, format!("fetch {WEIGHTS_FILE}: {e}")))?;

    info!(repo = repo_id, "resolved hub model");
    Ok(ResolvedModel {
        config_path,
        weights_path,
        source_id: source_id.to_string(),
    })
}
