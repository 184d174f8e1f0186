//! Echo adapter: returns its input and the input length. Handy as a smoke
//! test for a deployment and as the smallest possible adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::debug;

use crate::adapter::contract::*;
use crate::errors::{InferenceError, SetupError};

#[derive(Debug, Default, Deserialize)]
struct EchoOptions {
    #[serde(default)]
    uppercase: bool,
}

#[derive(Default)]
pub struct EchoAdapter {
    options: Option<EchoOptions>,
}

impl EchoAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelAdapter for EchoAdapter {
    async fn setup(
        &mut self,
        model_path: &Path,
        params: &AdapterParams,
        device: &Device,
    ) -> Result<(), SetupError> {
        if self.options.is_some() {
            return Err(SetupError::AlreadyInitialized);
        }
        if !model_path.exists() {
            return Err(SetupError::ArtifactMissing(model_path.to_path_buf()));
        }
        debug!("echo adapter ready on {} (artifact {})", device, model_path.display());
        self.options = Some(params.parse()?);
        Ok(())
    }

    async fn inference(&self, input: &str) -> Result<InferenceOutput, InferenceError> {
        let options = self.options.as_ref().ok_or(InferenceError::NotReady)?;
        let text = if options.uppercase {
            input.to_uppercase()
        } else {
            input.to_string()
        };

        let mut out = InferenceOutput::new();
        out.insert("length".to_string(), json!(input.chars().count()));
        out.insert("text".to_string(), json!(text));
        Ok(out)
    }

    fn metadata(&self) -> AdapterMetadata {
        AdapterMetadata {
            adapter: "echo".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            reentrant: true,
        }
    }
}
