use prd_core::config::{Config, ProviderConfig};
use prd_core::prompt;
use prd_core::provider::{ChunkContext, EnhancementProvider, ProviderError, StubProvider};
use prd_driver::{DriverConfig, DriverError};
use std::path::Path;

/// Sends each chunk through the external driver program and pulls the
/// rewritten chunk out of the transcript.
pub struct DriverProvider {
    driver: DriverConfig,
    project_name: String,
}

impl DriverProvider {
    pub fn new(driver: DriverConfig, project_name: impl Into<String>) -> Self {
        Self {
            driver,
            project_name: project_name.into(),
        }
    }
}

impl EnhancementProvider for DriverProvider {
    fn provide_replacement(
        &mut self,
        original: &str,
        ctx: &ChunkContext,
    ) -> Result<String, ProviderError> {
        let prompt = prompt::build_prompt(ctx, original, &self.project_name);

        let mut driver = self.driver.clone();
        driver.env.push(("PRD_CHUNK_ID".into(), ctx.chunk_id.to_string()));
        driver.env.push(("PRD_PHASE_ID".into(), ctx.phase_id.clone()));

        let output = prd_driver::run_blocking(&prompt, &driver).map_err(|e| match e {
            DriverError::Timeout(secs) => ProviderError::Timeout(secs),
            other => ProviderError::Driver(other.to_string()),
        })?;
        if !output.stderr.is_empty() {
            tracing::debug!(chunk = ctx.chunk_id, stderr = %output.stderr, "driver stderr");
        }

        prompt::extract_improved(&output.transcript).ok_or_else(|| {
            ProviderError::MalformedResponse(format!(
                "no {} ... {} block in a {}-byte transcript",
                prompt::CHUNK_START,
                prompt::CHUNK_END,
                output.transcript.len()
            ))
        })
    }

    fn name(&self) -> &str {
        "driver"
    }
}

/// Provider selected by the config, or the stub when `force_stub` is set.
pub fn from_config(
    config: &Config,
    root: &Path,
    force_stub: bool,
) -> Box<dyn EnhancementProvider> {
    match (&config.provider, force_stub) {
        (_, true) | (ProviderConfig::Stub, _) => Box::new(StubProvider::new()),
        (
            ProviderConfig::Driver {
                program,
                args,
                wait_seconds,
                grace_seconds,
                transcript_command,
            },
            false,
        ) => {
            let driver = DriverConfig {
                program: program.clone(),
                args: args.clone(),
                wait_seconds: *wait_seconds,
                grace_seconds: *grace_seconds,
                transcript_command: transcript_command.clone(),
                env: Vec::new(),
                cwd: Some(root.to_path_buf()),
            };
            Box::new(DriverProvider::new(driver, config.project.name.clone()))
        }
    }
}
