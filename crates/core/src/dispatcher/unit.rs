//! One provider's unit of work within a batch.

use std::sync::Arc;

use chatlist_model::{
    ConfigError, CredentialError, CredentialResolver, ParseError,
    ProviderConfig, RequestOutcome, TransportError,
};
use chatlist_providers::adapter_for;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::executor_client::ExecutorClient;
use crate::options::DispatchOptions;

/// Everything a unit needs besides its own configuration. Shared by all
/// units of a batch.
#[derive(Clone)]
pub(crate) struct UnitContext {
    pub prompt: Arc<str>,
    pub options: Arc<DispatchOptions>,
    pub executor: ExecutorClient,
    pub credentials: Arc<dyn CredentialResolver>,
    pub permits: Option<Arc<Semaphore>>,
}

#[derive(Debug, Error)]
enum UnitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Runs one provider call to completion.
///
/// Every failure is turned into a failed outcome, so the batch always
/// receives exactly one outcome from each unit.
pub(crate) async fn run(
    config: ProviderConfig,
    ctx: UnitContext,
) -> RequestOutcome {
    // Held until the unit returns.
    let _permit = match &ctx.permits {
        Some(permits) => Arc::clone(permits).acquire_owned().await.ok(),
        None => None,
    };

    // The deadline and the reported duration start once the request may be
    // issued, not while queued for a permit.
    let started = Instant::now();
    let result = attempt(&config, &ctx).await;
    let duration = started.elapsed();

    let outcome = match result {
        Ok(parsed) => RequestOutcome::success(
            config.id.clone(),
            config.name.as_str(),
            parsed,
            duration,
        ),
        Err(err) => RequestOutcome::failure(
            config.id.clone(),
            config.name.as_str(),
            err.to_string(),
            duration,
        ),
    };
    log_outcome(&outcome, ctx.prompt.len());
    outcome
}

async fn attempt(
    config: &ProviderConfig,
    ctx: &UnitContext,
) -> Result<chatlist_model::ParsedResponse, UnitError> {
    let kind = config.validate()?;
    let credential = ctx.credentials.resolve(&config.credential)?;

    let adapter = adapter_for(kind);
    let params = ctx.options.request_params(config);
    let req =
        adapter.build_request(&ctx.prompt, &credential, &config.url, &params);
    debug!("built request: {req:?}");

    let raw = ctx.executor.execute(req, ctx.options.timeout()).await?;
    Ok(adapter.parse_response(raw.status, &raw.body, &params)?)
}

fn log_outcome(outcome: &RequestOutcome, prompt_len: usize) {
    if outcome.is_success() {
        info!(
            provider = outcome.provider_name(),
            prompt_len,
            response_len = outcome.text().len(),
            tokens_used = outcome.tokens_used().unwrap_or(0),
            duration = ?outcome.duration(),
            "request succeeded"
        );
    } else {
        warn!(
            provider = outcome.provider_name(),
            prompt_len,
            duration = ?outcome.duration(),
            error = outcome.error().unwrap_or_default(),
            "request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chatlist_test_executor::{PresetReply, StaticCredentials, TestExecutor};

    use super::*;
    use crate::options::DispatchOptionsBuilder;

    const URL: &str = "https://api.anthropic.test/v1/messages";

    fn context(executor: TestExecutor) -> UnitContext {
        UnitContext {
            prompt: Arc::from("Hello"),
            options: Arc::new(
                DispatchOptionsBuilder::new().with_max_tokens(64).build(),
            ),
            executor: ExecutorClient::new(executor),
            credentials: Arc::new(
                StaticCredentials::default().with_secret("ANTHROPIC", "sk-ant"),
            ),
            permits: None,
        }
    }

    #[tokio::test]
    async fn test_successful_unit() {
        let mut executor = TestExecutor::default();
        executor.add_reply(URL, PresetReply::message_text("Salut"));
        let config =
            ProviderConfig::new("c", "Claude", URL, "ANTHROPIC", "anthropic");

        let outcome = run(config, context(executor.clone())).await;
        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(outcome.text(), "Salut");
        assert_eq!(outcome.tokens_used(), Some(12));

        let sent = executor.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header("x-api-key"), Some("sk-ant"));
        assert_eq!(sent[0].body["max_tokens"], 64);
    }

    #[tokio::test]
    async fn test_invalid_config_never_reaches_executor() {
        let executor = TestExecutor::default();
        let mut config =
            ProviderConfig::new("c", "Claude", URL, "ANTHROPIC", "anthropic");
        config.name = String::new();

        let outcome = run(config, context(executor.clone())).await;
        assert_eq!(outcome.error(), Some("provider name is missing"));
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut executor = TestExecutor::default();
        executor.add_reply(URL, PresetReply::raw("<html>oops</html>"));
        let config =
            ProviderConfig::new("c", "Claude", URL, "ANTHROPIC", "anthropic");

        let outcome = run(config, context(executor)).await;
        assert!(!outcome.is_success());
        assert!(
            outcome.error().unwrap().starts_with("malformed response"),
            "{outcome:?}"
        );
        assert!(outcome.duration() < Duration::from_secs(1));
    }
}
