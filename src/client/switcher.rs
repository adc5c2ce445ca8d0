use super::{Client, EvaluateOptions};
use crate::Result;
use crate::model::{EvaluationRequest, EvaluationResult, StrategyType};
use core::time::Duration;

/// Builder for one evaluation of a switch.
///
/// ```no_run
/// # async fn demo(client: switcher_client::Client) -> switcher_client::Result<()> {
/// let on = client
///     .switcher("FEATURE01")
///     .check_value("USER_1")
///     .check_network("10.0.0.3")
///     .throttle(core::time::Duration::from_secs(1))
///     .is_on()
///     .await?;
/// # let _ = on;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Switcher {
    client: Client,
    request: EvaluationRequest,
    options: EvaluateOptions,
}

impl Switcher {
    pub(super) fn new(client: Client, key: impl Into<String>) -> Self {
        Self {
            client,
            request: EvaluationRequest::new(key),
            options: EvaluateOptions::default(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        self.request.key()
    }

    #[must_use]
    pub const fn request(&self) -> &EvaluationRequest {
        &self.request
    }

    #[must_use]
    pub fn check(mut self, strategy: StrategyType, input: impl Into<String>) -> Self {
        self.request.push(strategy, input);
        self
    }

    #[must_use]
    pub fn check_value(self, input: impl Into<String>) -> Self {
        self.check(StrategyType::Value, input)
    }

    #[must_use]
    pub fn check_numeric(self, input: impl Into<String>) -> Self {
        self.check(StrategyType::Numeric, input)
    }

    #[must_use]
    pub fn check_network(self, input: impl Into<String>) -> Self {
        self.check(StrategyType::Network, input)
    }

    #[must_use]
    pub fn check_date(self, input: impl Into<String>) -> Self {
        self.check(StrategyType::Date, input)
    }

    #[must_use]
    pub fn check_time(self, input: impl Into<String>) -> Self {
        self.check(StrategyType::Time, input)
    }

    #[must_use]
    pub fn check_regex(self, input: impl Into<String>) -> Self {
        self.check(StrategyType::Regex, input)
    }

    #[must_use]
    pub fn check_payload(self, input: impl Into<String>) -> Self {
        self.check(StrategyType::Payload, input)
    }

    /// Serve repeated evaluations from cache, refreshing in the background every `delay`.
    #[must_use]
    pub fn throttle(mut self, delay: Duration) -> Self {
        self.options.throttle = Some(delay);
        self
    }

    /// Force the remote authority (`true`) or the local snapshot (`false`).
    #[must_use]
    pub fn remote(mut self, remote: bool) -> Self {
        self.options.remote = Some(remote);
        self
    }

    /// Answer `result` instead of failing when the remote authority is unreachable.
    #[must_use]
    pub fn default_result(mut self, result: bool) -> Self {
        self.options.default_result = Some(result);
        self
    }

    /// Returns `true` if the switch is on.
    ///
    /// # Errors
    ///
    /// See [`Client::evaluate_with`].
    pub async fn is_on(&self) -> Result<bool> {
        Ok(self.client.evaluate_with(&self.request, &self.options).await?.result)
    }

    /// Evaluate and return the full result, including the reason.
    ///
    /// # Errors
    ///
    /// See [`Client::evaluate_with`].
    pub async fn is_on_detail(&self) -> Result<EvaluationResult> {
        let options = EvaluateOptions {
            detail: true,
            ..self.options.clone()
        };
        self.client.evaluate_with(&self.request, &options).await
    }
}
