use super::traits::{ModelClient, ModelFuture};
use super::types::{ModelRequest, ModelResponse, TokenUsage};

/// Offline client for dry runs: answers every prompt with a short,
/// deterministic placeholder section.
pub struct EchoClient;

impl ModelClient for EchoClient {
    fn name(&self) -> &str {
        "echo"
    }

    fn complete<'a>(&'a self, request: ModelRequest<'a>) -> ModelFuture<'a> {
        Box::pin(async move {
            let first_line = request
                .prompt
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("(empty prompt)");
            let text = format!(
                "[dry run] {} would answer a {}-character prompt.\n\n> {first_line}",
                request.model,
                request.prompt.chars().count()
            );
            let usage = TokenUsage::estimate(request.prompt, &text);
            Ok(ModelResponse {
                text,
                usage: Some(usage),
                model: Some(request.model.to_string()),
            })
        })
    }
}
