//! Fan-out multiplexer - one user message, every provider at once.
//!
//! Each provider runs in its own task; fragments stream to the relay tagged
//! with the provider's label so subscribers can demultiplex the interleaved
//! traffic. Results are collected as units finish, and one provider's error
//! never cancels its siblings - it becomes that provider's result entry.

use futures::StreamExt;
use mindloom_ai::llm::{CompletionRequest, LlmClient, Message};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::AppCore;
use crate::models::ProviderReply;
use crate::relay::StreamRelay;

use super::FANOUT_SYSTEM_PROMPT;

/// Run one user message against every registered provider concurrently.
///
/// Returns one entry per provider, keyed by label, after **all** units have
/// finished; completion order is independent of launch order.
pub async fn fan_out(
    core: &Arc<AppCore>,
    channel: &str,
    user_input: &str,
) -> HashMap<String, ProviderReply> {
    let mut join_set = JoinSet::new();

    for entry in core.providers.entries() {
        let relay = core.relay.clone();
        let client = entry.client.clone();
        let label = entry.label.clone();
        let detail_model = entry.detail_model.clone();
        let channel = channel.to_string();
        let user_input = user_input.to_string();
        let pacing = core.config.stream_pacing;

        join_set.spawn(async move {
            let reply = run_provider_unit(
                &relay,
                client.as_ref(),
                &label,
                &detail_model,
                &channel,
                &user_input,
                pacing,
            )
            .await;
            (label, reply)
        });
    }

    let mut results = HashMap::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((label, reply)) => {
                debug!(provider = %label, failed = reply.is_error(), "Fan-out unit finished");
                results.insert(label, reply);
            }
            Err(e) => warn!(error = %e, "Fan-out unit panicked"),
        }
    }

    results
}

async fn run_provider_unit(
    relay: &Arc<StreamRelay>,
    client: &dyn LlmClient,
    label: &str,
    detail_model: &str,
    channel: &str,
    user_input: &str,
    pacing: Duration,
) -> ProviderReply {
    let publisher = relay.paced_publisher(channel, Some(label.to_string()), pacing);

    let request = CompletionRequest::new(vec![
        Message::system(FANOUT_SYSTEM_PROMPT),
        Message::user(user_input),
    ])
    .with_temperature(0.5)
    .with_max_tokens(4096);

    let outcome = if client.supports_streaming() {
        let mut stream = client.complete_stream(request);
        let mut full_response = String::new();
        let mut failure = None;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    if chunk.text.trim().is_empty() {
                        continue;
                    }
                    publisher.send(chunk.text.clone());
                    full_response.push_str(&chunk.text);
                }
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            }
        }

        match failure {
            None => Ok(full_response),
            Some(error) => Err(error),
        }
    } else {
        // Batch-only provider: one blocking call off the caller's path, then
        // synthesized fragments preserve the illusion of streaming.
        match client.complete(request).await {
            Ok(response) => {
                for word in response.content.split_whitespace() {
                    publisher.send(format!("{word} "));
                }
                Ok(response.content)
            }
            Err(e) => Err(e.to_string()),
        }
    };

    // Flush queued fragments before reporting this unit as done.
    publisher.finish().await;

    match outcome {
        Ok(text) => ProviderReply::success(detail_model, text),
        Err(error) => {
            warn!(provider = %label, error = %error, "Provider unit failed");
            ProviderReply::failure(detail_model, error)
        }
    }
}
