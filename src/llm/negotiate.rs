//! Calling-convention negotiation

use super::{Convention, LlmError, LlmRequest, LlmResponse, LlmService};

/// Issue `request` with `preferred`, falling back once to chat completions
/// when the upstream reports the responses convention as unsupported.
///
/// Returns the convention that actually produced the response so callers
/// can stick with it for the rest of the turn. A failure under chat
/// completions is final.
pub async fn complete_negotiated<L: LlmService + ?Sized>(
    service: &L,
    request: &LlmRequest,
    preferred: Convention,
) -> Result<(LlmResponse, Convention), LlmError> {
    match service.complete(request, preferred).await {
        Ok(response) => Ok((response, preferred)),
        Err(e) if preferred == Convention::Responses && e.kind.is_unsupported() => {
            tracing::warn!(
                error = %e.message,
                "Responses convention unsupported, falling back to chat completions"
            );
            let response = service
                .complete(request, Convention::ChatCompletions)
                .await?;
            Ok((response, Convention::ChatCompletions))
        }
        Err(e) => Err(e),
    }
}
