//! Tool dispatcher
//!
//! Applies decoded tool calls to the shared presentation. Each call takes the
//! write lock for its own duration only, so bounds are always checked against
//! the document as left by the previous call in the batch.

use super::{ToolInput, ToolOutput};
use crate::deck::{DeckError, DeckObserver, SharedPresentation};
use serde_json::json;
use std::sync::Arc;

pub struct ToolDispatcher {
    presentation: SharedPresentation,
    observer: Arc<dyn DeckObserver>,
}

impl ToolDispatcher {
    pub fn new(presentation: SharedPresentation, observer: Arc<dyn DeckObserver>) -> Self {
        Self {
            presentation,
            observer,
        }
    }

    /// Decode and execute a raw `(name, arguments)` pair
    #[cfg(test)]
    pub async fn execute_named(&self, name: &str, arguments: serde_json::Value) -> ToolOutput {
        self.execute(&ToolInput::from_name_and_value(name, arguments))
            .await
    }

    pub async fn execute(&self, input: &ToolInput) -> ToolOutput {
        let output = self.apply(input).await;
        if output.success {
            tracing::info!(
                tool = %input.tool_name(),
                read_only = input.is_read_only(),
                "Tool executed"
            );
        } else {
            tracing::info!(tool = %input.tool_name(), error = %output.output, "Tool failed");
        }
        output
    }

    async fn apply(&self, input: &ToolInput) -> ToolOutput {
        match input {
            ToolInput::GetAllSlides => {
                let presentation = self.presentation.read().await;
                let deck = &presentation.deck;
                ToolOutput::success(format!("Retrieved {} slides", deck.total_slides()))
                    .with_payload(json!({
                        "slides": deck.slides(),
                        "total_slides": deck.total_slides(),
                        "current_index": deck.current_index(),
                    }))
            }
            ToolInput::GetTotalSlides => {
                let total = self.presentation.read().await.deck.total_slides();
                ToolOutput::success(format!("The presentation has {total} slides"))
                    .with_payload(json!({ "total_slides": total }))
            }
            ToolInput::ReplaceAllSlides(args) => {
                let mut presentation = self.presentation.write().await;
                presentation.deck.replace_all_slides(args.slides.clone());
                let snapshot = presentation.snapshot();
                drop(presentation);

                let total = snapshot.total_slides;
                self.observer.slides_changed(snapshot);
                ToolOutput::success(format!("Replaced all slides ({total} total)"))
                    .with_payload(json!({ "total_slides": total }))
            }
            ToolInput::ClearAllSlides => {
                let mut presentation = self.presentation.write().await;
                presentation.deck.clear_all_slides();
                let snapshot = presentation.snapshot();
                drop(presentation);

                self.observer.slides_changed(snapshot);
                ToolOutput::success("Cleared all slides").with_payload(json!({ "total_slides": 0 }))
            }
            ToolInput::UpdateSlide(args) => {
                let mut presentation = self.presentation.write().await;
                let result = slide_index(args.index).and_then(|i| {
                    presentation
                        .deck
                        .update_slide(i, args.content.clone())
                        .map(|()| i)
                });
                match result {
                    Ok(index) => {
                        let snapshot = presentation.snapshot();
                        drop(presentation);

                        let total = snapshot.total_slides;
                        self.observer.slides_changed(snapshot);
                        ToolOutput::success(format!("Updated slide {index}"))
                            .with_payload(json!({ "total_slides": total }))
                    }
                    Err(e) => ToolOutput::error(e.to_string()),
                }
            }
            ToolInput::DeleteSlide(args) => {
                let mut presentation = self.presentation.write().await;
                let result = slide_index(args.index)
                    .and_then(|i| presentation.deck.delete_slide(i).map(|()| i));
                match result {
                    Ok(index) => {
                        let snapshot = presentation.snapshot();
                        drop(presentation);

                        let total = snapshot.total_slides;
                        self.observer.slides_changed(snapshot);
                        ToolOutput::success(format!("Deleted slide {index}"))
                            .with_payload(json!({ "total_slides": total }))
                    }
                    Err(e) => ToolOutput::error(e.to_string()),
                }
            }
            ToolInput::AddSlide(args) => {
                if let Some(slide_type) = &args.slide_type {
                    tracing::debug!(%slide_type, "Adding slide with layout hint");
                }
                let mut presentation = self.presentation.write().await;
                let index = presentation
                    .deck
                    .add_slide(args.content_with_notes(), args.insert_position());
                let index = presentation.deck.navigate_to_slide(index);
                let snapshot = presentation.snapshot();
                drop(presentation);

                let total = snapshot.total_slides;
                self.observer.slides_changed(snapshot);
                self.observer.navigated(index);
                ToolOutput::success(format!("Added slide at index {index}"))
                    .with_payload(json!({ "total_slides": total, "index": index }))
            }
            ToolInput::ChangeTheme(args) => {
                let mut presentation = self.presentation.write().await;
                presentation.theme = args.theme;
                let snapshot = presentation.snapshot();
                drop(presentation);

                self.observer.slides_changed(snapshot);
                ToolOutput::success(format!("Theme changed to {}", args.theme))
            }
            ToolInput::Unknown { name, .. } => ToolOutput::error(format!("Unknown tool: {name}")),
            ToolInput::Invalid { error, .. } => ToolOutput::error(error.clone()),
        }
    }
}

fn slide_index(index: i64) -> Result<usize, DeckError> {
    usize::try_from(index).map_err(|_| DeckError::NegativeIndex(index))
}
