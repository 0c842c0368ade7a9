use std::num::NonZeroUsize;

use futures::stream::{self, StreamExt};

use crate::models::PlaceEntry;
use crate::providers::TextGenerator;

/// What happened to one eligible place.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    Annotated { place_id: String },
    AlreadyAnnotated { place_id: String },
    Skipped { place_id: String, reason: String },
}

impl EnrichmentOutcome {
    pub fn is_annotated(&self) -> bool {
        matches!(self, Self::Annotated { .. })
    }
}

/// Best-effort descriptions for the leading places of a category.
pub struct EnrichmentPipeline<'a> {
    generator: &'a dyn TextGenerator,
    concurrency: NonZeroUsize,
}

impl<'a> EnrichmentPipeline<'a> {
    pub fn new(generator: &'a dyn TextGenerator, concurrency: NonZeroUsize) -> Self {
        Self {
            generator,
            concurrency,
        }
    }

    /// Annotate `entries[..limit]`; later entries are left untouched.
    ///
    /// Each eligible place gets one generation attempt. A failure leaves
    /// that place without `ai_details` and is reported in its outcome.
    pub async fn enrich(
        &self,
        entries: &mut [PlaceEntry],
        category: &str,
        limit: usize,
    ) -> Vec<EnrichmentOutcome> {
        let eligible = entries.len().min(limit);
        let mut outcomes = Vec::with_capacity(eligible);
        let mut pending = Vec::new();

        for (idx, entry) in entries.iter().take(eligible).enumerate() {
            if entry.ai_details.is_some() {
                outcomes.push((
                    idx,
                    EnrichmentOutcome::AlreadyAnnotated {
                        place_id: entry.place_id.clone(),
                    },
                ));
            } else {
                pending.push((idx, build_prompt(entry, category)));
            }
        }

        let generator = self.generator;
        let generated: Vec<_> = stream::iter(pending)
            .map(move |(idx, prompt)| async move { (idx, generator.generate(&prompt).await) })
            .buffered(self.concurrency.get())
            .collect()
            .await;

        for (idx, result) in generated {
            let Some(entry) = entries.get_mut(idx) else {
                continue;
            };
            let place_id = entry.place_id.clone();
            let outcome = match result {
                Ok(text) if !text.trim().is_empty() => {
                    entry.ai_details = Some(text);
                    EnrichmentOutcome::Annotated { place_id }
                }
                Ok(_) => EnrichmentOutcome::Skipped {
                    place_id,
                    reason: "empty description".to_string(),
                },
                Err(err) => {
                    tracing::warn!(category, place = %entry.name, "description generation failed: {err}");
                    EnrichmentOutcome::Skipped {
                        place_id,
                        reason: err.to_string(),
                    }
                }
            };
            outcomes.push((idx, outcome));
        }

        outcomes.sort_by_key(|(idx, _)| *idx);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

fn display_or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

pub fn build_prompt(place: &PlaceEntry, category: &str) -> String {
    format!(
        "You are a road trip guide. Write a short description for this place.\n\
         \n\
         Category: {category}\n\
         Name: {name}\n\
         Address: {address}\n\
         Rating: {rating}\n\
         Total Reviews: {reviews}\n\
         Google Maps: {url}\n\
         \n\
         Provide:\n\
         - 2 sentence summary\n\
         - 3 bullet reasons to visit\n\
         - Ideal audience (families, couples, etc.)",
        name = place.name,
        address = place.address,
        rating = display_or_unknown(place.rating),
        reviews = display_or_unknown(place.user_ratings_total),
        url = place.maps_url,
    )
}
