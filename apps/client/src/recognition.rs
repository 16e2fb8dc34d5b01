//! Face recognition over the LLM vision path: presence checks for the camera
//! capture flow, and matching a captured face against the family's labeled
//! reference photos.
//!
//! Both answers degrade conservatively — an unusable reply means "no face" /
//! "nobody recognized", never an error the screen has to handle.

use tracing::warn;

use crate::llm_client::{prompts::ONE_WORD_SYSTEM, ImageAttachment, LlmClient};

const FACE_PRESENCE_PROMPT: &str =
    "Does this photo contain at least one clearly visible human face? Answer yes or no.";

/// A labeled photo of a known family member.
#[derive(Debug, Clone)]
pub struct ReferencePhoto {
    pub name: String,
    pub image: ImageAttachment,
}

pub struct FaceRecognizer {
    llm: LlmClient,
}

impl FaceRecognizer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Whether the captured frame contains a visible face.
    pub async fn detect_face(&self, image: &ImageAttachment) -> bool {
        let reply = self
            .llm
            .call_with_images(FACE_PRESENCE_PROMPT, ONE_WORD_SYSTEM, std::slice::from_ref(image))
            .await;
        match reply {
            Ok(response) => response.text().trim().to_lowercase().starts_with("yes"),
            Err(e) => {
                warn!("Face presence check failed: {e}; treating as no face");
                false
            }
        }
    }

    /// Matches the captured face against the reference photos. Returns the
    /// matched name, or `None` when the model answers "unknown", names someone
    /// not in the list, or the call fails.
    pub async fn identify_person(
        &self,
        image: &ImageAttachment,
        references: &[ReferencePhoto],
    ) -> Option<String> {
        if references.is_empty() {
            return None;
        }

        let mut images: Vec<ImageAttachment> =
            references.iter().map(|r| r.image.clone()).collect();
        images.push(image.clone());

        let names: Vec<&str> = references.iter().map(|r| r.name.as_str()).collect();
        let prompt = format!(
            "The first {} photos are reference photos of, in order: {}. \
             The final photo is a newly captured face. \
             If the captured face is one of the listed people, answer with exactly their name. \
             Otherwise answer unknown.",
            references.len(),
            names.join(", ")
        );

        let answer = match self.llm.call_with_images(&prompt, ONE_WORD_SYSTEM, &images).await {
            Ok(response) => response.text(),
            Err(e) => {
                warn!("Person identification failed: {e}; treating as unknown");
                return None;
            }
        };

        match_reference_name(&answer, &names).map(str::to_string)
    }
}

/// Maps the model's answer back onto a reference name, case-insensitively.
/// Anything that is not an exact listed name (including "unknown") is a miss.
fn match_reference_name<'a>(answer: &str, names: &[&'a str]) -> Option<&'a str> {
    let answer = answer.trim().trim_end_matches('.');
    names
        .iter()
        .find(|name| name.eq_ignore_ascii_case(answer))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_reference_name_exact() {
        assert_eq!(match_reference_name("Minji", &["Minji", "Junho"]), Some("Minji"));
    }

    #[test]
    fn test_match_reference_name_case_insensitive() {
        assert_eq!(match_reference_name("junho", &["Minji", "Junho"]), Some("Junho"));
    }

    #[test]
    fn test_match_reference_name_trailing_period() {
        assert_eq!(match_reference_name("Minji.", &["Minji"]), Some("Minji"));
    }

    #[test]
    fn test_match_reference_name_unknown_is_none() {
        assert_eq!(match_reference_name("unknown", &["Minji", "Junho"]), None);
    }

    #[test]
    fn test_match_reference_name_unlisted_is_none() {
        assert_eq!(match_reference_name("Somebody", &["Minji"]), None);
    }
}
