//! Inline yes/no confirmation of profile metadata.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::engine::ProfileMetadata;
use crate::transport::InlineButton;

const YES_LABEL: &str = "Yes";
const NO_LABEL: &str = "No";

static PROMPT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// One rendered confirmation prompt.
///
/// Button payloads embed a timestamp-derived token unique to this prompt, so a
/// press on an old prompt can never resolve a newer one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    text: String,
    token: String,
    yes: InlineButton,
    no: InlineButton,
}

impl ConfirmPrompt {
    pub fn new(metadata: &ProfileMetadata) -> Self {
        let nanos = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| Utc::now().timestamp_micros() * 1_000);
        // Two prompts within the same nanosecond still get distinct tokens.
        let token = format!(
            "{}-{}",
            nanos,
            PROMPT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );
        Self {
            text: render_metadata(metadata),
            yes: InlineButton::new(YES_LABEL, format!("{}:{}", token, YES_LABEL)),
            no: InlineButton::new(NO_LABEL, format!("{}:{}", token, NO_LABEL)),
            token,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn buttons(&self) -> [InlineButton; 2] {
        [self.yes.clone(), self.no.clone()]
    }

    /// Button payloads paired with the decision each one stands for.
    pub fn decisions(&self) -> [(String, bool); 2] {
        [(self.yes.data.clone(), true), (self.no.data.clone(), false)]
    }
}

/// Question text listing the profile metadata.
pub fn render_metadata(metadata: &ProfileMetadata) -> String {
    format!(
        "Are you sure you want to download this profile?\n\
         Provider Name: {}\n\
         Profile Name: {}\n\
         ICCID: {}",
        metadata.provider_name, metadata.profile_name, metadata.iccid
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ProfileMetadata {
        ProfileMetadata::new("Example Telecom", "Travel 5GB", "8944000000000000001")
    }

    #[test]
    fn test_prompt_text_lists_metadata() {
        let prompt = ConfirmPrompt::new(&metadata());
        assert!(prompt.text().starts_with("Are you sure"));
        assert!(prompt.text().contains("Provider Name: Example Telecom"));
        assert!(prompt.text().contains("Profile Name: Travel 5GB"));
        assert!(prompt.text().contains("ICCID: 8944000000000000001"));
    }

    #[test]
    fn test_buttons_map_to_decisions() {
        let prompt = ConfirmPrompt::new(&metadata());
        let [yes, no] = prompt.buttons();
        assert_eq!(yes.label, "Yes");
        assert_eq!(no.label, "No");

        let decisions = prompt.decisions();
        assert_eq!(decisions[0], (yes.data, true));
        assert_eq!(decisions[1], (no.data, false));
    }

    #[test]
    fn test_tokens_unique_per_prompt() {
        let a = ConfirmPrompt::new(&metadata());
        let b = ConfirmPrompt::new(&metadata());
        assert_ne!(a.token(), b.token());
        assert_ne!(a.buttons()[0].data, b.buttons()[0].data);
    }
}
