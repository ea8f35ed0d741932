use serde::Deserialize;

/// Body of a synthesis request
///
/// `text` is optional here so that a missing field is reported as a
/// validation error rather than a parse error.
#[derive(Debug, Default, Deserialize)]
pub struct SynthesisRequest {
    /// Text to synthesize; must contain something other than whitespace
    #[serde(default)]
    pub text: Option<String>,
    /// Voice identifier such as `en-US-ChristopherNeural`
    #[serde(default)]
    pub voice: Option<String>,
    /// Signed speaking rate such as `+10%`
    #[serde(default)]
    pub rate: Option<String>,
    /// Signed pitch offset such as `-2Hz`
    #[serde(default)]
    pub pitch: Option<String>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}
