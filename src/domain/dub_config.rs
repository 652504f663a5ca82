use std::fmt;
use std::str::FromStr;

use super::artifact::ArtifactRef;

/// Languages the dubbing pipeline accepts, as ISO 639-1 codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Hindi,
    Bengali,
    Telugu,
    Tamil,
    Marathi,
    Gujarati,
    Kannada,
    Malayalam,
}

impl Language {
    pub fn as_code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Bengali => "bn",
            Language::Telugu => "te",
            Language::Tamil => "ta",
            Language::Marathi => "mr",
            Language::Gujarati => "gu",
            Language::Kannada => "kn",
            Language::Malayalam => "ml",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Language::English),
            "hi" => Ok(Language::Hindi),
            "bn" => Ok(Language::Bengali),
            "te" => Ok(Language::Telugu),
            "ta" => Ok(Language::Tamil),
            "mr" => Ok(Language::Marathi),
            "gu" => Ok(Language::Gujarati),
            "kn" => Ok(Language::Kannada),
            "ml" => Ok(Language::Malayalam),
            _ => Err(format!("Unsupported language code: {}", s)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// Delivery style requested for the synthesized voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceStyle {
    Natural,
    Professional,
    Casual,
    News,
}

impl VoiceStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceStyle::Natural => "natural",
            VoiceStyle::Professional => "professional",
            VoiceStyle::Casual => "casual",
            VoiceStyle::News => "news",
        }
    }
}

impl FromStr for VoiceStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "natural" => Ok(VoiceStyle::Natural),
            "professional" => Ok(VoiceStyle::Professional),
            "casual" => Ok(VoiceStyle::Casual),
            "news" => Ok(VoiceStyle::News),
            _ => Err(format!("Unsupported voice style: {}", s)),
        }
    }
}

impl fmt::Display for VoiceStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable configuration of a dubbing job, fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct DubConfig {
    pub source_language: Language,
    pub target_language: Language,
    pub voice_style: VoiceStyle,
    pub generate_captions: bool,
    pub source_filename: String,
    pub source_size_bytes: u64,
    /// Where the staged upload lives in the artifact store.
    pub source: ArtifactRef,
}

impl DubConfig {
    /// Stable string used when hashing stage inputs, so identical
    /// sub-computations across jobs can share cached artifacts. The
    /// source location is deliberately excluded: two uploads with the
    /// same bytes and settings compute the same artifacts.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.source_language, self.target_language, self.voice_style, self.generate_captions
        )
    }
}
