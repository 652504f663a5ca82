use std::fmt;
use std::str::FromStr;

/// One step of the fixed dubbing pipeline. The sequence is static; each
/// stage consumes the source upload and/or earlier stage outputs and
/// produces exactly one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    ExtractAudio,
    Transcribe,
    Translate,
    Synthesize,
    AlignCaptions,
    Remux,
}

/// Input required by a stage before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    /// The originally uploaded video file.
    SourceVideo,
    /// The artifact produced by an earlier stage.
    Output(Stage),
}

impl Stage {
    /// Pipeline order. Every job runs these strictly in sequence.
    pub const SEQUENCE: [Stage; 6] = [
        Stage::ExtractAudio,
        Stage::Transcribe,
        Stage::Translate,
        Stage::Synthesize,
        Stage::AlignCaptions,
        Stage::Remux,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ExtractAudio => "extract_audio",
            Stage::Transcribe => "transcribe",
            Stage::Translate => "translate",
            Stage::Synthesize => "synthesize",
            Stage::AlignCaptions => "align_captions",
            Stage::Remux => "remux",
        }
    }

    pub fn ordinal(&self) -> usize {
        Self::SEQUENCE
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::SEQUENCE.len())
    }

    /// Inputs that must exist in the artifact store before the stage runs.
    pub fn requires(&self) -> &'static [StageInput] {
        match self {
            Stage::ExtractAudio => &[StageInput::SourceVideo],
            Stage::Transcribe => &[StageInput::Output(Stage::ExtractAudio)],
            Stage::Translate => &[StageInput::Output(Stage::Transcribe)],
            Stage::Synthesize => &[StageInput::Output(Stage::Translate)],
            Stage::AlignCaptions => &[
                StageInput::Output(Stage::Translate),
                StageInput::Output(Stage::Synthesize),
            ],
            Stage::Remux => &[
                StageInput::SourceVideo,
                StageInput::Output(Stage::Synthesize),
            ],
        }
    }

    /// Canonical file name for this stage's output artifact.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Stage::ExtractAudio => "source_audio.wav",
            Stage::Transcribe => "transcript.txt",
            Stage::Translate => "translated.txt",
            Stage::Synthesize => "dubbed_audio.wav",
            Stage::AlignCaptions => "captions.json",
            Stage::Remux => "dubbed_video.mp4",
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extract_audio" => Ok(Stage::ExtractAudio),
            "transcribe" => Ok(Stage::Transcribe),
            "translate" => Ok(Stage::Translate),
            "synthesize" => Ok(Stage::Synthesize),
            "align_captions" => Ok(Stage::AlignCaptions),
            "remux" => Ok(Stage::Remux),
            _ => Err(format!("Invalid stage: {}", s)),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
