mod artifact_store;
mod audio_extractor;
mod caption_aligner;
mod job_repository;
mod media_service_error;
mod progress_notifier;
mod repository_error;
mod speech_synthesizer;
mod speech_to_text;
mod translator;
mod video_remuxer;

pub use artifact_store::{ArtifactStore, ArtifactStoreError};
pub use audio_extractor::AudioExtractor;
pub use caption_aligner::CaptionAligner;
pub use job_repository::JobRepository;
pub use media_service_error::MediaServiceError;
pub use progress_notifier::ProgressNotifier;
pub use repository_error::RepositoryError;
pub use speech_synthesizer::SpeechSynthesizer;
pub use speech_to_text::SpeechToText;
pub use translator::Translator;
pub use video_remuxer::VideoRemuxer;
