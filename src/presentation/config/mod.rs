mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    JobStoreProviderSetting, JobStoreSettings, LoggingSettings, MediaProviderSetting,
    MediaSettings, PipelineSettings, ServerSettings, Settings, StorageProviderSetting,
    StorageSettings, SynthesisApiSettings, TranscriptionApiSettings, TranslationApiSettings,
};
