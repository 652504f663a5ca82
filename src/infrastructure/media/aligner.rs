use async_trait::async_trait;

use crate::application::ports::{CaptionAligner, MediaServiceError};
use crate::domain::{CaptionEntry, CaptionTrack};

/// Fallback speaking rate when the audio duration cannot be probed.
const WORDS_PER_SECOND: f64 = 2.5;

/// Deterministic caption alignment: the translated text is split into
/// sentences and each sentence receives a window of the audio duration
/// proportional to its word count. Windows are contiguous, so the
/// resulting track is sorted and non-overlapping by construction.
pub struct UniformCaptionAligner;

impl UniformCaptionAligner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UniformCaptionAligner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionAligner for UniformCaptionAligner {
    async fn align(&self, text: &str, audio: &[u8]) -> Result<CaptionTrack, MediaServiceError> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return CaptionTrack::new(Vec::new())
                .map_err(|e| MediaServiceError::Permanent(e.to_string()));
        }

        let word_counts: Vec<usize> = sentences
            .iter()
            .map(|s| s.split_whitespace().count().max(1))
            .collect();
        let total_words: usize = word_counts.iter().sum();

        let duration = wav_duration_secs(audio)
            .filter(|d| *d > 0.0)
            .unwrap_or(total_words as f64 / WORDS_PER_SECOND);

        let mut entries = Vec::with_capacity(sentences.len());
        let mut cursor = 0.0;
        for (sentence, words) in sentences.into_iter().zip(word_counts) {
            let span = duration * words as f64 / total_words as f64;
            let end = cursor + span;
            entries.push(CaptionEntry::new(cursor, end, sentence));
            cursor = end;
        }

        CaptionTrack::new(entries).map_err(|e| MediaServiceError::Permanent(e.to_string()))
    }
}

/// Sentence boundaries: western terminators plus the Devanagari danda
/// used across the supported Indic scripts.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?' | '।') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// Duration of a PCM WAV payload from its header, walking the RIFF
/// chunks for `fmt ` (byte rate) and `data` (payload size).
fn wav_duration_secs(data: &[u8]) -> Option<f64> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return None;
    }

    let mut byte_rate: Option<u32> = None;
    let mut data_len: Option<u32> = None;

    let mut offset = 12;
    while offset + 8 <= data.len() {
        let chunk_id = &data[offset..offset + 4];
        let chunk_size =
            u32::from_le_bytes([data[offset + 4], data[offset + 5], data[offset + 6], data[offset + 7]]);

        match chunk_id {
            b"fmt " if offset + 20 <= data.len() => {
                byte_rate = Some(u32::from_le_bytes([
                    data[offset + 16],
                    data[offset + 17],
                    data[offset + 18],
                    data[offset + 19],
                ]));
            }
            b"data" => {
                data_len = Some(chunk_size);
            }
            _ => {}
        }

        offset += 8 + chunk_size as usize;
        // Chunks are word-aligned.
        if chunk_size % 2 == 1 {
            offset += 1;
        }
    }

    match (byte_rate, data_len) {
        (Some(rate), Some(len)) if rate > 0 => Some(len as f64 / rate as f64),
        _ => None,
    }
}
