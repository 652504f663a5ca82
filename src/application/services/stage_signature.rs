use sha2::{Digest, Sha256};

use crate::domain::{DubConfig, Stage};

/// Content signature of one stage invocation: the stage name, the parts
/// of the config that influence its output, and the exact input bytes.
/// Two jobs with the same signature would compute the same artifact, so
/// the result can be shared through the cache namespace of the store.
pub fn stage_signature(stage: Stage, config: &DubConfig, inputs: &[(&str, &[u8])]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stage.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(config.fingerprint().as_bytes());
    for (name, data) in inputs {
        hasher.update(b"\0");
        hasher.update(name.as_bytes());
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
    }

    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
