use std::collections::BTreeMap;

use super::SyllableMapper;
use crate::{
    model::AvatarConfig,
    syllables::{is_vowel, SILENCE},
};

/// Used when the phoneme table has no `sil` entry.
pub const DEFAULT_SILENCE_TARGET: &str = "vrc_v_sil";

const TH: &str = "th";

/// Maps a syllable to a blend shape by its first vowel.
///
/// Syllables without a vowel map to `th` if they contain it and to silence
/// otherwise. Keys missing from the table also map to silence.
#[derive(Debug, Clone)]
pub struct PhonemeTableMapper {
    mappings: BTreeMap<String, String>,
    silence_target: String,
}

impl PhonemeTableMapper {
    pub fn new(mappings: BTreeMap<String, String>) -> Self {
        let silence_target = mappings
            .get(SILENCE)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SILENCE_TARGET.to_string());

        Self {
            mappings,
            silence_target,
        }
    }

    pub fn from_config(config: &AvatarConfig) -> Self {
        Self::new(config.phoneme_mappings.clone())
    }

    pub fn silence_target(&self) -> &str {
        &self.silence_target
    }

    /// The table key for `syllable`.
    pub fn phoneme_key(syllable: &str) -> String {
        if syllable.eq_ignore_ascii_case(SILENCE) {
            return SILENCE.to_string();
        }

        if let Some(v) = syllable.chars().find(|c| is_vowel(*c)) {
            return v.to_ascii_lowercase().to_string();
        }

        if syllable.to_lowercase().contains(TH) {
            TH.to_string()
        } else {
            SILENCE.to_string()
        }
    }
}

impl SyllableMapper for PhonemeTableMapper {
    fn map_to_target(&self, syllable: &str) -> String {
        self.mappings
            .get(&Self::phoneme_key(syllable))
            .unwrap_or(&self.silence_target)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> PhonemeTableMapper {
        PhonemeTableMapper::from_config(&AvatarConfig::default())
    }

    #[test]
    fn first_vowel() {
        let m = mapper();

        assert_eq!(m.map_to_target("Do"), "vrc_v_oh");
        assert_eq!(m.map_to_target("thin"), "vrc_v_ih");
        assert_eq!(m.map_to_target("bAck"), "vrc_v_aa");
        assert_eq!(m.map_to_target("ue"), "vrc_v_ou");
    }

    #[test]
    fn silence_token() {
        assert_eq!(mapper().map_to_target("sil"), "vrc_v_sil");
        assert_eq!(mapper().map_to_target("SIL"), "vrc_v_sil");
    }

    #[test]
    fn no_vowel() {
        let m = mapper();

        assert_eq!(m.map_to_target("k"), "vrc_v_sil");
        assert_eq!(m.map_to_target("crwth"), "vrc_v_th");
        assert_eq!(m.map_to_target(""), "vrc_v_sil");
    }

    #[test]
    fn unknown_key_is_silence() {
        let mut table = BTreeMap::new();
        table.insert("a".to_string(), "open".to_string());
        table.insert("sil".to_string(), "closed".to_string());
        let m = PhonemeTableMapper::new(table);

        assert_eq!(m.map_to_target("ba"), "open");
        assert_eq!(m.map_to_target("be"), "closed");
    }

    #[test]
    fn missing_silence_entry() {
        let m = PhonemeTableMapper::new(BTreeMap::new());

        assert_eq!(m.silence_target(), DEFAULT_SILENCE_TARGET);
        assert_eq!(m.map_to_target("hello"), DEFAULT_SILENCE_TARGET);
    }

    #[test]
    fn total_and_idempotent() {
        let m = mapper();
        let targets = AvatarConfig::default()
            .phoneme_mappings
            .into_values()
            .collect::<Vec<_>>();

        for syllable in ["", "sil", "a", "Yo", "psst", "th", "123", "ünï", "?!"] {
            let first = m.map_to_target(syllable);

            assert!(targets.contains(&first), "{syllable} -> {first}");
            assert_eq!(first, m.map_to_target(syllable));
        }
    }

    #[test]
    fn closure_mapper() {
        let m = |s: &str| format!("shape_{}", s.len());

        assert_eq!(m.map_to_target("abc"), "shape_3");
    }
}
