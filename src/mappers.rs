mod phoneme_table;

pub use phoneme_table::{PhonemeTableMapper, DEFAULT_SILENCE_TARGET};

/// Decides which blend shape a syllable token should move.
///
/// Implementations must be total: every input, including empty strings,
/// produces a target name.
pub trait SyllableMapper {
    fn map_to_target(&self, syllable: &str) -> String;
}

impl<F> SyllableMapper for F
where
    F: Fn(&str) -> String,
{
    fn map_to_target(&self, syllable: &str) -> String {
        self(syllable)
    }
}
