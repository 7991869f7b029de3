/*!
Text-to-speech orchestration.

The mouth animation and the audio are started independently. The animation
length comes from a words-per-minute estimate and is never corrected against
the real audio, so the two can drift apart on long utterances.
*/

use std::time::Duration;

use crate::{
    events::{Command, CommandPublisher},
    model::SpeechSettings,
    puppets::{shape_key_animator::ShapeKeyAnimator, MorphSink},
    scheduler::{seconds_f64, Scheduler},
    syllables::{is_punctuation, text_to_syllables_with},
    Logger,
};

/// Text handed to the speech engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    /// Language or voice identifier, e.g. `en-US`.
    pub voice: String,
}

/// The external speech engine.
pub trait SpeechSynthesizer {
    /// Start speaking. Must not block.
    fn speak(&mut self, utterance: &Utterance);

    /// Returns `true` once for every utterance that finished playing.
    fn poll_finished(&mut self) -> bool {
        false
    }
}

/// A synthesizer that only logs what it would have said.
#[derive(Debug)]
pub struct LoggingSynthesizer {
    logger: Logger,
    spoken: Vec<Utterance>,
}

impl Default for LoggingSynthesizer {
    fn default() -> Self {
        Self {
            logger: Logger::create("LoggingSynthesizer"),
            spoken: vec![],
        }
    }
}

impl LoggingSynthesizer {
    pub fn spoken(&self) -> &[Utterance] {
        &self.spoken
    }
}

impl SpeechSynthesizer for LoggingSynthesizer {
    fn speak(&mut self, utterance: &Utterance) {
        self.logger
            .info(format!("Speaking ({}): {}", utterance.voice, utterance.text));
        self.spoken.push(utterance.clone());
    }
}

/// What [TextToSpeech::speak] decided to do with a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechPlan {
    pub words: usize,
    pub duration: Duration,
    pub syllables: Vec<String>,
}

/// Number of words in `text`. Words are separated by whitespace or punctuation.
pub fn word_count(text: &str) -> usize {
    text.split(|c: char| c.is_whitespace() || is_punctuation(c))
        .filter(|v| !v.is_empty())
        .count()
}

/// How long it should take to say `text` at `words_per_minute`.
pub fn estimate_duration(text: &str, words_per_minute: f32) -> Duration {
    if words_per_minute.is_nan() || words_per_minute <= 0.0 {
        return Duration::ZERO;
    }

    let minutes = word_count(text) as f64 / f64::from(words_per_minute);
    seconds_f64(minutes * 60.0)
}

#[derive(Debug)]
pub struct TextToSpeech<S: SpeechSynthesizer> {
    logger: Logger,

    synthesizer: S,
    settings: SpeechSettings,
    gestures: Option<CommandPublisher>,

    pending: Scheduler<Utterance>,
}

impl<S: SpeechSynthesizer> TextToSpeech<S> {
    pub fn new(synthesizer: S, settings: SpeechSettings) -> Self {
        Self {
            logger: Logger::create("TextToSpeech"),

            synthesizer,
            settings,
            gestures: None,

            pending: Scheduler::new(),
        }
    }

    /// Publish a nod or shake whenever spoken text contains yes or no.
    pub fn with_gestures(mut self, publisher: CommandPublisher) -> Self {
        self.gestures = Some(publisher);
        self
    }

    /// Start the mouth animation for `text` now and queue the audio.
    pub fn speak<M: MorphSink>(&mut self, text: &str, animator: &mut ShapeKeyAnimator<M>) -> SpeechPlan {
        let words = word_count(text);
        let duration = estimate_duration(text, self.settings.words_per_minute);

        let gestures = self.gestures.as_ref();
        let syllables = text_to_syllables_with(text, |gesture| {
            if let Some(publisher) = gestures {
                if !publisher.publish(Command::from(gesture)) {
                    self.logger.warn("Command bus is gone, dropping gesture");
                }
            }
        });

        self.logger.debug(format!(
            "{words} words, {} syllables, estimated {duration:?}",
            syllables.len()
        ));

        animator.animate_syllable_sequence(syllables.clone(), duration);

        self.pending.schedule_after(
            self.settings.start_delay(),
            Utterance {
                text: text.to_string(),
                voice: self.settings.voice.clone(),
            },
        );

        SpeechPlan {
            words,
            duration,
            syllables,
        }
    }

    /// Hand due utterances to the synthesizer and check for finished ones.
    pub fn update(&mut self, dt: Duration) {
        let until = self.pending.now().saturating_add(dt);
        while let Some((due, utterance)) = self.pending.pop_due(until) {
            self.pending.advance_to(due);
            self.synthesizer.speak(&utterance);
        }
        self.pending.advance_to(until);

        while self.synthesizer.poll_finished() {
            self.logger.debug("Utterance finished");
        }
    }

    /// Utterances waiting for their start delay.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn settings(&self) -> &SpeechSettings {
        &self.settings
    }

    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }
}
