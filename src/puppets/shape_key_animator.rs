/*!
Drives blend shape weights over time.

Every animation is a channel that ramps a set of blend shapes from 0.0 up to
1.0 and back down. Channels are independent; they all write into the same
[MorphSink], so channels driving the same blend shape simply overwrite each
other.

Two timers feed the channels: the idle blink loop, which lives as long as the
animator, and any syllable sequences started for speech.
*/

use std::{collections::HashMap, time::Duration};

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    mappers::{PhonemeTableMapper, SyllableMapper},
    model::{AnimationSettings, AvatarConfig, BlendShapeTable},
    scheduler::{random_interval, Scheduler},
    Logger,
};

use super::MorphSink;

/// What started a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// The idle blink loop.
    Blink,
    /// A syllable of a speech sequence.
    Speech,
    /// Anything triggered directly, e.g. by a command.
    Manual,
}

/// One in-flight ramp.
#[derive(Debug, Clone)]
pub struct Channel {
    kind: ChannelKind,
    indices: Vec<usize>,
    duration: Duration,
    elapsed: Duration,
    started_at: Duration,
}

impl Channel {
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Animator time at which the channel started.
    pub fn started_at(&self) -> Duration {
        self.started_at
    }

    pub fn weight(&self) -> f32 {
        ramp_weight(self.elapsed, self.duration)
    }

    fn write(&self, sink: &mut impl MorphSink, weight: f32) {
        for idx in self.indices.iter() {
            sink.set_weight(*idx, weight);
        }
    }

    /// Returns `true` once the channel is finished.
    fn advance(&mut self, dt: Duration, sink: &mut impl MorphSink) -> bool {
        let half = self.duration / 2;
        let before = self.elapsed;
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);

        // Make sure the peak is always hit, even if no tick lands on it
        if before < half && self.elapsed > half {
            self.write(sink, 1.0);
        }
        self.write(sink, self.weight());

        self.elapsed >= self.duration
    }
}

/// Weight of a 0 -> 1 -> 0 ramp of length `duration` at time `elapsed`.
pub fn ramp_weight(elapsed: Duration, duration: Duration) -> f32 {
    if elapsed.is_zero() || elapsed >= duration {
        return 0.0;
    }

    let half = duration / 2;
    let weight = if elapsed <= half {
        elapsed.as_secs_f64() / half.as_secs_f64()
    } else {
        (duration - elapsed).as_secs_f64() / (duration - half).as_secs_f64()
    };

    weight.clamp(0.0, 1.0) as f32
}

#[derive(Debug)]
struct SyllableSequence {
    syllables: Vec<String>,
    next: usize,
    interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    IdleBlink,
    Syllable(u64),
}

pub struct ShapeKeyAnimator<M: MorphSink> {
    logger: Logger,

    table: BlendShapeTable,
    sink: M,
    mapper: Box<dyn SyllableMapper>,

    blink_targets: Vec<String>,
    settings: AnimationSettings,
    rng: StdRng,

    timers: Scheduler<Task>,
    channels: Vec<Channel>,
    sequences: HashMap<u64, SyllableSequence>,
    next_sequence_id: u64,
}

impl<M: MorphSink> std::fmt::Debug for ShapeKeyAnimator<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeKeyAnimator")
            .field("now", &self.timers.now())
            .field("targets", &self.table.len())
            .field("channels", &self.channels)
            .field("sequences", &self.sequences.len())
            .finish()
    }
}

impl<M: MorphSink> ShapeKeyAnimator<M> {
    /// Create an animator and start its idle blink loop.
    pub fn new(
        table: BlendShapeTable,
        sink: M,
        mapper: impl SyllableMapper + 'static,
        blink_targets: Vec<String>,
        settings: AnimationSettings,
    ) -> Self {
        let rng = match settings.seed {
            Some(v) => StdRng::seed_from_u64(v),
            None => StdRng::from_entropy(),
        };

        let mut r = Self {
            logger: Logger::create("ShapeKeyAnimator"),

            table,
            sink,
            mapper: Box::new(mapper),

            blink_targets,
            settings,
            rng,

            timers: Scheduler::new(),
            channels: vec![],
            sequences: HashMap::new(),
            next_sequence_id: 0,
        };

        if r.settings.idle_blink {
            r.schedule_idle_blink();
        }

        r
    }

    /// Create an animator using the configured phoneme table and blink targets.
    pub fn from_config(config: &AvatarConfig, table: BlendShapeTable, sink: M) -> Self {
        Self::new(
            table,
            sink,
            PhonemeTableMapper::from_config(config),
            config.blink_targets.clone(),
            config.animation.clone(),
        )
    }

    /// Ramp a single blend shape up and back down over `duration`.
    ///
    /// Unknown names are ignored. Returns whether an animation was started.
    pub fn animate_target(&mut self, name: &str, duration: Duration) -> bool {
        self.start_named(ChannelKind::Manual, &[name], duration)
    }

    /// Ramp several blend shapes together. Unknown names are skipped.
    pub fn animate_targets<S: AsRef<str>>(&mut self, names: &[S], duration: Duration) -> bool {
        self.start_named(ChannelKind::Manual, names, duration)
    }

    /// Blink both eyes.
    pub fn blink(&mut self) -> bool {
        let targets = std::mem::take(&mut self.blink_targets);
        let started = self.start_named(
            ChannelKind::Blink,
            targets.as_slice(),
            self.settings.blink_duration(),
        );
        self.blink_targets = targets;

        started
    }

    /// Play a mouth shape for every syllable, spread evenly over `total`.
    ///
    /// The first syllable starts right away and each following one starts
    /// when the previous one ends. Sequences already playing keep playing.
    pub fn animate_syllable_sequence(&mut self, syllables: Vec<String>, total: Duration) -> bool {
        if syllables.is_empty() || total.is_zero() {
            self.logger.debug("Nothing to animate, skipping syllable sequence");
            return false;
        }

        let interval = total / u32::try_from(syllables.len()).unwrap_or(u32::MAX);

        let id = self.next_sequence_id;
        self.next_sequence_id += 1;

        self.logger.debug(format!(
            "Starting sequence {id}: {} syllables, {interval:?} each",
            syllables.len()
        ));

        self.sequences.insert(
            id,
            SyllableSequence {
                syllables,
                next: 0,
                interval,
            },
        );
        self.tick_sequence(id);

        true
    }

    /// Step all timers and channels forward by `dt`.
    pub fn update(&mut self, dt: Duration) {
        let until = self.timers.now().saturating_add(dt);

        while let Some((due, task)) = self.timers.pop_due(until) {
            self.advance_channels(due.saturating_sub(self.timers.now()));
            self.timers.advance_to(due);
            self.run(task);
        }

        self.advance_channels(until.saturating_sub(self.timers.now()));
        self.timers.advance_to(until);
    }

    /// Time since the animator was created, as seen by its timers.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Number of syllable sequences that still have syllables to start.
    pub fn active_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// Whether anything besides the idle loop is still going on.
    pub fn is_idle(&self) -> bool {
        self.sequences.is_empty()
            && self
                .channels
                .iter()
                .all(|v| v.kind == ChannelKind::Blink)
    }

    pub fn table(&self) -> &BlendShapeTable {
        &self.table
    }

    pub fn blink_targets(&self) -> &[String] {
        &self.blink_targets
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn sink(&self) -> &M {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut M {
        &mut self.sink
    }

    fn run(&mut self, task: Task) {
        match task {
            Task::IdleBlink => {
                self.blink();
                self.schedule_idle_blink();
            }
            Task::Syllable(id) => self.tick_sequence(id),
        }
    }

    fn schedule_idle_blink(&mut self) {
        let delay = random_interval(
            &mut self.rng,
            self.settings.idle_blink_min,
            self.settings.idle_blink_max,
        );
        self.timers.schedule_after(delay, Task::IdleBlink);
    }

    fn tick_sequence(&mut self, id: u64) {
        let Some(sequence) = self.sequences.get_mut(&id) else {
            return;
        };

        let Some(syllable) = sequence.syllables.get(sequence.next).cloned() else {
            self.sequences.remove(&id);
            return;
        };
        sequence.next += 1;

        let interval = sequence.interval;
        if sequence.next >= sequence.syllables.len() {
            self.sequences.remove(&id);
            self.logger.debug(format!("Sequence {id} started its last syllable"));
        } else if !self.timers.schedule_after(interval, Task::Syllable(id)) {
            self.sequences.remove(&id);
            self.logger.warn(format!("Sequence {id} runs past the end of time, dropping the rest"));
        }

        let target = self.mapper.map_to_target(&syllable);
        if !self.start_named(ChannelKind::Speech, &[target.as_str()], interval) {
            self.logger
                .debug(format!("No blend shape {target} for syllable {syllable}, skipping"));
        }
    }

    fn start_named<S: AsRef<str>>(&mut self, kind: ChannelKind, names: &[S], duration: Duration) -> bool {
        let indices = names
            .iter()
            .filter_map(|v| self.table.index_of(v.as_ref()))
            .collect::<Vec<usize>>();

        if indices.is_empty() {
            return false;
        }

        let channel = Channel {
            kind,
            indices,
            duration,
            elapsed: Duration::ZERO,
            started_at: self.timers.now(),
        };
        channel.write(&mut self.sink, 0.0);

        if !duration.is_zero() {
            self.channels.push(channel);
        }

        true
    }

    fn advance_channels(&mut self, dt: Duration) {
        if dt.is_zero() {
            return;
        }

        let sink = &mut self.sink;
        self.channels.retain_mut(|v| !v.advance(dt, sink));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every weight write.
    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<(usize, f32)>,
    }

    impl Recorder {
        fn weights_for(&self, index: usize) -> Vec<f32> {
            self.calls
                .iter()
                .filter(|(i, _)| *i == index)
                .map(|(_, w)| *w)
                .collect()
        }
    }

    impl MorphSink for Recorder {
        fn set_weight(&mut self, index: usize, weight: f32) {
            self.calls.push((index, weight));
        }
    }

    const TARGETS: [&str; 8] = [
        "vrc_v_aa",
        "vrc_v_ee",
        "vrc_v_ih",
        "vrc_v_oh",
        "vrc_v_ou",
        "vrc_v_sil",
        "vrc_blink_left",
        "vrc_blink_right",
    ];

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn quiet_settings() -> AnimationSettings {
        AnimationSettings {
            idle_blink: false,
            seed: Some(42),
            ..Default::default()
        }
    }

    fn animator(settings: AnimationSettings) -> ShapeKeyAnimator<Recorder> {
        let config = AvatarConfig {
            animation: settings,
            ..Default::default()
        };

        ShapeKeyAnimator::from_config(
            &config,
            BlendShapeTable::from_names(TARGETS),
            Recorder::default(),
        )
    }

    fn run_for(a: &mut ShapeKeyAnimator<Recorder>, total: Duration, step: Duration) {
        let mut t = Duration::ZERO;
        while t < total {
            a.update(step);
            t += step;
        }
    }

    fn assert_ramp(weights: &[f32]) {
        assert_eq!(weights.first(), Some(&0.0), "{weights:?}");
        assert_eq!(weights.last(), Some(&0.0), "{weights:?}");
        assert!(weights.iter().all(|w| (0.0..=1.0).contains(w)), "{weights:?}");

        let peak = weights
            .iter()
            .position(|w| *w == 1.0)
            .expect("ramp never reached 1.0");
        assert!(weights[..=peak].windows(2).all(|v| v[0] <= v[1]), "{weights:?}");
        assert!(weights[peak..].windows(2).all(|v| v[0] >= v[1]), "{weights:?}");
    }

    mod ramp {
        use super::*;

        #[test]
        fn shape() {
            let d = ms(100);

            assert_eq!(ramp_weight(ms(0), d), 0.0);
            assert_eq!(ramp_weight(ms(25), d), 0.5);
            assert_eq!(ramp_weight(ms(50), d), 1.0);
            assert_eq!(ramp_weight(ms(75), d), 0.5);
            assert_eq!(ramp_weight(ms(100), d), 0.0);
            assert_eq!(ramp_weight(ms(150), d), 0.0);
        }

        #[test]
        fn zero_duration() {
            assert_eq!(ramp_weight(ms(0), ms(0)), 0.0);
        }
    }

    mod single_target {
        use super::*;

        #[test]
        fn unknown_name_is_noop() {
            let mut a = animator(quiet_settings());

            assert!(!a.animate_target("vrc_v_zz", ms(100)));
            run_for(&mut a, ms(200), ms(10));

            assert!(a.sink().calls.is_empty());
            assert!(a.channels().is_empty());
        }

        #[test]
        fn ramps_up_and_down() {
            let mut a = animator(quiet_settings());

            assert!(a.animate_target("vrc_v_ee", ms(100)));
            run_for(&mut a, ms(100), ms(10));

            let weights = a.sink().weights_for(1);
            assert_ramp(&weights);
            assert!(a.channels().is_empty());
        }

        #[test]
        fn peak_is_hit_with_coarse_steps() {
            let mut a = animator(quiet_settings());

            a.animate_target("vrc_v_aa", ms(100));
            run_for(&mut a, ms(120), ms(30));

            assert_ramp(&a.sink().weights_for(0));
        }

        #[test]
        fn single_big_step() {
            let mut a = animator(quiet_settings());

            a.animate_target("vrc_v_aa", ms(100));
            a.update(ms(500));

            assert_eq!(a.sink().weights_for(0), vec![0.0, 1.0, 0.0]);
        }

        #[test]
        fn only_touches_its_target() {
            let mut a = animator(quiet_settings());

            a.animate_target("vrc_v_oh", ms(50));
            run_for(&mut a, ms(100), ms(5));

            assert!(a.sink().calls.iter().all(|(i, _)| *i == 3));
        }
    }

    mod multiple_targets {
        use super::*;

        #[test]
        fn driven_together() {
            let mut a = animator(quiet_settings());

            assert!(a.animate_targets(&["vrc_blink_left", "vrc_blink_right"], ms(100)));
            run_for(&mut a, ms(100), ms(10));

            assert_eq!(a.sink().weights_for(6), a.sink().weights_for(7));
            assert_ramp(&a.sink().weights_for(6));
        }

        #[test]
        fn unknown_names_skipped() {
            let mut a = animator(quiet_settings());

            assert!(a.animate_targets(&["nope", "vrc_blink_right"], ms(100)));
            assert_eq!(a.channels()[0].indices(), &[7]);
        }

        #[test]
        fn all_unknown() {
            let mut a = animator(quiet_settings());

            assert!(!a.animate_targets(&["nope", "also_nope"], ms(100)));
            assert!(a.sink().calls.is_empty());
        }

        #[test]
        fn blink_uses_blink_targets() {
            let mut a = animator(quiet_settings());

            assert!(a.blink());
            assert_eq!(a.channels()[0].kind(), ChannelKind::Blink);
            assert_eq!(a.channels()[0].indices(), &[6, 7]);
            assert_eq!(a.channels()[0].duration(), a.settings().blink_duration());
            assert_eq!(a.blink_targets().len(), 2);
        }
    }

    mod sequences {
        use super::*;

        fn syllables(v: &[&str]) -> Vec<String> {
            v.iter().map(|v| v.to_string()).collect()
        }

        #[test]
        fn empty_is_noop() {
            let mut a = animator(quiet_settings());

            assert!(!a.animate_syllable_sequence(vec![], ms(1000)));
            assert!(!a.animate_syllable_sequence(syllables(&["ba"]), Duration::ZERO));
            assert_eq!(a.active_sequences(), 0);
            assert!(a.sink().calls.is_empty());
        }

        #[test]
        fn sequential_schedule() {
            let mut a = animator(quiet_settings());

            assert!(a.animate_syllable_sequence(syllables(&["ba", "be", "bo"]), ms(300)));

            let mut started = vec![];
            for _ in 0..40 {
                for c in a.channels() {
                    if !started.contains(&(c.started_at(), c.indices()[0])) {
                        started.push((c.started_at(), c.indices()[0]));
                    }
                }
                a.update(ms(10));
            }

            assert_eq!(started, vec![(ms(0), 0), (ms(100), 1), (ms(200), 3)]);
            assert_eq!(a.active_sequences(), 0);
            assert!(a.channels().is_empty());
            assert!(a.is_idle());
        }

        #[test]
        fn each_syllable_ramps() {
            let mut a = animator(quiet_settings());

            a.animate_syllable_sequence(syllables(&["ba", "be"]), ms(200));
            run_for(&mut a, ms(250), ms(10));

            assert_ramp(&a.sink().weights_for(0));
            assert_ramp(&a.sink().weights_for(1));
        }

        #[test]
        fn unmapped_target_is_skipped() {
            // "k" maps to vrc_v_sil, "th" maps to vrc_v_th which the mesh lacks
            let mut a = animator(quiet_settings());

            a.animate_syllable_sequence(syllables(&["th", "k"]), ms(200));
            run_for(&mut a, ms(250), ms(10));

            assert!(a.sink().weights_for(5).len() > 2);
            assert!(a.sink().calls.iter().all(|(i, _)| *i == 5));
        }

        #[test]
        fn overlapping_sequences_both_play() {
            let mut a = animator(quiet_settings());

            a.animate_syllable_sequence(syllables(&["ba", "ba"]), ms(200));
            a.update(ms(50));
            a.animate_syllable_sequence(syllables(&["bi", "bi"]), ms(200));

            assert_eq!(a.active_sequences(), 2);
            assert_eq!(a.channels().len(), 2);

            run_for(&mut a, ms(300), ms(10));

            let weights = a.sink().weights_for(2);
            assert_eq!(weights.iter().filter(|v| **v == 1.0).count(), 2, "{weights:?}");
            assert_eq!(weights.last(), Some(&0.0));
            assert!(a.is_idle());
        }

        #[test]
        fn durations_sum_to_total() {
            let mut a = animator(quiet_settings());
            let total = Duration::from_secs_f64(1.44);

            a.animate_syllable_sequence(syllables(&["a", "e", "i", "o", "u", "a", "e"]), total);

            let mut seen = vec![];
            for _ in 0..200 {
                for c in a.channels() {
                    if !seen.iter().any(|(t, _)| *t == c.started_at()) {
                        seen.push((c.started_at(), c.duration()));
                    }
                }
                a.update(ms(10));
            }

            assert_eq!(seen.len(), 7);
            let sum = seen.iter().map(|(_, d)| *d).sum::<Duration>();
            assert!(sum.abs_diff(total) < ms(1), "{sum:?}");
        }
    }

    mod idle {
        use super::*;

        #[test]
        fn blinks_within_range() {
            let settings = AnimationSettings {
                idle_blink: true,
                idle_blink_min: 0.5,
                idle_blink_max: 1.5,
                seed: Some(7),
                ..Default::default()
            };
            let (min, max) = (
                Duration::from_secs_f32(settings.idle_blink_min),
                Duration::from_secs_f32(settings.idle_blink_max),
            );
            let mut a = animator(settings);

            let mut blinks = vec![];
            for _ in 0..3000 {
                a.update(ms(10));
                for c in a.channels().iter().filter(|c| c.kind() == ChannelKind::Blink) {
                    if blinks.last() != Some(&c.started_at()) {
                        blinks.push(c.started_at());
                    }
                }
            }

            assert!(blinks.len() >= 10, "{blinks:?}");
            assert!(blinks[0] >= min && blinks[0] <= max);
            for pair in blinks.windows(2) {
                let interval = pair[1] - pair[0];
                assert!(interval >= min && interval <= max, "{interval:?}");
            }
        }

        #[test]
        fn blink_writes_blink_targets_only() {
            let settings = AnimationSettings {
                idle_blink_min: 0.2,
                idle_blink_max: 0.2,
                seed: Some(1),
                ..Default::default()
            };
            let mut a = animator(settings);

            // One blink at 200ms, the next one is due at 400ms
            run_for(&mut a, ms(350), ms(10));

            assert!(!a.sink().calls.is_empty());
            assert!(a.sink().calls.iter().all(|(i, _)| *i == 6 || *i == 7));
            assert_ramp(&a.sink().weights_for(6));
        }

        #[test]
        fn zero_interval_still_terminates() {
            let settings = AnimationSettings {
                idle_blink_min: 0.0,
                idle_blink_max: 0.0,
                seed: Some(2),
                ..Default::default()
            };
            let mut a = animator(settings);

            a.update(ms(10));

            // One blink per millisecond at most
            let blinks = a.channels().iter().filter(|c| c.kind() == ChannelKind::Blink).count();
            assert!(blinks > 0 && blinks <= 10, "{blinks}");
            assert_eq!(a.now(), ms(10));
        }

        #[test]
        fn huge_durations_do_not_panic() {
            let settings = AnimationSettings {
                idle_blink_min: 1e30,
                idle_blink_max: 1e30,
                blink_duration: 1e30,
                seed: Some(2),
                ..Default::default()
            };
            let mut a = animator(settings);

            assert!(a.blink());
            a.animate_syllable_sequence(vec!["ba".to_string(), "be".to_string()], Duration::MAX);
            a.update(ms(10));
            a.update(Duration::MAX);

            assert!(!a.channels().is_empty());
        }

        #[test]
        fn disabled() {
            let mut a = animator(quiet_settings());

            run_for(&mut a, Duration::from_secs(10), ms(100));

            assert!(a.sink().calls.is_empty());
        }

        #[test]
        fn runs_alongside_speech() {
            let settings = AnimationSettings {
                idle_blink_min: 0.05,
                idle_blink_max: 0.05,
                seed: Some(3),
                ..Default::default()
            };
            let mut a = animator(settings);

            a.animate_syllable_sequence(vec!["ba".to_string()], ms(200));
            run_for(&mut a, ms(100), ms(10));

            let kinds = a.channels().iter().map(|c| c.kind()).collect::<Vec<_>>();
            assert!(kinds.contains(&ChannelKind::Speech));
            assert!(kinds.contains(&ChannelKind::Blink));
            assert!(!a.is_idle());
        }
    }
}
