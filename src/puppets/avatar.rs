use std::{fmt::Display, time::Duration};

use crate::{
    events::{Command, CommandBus, CommandPublisher},
    model::{AvatarConfig, BlendShapeTable, ConfigError, NodeRegistry},
    speech::{SpeechPlan, SpeechSynthesizer, TextToSpeech},
    Logger,
};

use super::{
    head::{Direction, HeadAnimator},
    shape_key_animator::ShapeKeyAnimator,
    HeadSink, MorphSink,
};

#[derive(Debug)]
pub enum AvatarError {
    InvalidConfig(ConfigError),
    NoMorphTargets { node: String },
}

impl Display for AvatarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(e) => write!(f, "{e}"),
            Self::NoMorphTargets { node } => {
                write!(f, "No node with morph targets found, expected {node}")
            }
        }
    }
}

impl std::error::Error for AvatarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(e) => Some(e),
            Self::NoMorphTargets { .. } => None,
        }
    }
}

/// A loaded avatar. Owns every animated part and the bus commands arrive on.
#[derive(Debug)]
pub struct Avatar<M: MorphSink, H: HeadSink, S: SpeechSynthesizer> {
    logger: Logger,

    config: AvatarConfig,
    morph_node: String,

    animator: ShapeKeyAnimator<M>,
    head: HeadAnimator<H>,
    speech: TextToSpeech<S>,

    bus: CommandBus,
}

impl<M: MorphSink, H: HeadSink, S: SpeechSynthesizer> Avatar<M, H, S> {
    pub fn new(
        config: AvatarConfig,
        registry: &NodeRegistry,
        morph_sink: M,
        head_sink: H,
        synthesizer: S,
    ) -> Result<Self, AvatarError> {
        let logger = Logger::create("Avatar");

        config.validate().map_err(AvatarError::InvalidConfig)?;

        let node = registry
            .find_morph_node(&config.node_name_mesh)
            .ok_or_else(|| AvatarError::NoMorphTargets {
                node: config.node_name_mesh.clone(),
            })?;
        if node.name != config.node_name_mesh {
            logger.warn(format!(
                "Node {} has no morph targets, using {} instead",
                config.node_name_mesh, node.name
            ));
        }

        let table = BlendShapeTable::from_names(node.morph_targets.iter().cloned());
        logger.info(format!("Found {} blend shapes on {}", table.len(), node.name));

        for name in config.phoneme_mappings.values().chain(config.blink_targets.iter()) {
            if !table.contains(name) {
                logger.debug(format!("Blend shape {name} is not on the mesh"));
            }
        }

        let head = if registry.find(&config.node_name_head).is_some() {
            HeadAnimator::new(
                head_sink,
                config.head.clone(),
                config.animation.seed.map(|v| v.wrapping_add(1)),
            )
        } else {
            logger.warn(format!(
                "Head node {} not found, head motion disabled",
                config.node_name_head
            ));
            HeadAnimator::disabled(head_sink, config.head.clone())
        };

        let bus = CommandBus::new();
        let speech = TextToSpeech::new(synthesizer, config.speech.clone()).with_gestures(bus.publisher());
        let animator = ShapeKeyAnimator::from_config(&config, table, morph_sink);

        Ok(Self {
            logger,

            morph_node: node.name.clone(),
            config,

            animator,
            head,
            speech,

            bus,
        })
    }

    /// A handle for sending commands to this avatar.
    pub fn publisher(&self) -> CommandPublisher {
        self.bus.publisher()
    }

    /// Run a command right away.
    pub fn handle(&mut self, command: Command) {
        self.logger.debug(format!("Handling {command}"));

        let duration = self.config.animation.shape_key_duration();
        match command {
            Command::BlinkLeft => self.blink_one(0, duration),
            Command::BlinkRight => self.blink_one(1, duration),
            Command::ChangeShapeKey(name) => {
                if !self.animator.animate_target(&name, duration) {
                    self.logger.warn(format!("Unknown blend shape {name}"));
                }
            }
            Command::MoveHeadLeft => self.head.turn(Direction::Left),
            Command::MoveHeadRight => self.head.turn(Direction::Right),
            Command::Nod => self.head.nod(),
            Command::Shake => self.head.shake(),
            Command::ReadText(text) => {
                self.speak(&text);
            }
        }
    }

    /// Speak `text` and animate the mouth along with it.
    pub fn speak(&mut self, text: &str) -> SpeechPlan {
        self.speech.speak(text, &mut self.animator)
    }

    /// Handle pending commands, then step every part by `dt`.
    pub fn update(&mut self, dt: Duration) {
        // Commands published while handling (gestures from speech) run next update
        for command in self.bus.drain() {
            self.handle(command);
        }

        self.animator.update(dt);
        self.head.update(dt);
        self.speech.update(dt);
    }

    pub fn config(&self) -> &AvatarConfig {
        &self.config
    }

    /// Name of the node whose morph targets are driven.
    pub fn morph_node(&self) -> &str {
        &self.morph_node
    }

    pub fn animator(&self) -> &ShapeKeyAnimator<M> {
        &self.animator
    }

    pub fn head(&self) -> &HeadAnimator<H> {
        &self.head
    }

    pub fn speech(&self) -> &TextToSpeech<S> {
        &self.speech
    }

    fn blink_one(&mut self, index: usize, duration: Duration) {
        match self.animator.blink_targets().get(index).cloned() {
            Some(target) => {
                self.animator.animate_target(&target, duration);
            }
            None => self.logger.warn(format!("No blink target {index} configured")),
        }
    }
}
