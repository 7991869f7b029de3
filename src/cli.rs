use std::{fmt::Display, str::FromStr};

use argh::FromArgs;
use libvpuppr_speech::{
    events::Command,
    model::ConfigError,
    puppets::avatar::AvatarError,
};

const SHAPE_KEY_PREFIX: &str = "shape:";

#[derive(Debug)]
pub enum CliError {
    ParseFailure(argh::EarlyExit),
    UnknownAction { input: String },
    InvalidFps,
    Config(ConfigError),
    Scene { path: String, reason: String },
    Avatar(AvatarError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailure(e) => write!(f, "{e:?}"),
            Self::UnknownAction { input } => write!(f, "Unknown action: {input}"),
            Self::InvalidFps => write!(f, "Frames per second must be greater than 0"),
            Self::Config(e) => write!(f, "{e}"),
            Self::Scene { path, reason } => write!(f, "Unable to load scene {path}: {reason}"),
            Self::Avatar(e) => write!(f, "{e}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<AvatarError> for CliError {
    fn from(value: AvatarError) -> Self {
        Self::Avatar(value)
    }
}

/// vpuppr speech animation command line interface
#[derive(Debug, FromArgs)]
pub struct Args {
    /// enable verbose logging, overridden by "quiet" if passed
    #[argh(switch, short = 'v', long = "verbose")]
    pub verbose: bool,
    /// disable all logging, overrides verbose
    #[argh(switch, short = 'q', long = "quiet")]
    pub quiet: bool,
    #[argh(subcommand)]
    pub commands: Option<Commands>,
}

impl Args {
    /// Parse some `args`, not including the program name.
    pub fn parse(args: &[&str]) -> Result<Self, CliError> {
        Self::from_args(&[env!("CARGO_BIN_NAME")], args).map_err(CliError::ParseFailure)
    }
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
pub enum Commands {
    Syllables(SyllablesCommand),
    Speak(SpeakCommand),
    Gesture(GestureCommand),
}

/// Print the syllables and mouth shapes for some text
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "syllables")]
pub struct SyllablesCommand {
    /// text to split
    #[argh(positional)]
    pub text: Vec<String>,
    /// path to an avatar config
    #[argh(option)]
    pub config: Option<String>,
}

impl SyllablesCommand {
    pub fn text(&self) -> String {
        self.text.join(" ")
    }
}

/// Speak some text and simulate the avatar until it is done
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "speak")]
pub struct SpeakCommand {
    /// text to speak
    #[argh(positional)]
    pub text: Vec<String>,
    /// path to an avatar config
    #[argh(option)]
    pub config: Option<String>,
    /// path to a scene description listing nodes and their morph targets
    #[argh(option)]
    pub scene: Option<String>,
    /// simulated frames per second
    #[argh(option, default = "60")]
    pub fps: u32,
    /// print blend shape weights and head rotation every frame
    #[argh(switch)]
    pub trace: bool,
}

impl SpeakCommand {
    pub fn text(&self) -> String {
        self.text.join(" ")
    }
}

/// Play one or more actions on the avatar
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "gesture")]
pub struct GestureCommand {
    /// actions to play, all started at once
    #[argh(positional)]
    pub actions: Vec<Action>,
    /// path to an avatar config
    #[argh(option)]
    pub config: Option<String>,
    /// path to a scene description listing nodes and their morph targets
    #[argh(option)]
    pub scene: Option<String>,
    /// simulated frames per second
    #[argh(option, default = "60")]
    pub fps: u32,
    /// print blend shape weights and head rotation every frame
    #[argh(switch)]
    pub trace: bool,
}

#[derive(Debug, PartialEq)]
pub enum Action {
    BlinkLeft,
    BlinkRight,
    HeadLeft,
    HeadRight,
    Nod,
    Shake,
    ShapeKey(String),
}

impl FromStr for Action {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blink-left" | "bl" => Ok(Self::BlinkLeft),
            "blink-right" | "br" => Ok(Self::BlinkRight),
            "head-left" | "left" => Ok(Self::HeadLeft),
            "head-right" | "right" => Ok(Self::HeadRight),
            "nod" | "yes" => Ok(Self::Nod),
            "shake" | "no" => Ok(Self::Shake),
            _ => {
                if let Some(v) = s.strip_prefix(SHAPE_KEY_PREFIX) {
                    if !v.is_empty() {
                        return Ok(Self::ShapeKey(v.to_string()));
                    }
                }

                Err(CliError::UnknownAction {
                    input: s.to_string(),
                })
            }
        }
    }
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        match self {
            Action::BlinkLeft => "blink-left",
            Action::BlinkRight => "blink-right",
            Action::HeadLeft => "head-left",
            Action::HeadRight => "head-right",
            Action::Nod => "nod",
            Action::Shake => "shake",
            Action::ShapeKey(v) => v.as_str(),
        }
    }
}

impl From<&Action> for Command {
    fn from(value: &Action) -> Self {
        match value {
            Action::BlinkLeft => Command::BlinkLeft,
            Action::BlinkRight => Command::BlinkRight,
            Action::HeadLeft => Command::MoveHeadLeft,
            Action::HeadRight => Command::MoveHeadRight,
            Action::Nod => Command::Nod,
            Action::Shake => Command::Shake,
            Action::ShapeKey(v) => Command::ChangeShapeKey(v.clone()),
        }
    }
}
