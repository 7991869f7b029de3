/*!
Commands sent to the avatar.

Anything that wants the avatar to do something (a UI, a CLI, the speech
orchestrator reacting to "yes" and "no") holds a [CommandPublisher]. The
avatar owns the [CommandBus] and drains it once per update.
*/

use std::{
    fmt::Display,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
};

use crate::syllables::Gesture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    BlinkLeft,
    BlinkRight,
    /// Animate a single blend shape by name.
    ChangeShapeKey(String),
    MoveHeadLeft,
    MoveHeadRight,
    Nod,
    Shake,
    /// Speak the text and animate the mouth.
    ReadText(String),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BlinkLeft => "blink-left",
            Self::BlinkRight => "blink-right",
            Self::ChangeShapeKey(_) => "change-shape-key",
            Self::MoveHeadLeft => "move-head-left",
            Self::MoveHeadRight => "move-head-right",
            Self::Nod => "nod",
            Self::Shake => "shake",
            Self::ReadText(_) => "read-text",
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChangeShapeKey(v) | Self::ReadText(v) => write!(f, "{} {v:?}", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

impl From<Gesture> for Command {
    fn from(value: Gesture) -> Self {
        match value {
            Gesture::Affirmative => Self::Nod,
            Gesture::Negative => Self::Shake,
        }
    }
}

/// Sending half of a [CommandBus]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    sender: Sender<Command>,
}

impl CommandPublisher {
    /// Publish a command. Returns `false` if the bus no longer exists.
    pub fn publish(&self, command: Command) -> bool {
        self.sender.send(command).is_ok()
    }
}

#[derive(Debug)]
pub struct CommandBus {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();

        Self { sender, receiver }
    }

    pub fn publisher(&self) -> CommandPublisher {
        CommandPublisher {
            sender: self.sender.clone(),
        }
    }

    /// Take every command published so far, oldest first.
    pub fn drain(&self) -> Vec<Command> {
        let mut r = vec![];

        loop {
            match self.receiver.try_recv() {
                Ok(v) => r.push(v),
                // The bus holds a sender itself, so it can never disconnect
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        r
    }
}
