mod cli;

use std::{process::ExitCode, time::Duration};

use cli::{Args, CliError, Commands};
use libvpuppr_speech::{
    events::Command,
    init_logging,
    mappers::{PhonemeTableMapper, SyllableMapper},
    metadata,
    model::{AvatarConfig, NodeRegistry, SceneNode},
    puppets::{avatar::Avatar, HeadPose, MorphWeights},
    speech::{estimate_duration, word_count, LoggingSynthesizer},
    syllables::text_to_syllables,
    Logger,
};

/// Blend shapes of the bundled demo avatar, in morph target order.
const DEFAULT_MORPH_TARGETS: [&str; 19] = [
    "vrc_v_th",
    "vrc_v_ss",
    "vrc_v_sil",
    "vrc_v_rr",
    "vrc_v_pp",
    "vrc_v_ou",
    "vrc_v_oh",
    "vrc_v_nn",
    "vrc_v_kk",
    "vrc_v_ih",
    "vrc_v_ff",
    "vrc_v_ee",
    "vrc_v_dd",
    "vrc_v_ch",
    "vrc_v_aa",
    "vrc_lowerlid_right",
    "vrc_lowerlid_left",
    "vrc_blink_right",
    "vrc_blink_left",
];

/// Caps the number of simulated frames.
const MAX_SIMULATION: Duration = Duration::from_secs(600);

type DemoAvatar = Avatar<MorphWeights, HeadPose, LoggingSynthesizer>;

fn main() -> ExitCode {
    let raw = std::env::args().skip(1).collect::<Vec<String>>();
    let raw = raw.iter().map(String::as_str).collect::<Vec<&str>>();

    let args = match Args::parse(&raw) {
        Ok(v) => v,
        Err(CliError::ParseFailure(e)) => {
            return match e.status {
                Ok(_) => {
                    println!("{}", e.output);
                    ExitCode::SUCCESS
                }
                Err(_) => {
                    eprintln!("{}", e.output);
                    ExitCode::FAILURE
                }
            };
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(args.verbose, args.quiet);
    let logger = Logger::create("vpuppr-speech");

    for (k, v) in metadata() {
        logger.debug(format!("{k}: {v}"));
    }

    let Some(command) = args.commands else {
        logger.error("No command given, see --help");
        return ExitCode::FAILURE;
    };

    match run(command, &logger) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            logger.error(e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, logger: &Logger) -> Result<(), CliError> {
    match command {
        Commands::Syllables(c) => {
            let config = load_config(c.config.as_deref())?;
            let mapper = PhonemeTableMapper::from_config(&config);
            let text = c.text();

            for syllable in text_to_syllables(&text) {
                println!("{syllable}\t{}", mapper.map_to_target(&syllable));
            }
            println!(
                "# {} words, {:.2}s",
                word_count(&text),
                estimate_duration(&text, config.speech.words_per_minute).as_secs_f32()
            );
        }
        Commands::Speak(c) => {
            let frame = frame_duration(c.fps)?;
            let mut avatar = load_avatar(c.config.as_deref(), c.scene.as_deref(), logger)?;

            avatar.publisher().publish(Command::ReadText(c.text()));
            simulate(&mut avatar, frame, c.trace, logger);

            logger.info(format!(
                "Spoke {} utterance(s)",
                avatar.speech().synthesizer().spoken().len()
            ));
        }
        Commands::Gesture(c) => {
            let frame = frame_duration(c.fps)?;
            let mut avatar = load_avatar(c.config.as_deref(), c.scene.as_deref(), logger)?;

            let publisher = avatar.publisher();
            for action in c.actions.iter() {
                logger.info(format!("Playing {}", action.as_ref()));
                publisher.publish(Command::from(action));
            }
            simulate(&mut avatar, frame, c.trace, logger);
        }
    }

    Ok(())
}

fn frame_duration(fps: u32) -> Result<Duration, CliError> {
    if fps == 0 {
        return Err(CliError::InvalidFps);
    }

    Ok(Duration::from_secs(1) / fps)
}

fn load_config(path: Option<&str>) -> Result<AvatarConfig, CliError> {
    Ok(match path {
        Some(v) => AvatarConfig::from_path(v)?,
        None => AvatarConfig::default(),
    })
}

fn load_scene(path: Option<&str>, config: &AvatarConfig) -> Result<NodeRegistry, CliError> {
    let Some(path) = path else {
        return Ok([
            SceneNode::new(&config.node_name_root),
            SceneNode::new(&config.node_name_mesh).with_morph_targets(DEFAULT_MORPH_TARGETS),
            SceneNode::new(&config.node_name_head),
            SceneNode::new(&config.node_name_camera),
        ]
        .into_iter()
        .collect());
    };

    let data = std::fs::read_to_string(path).map_err(|e| CliError::Scene {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    serde_json::from_str::<NodeRegistry>(&data).map_err(|e| CliError::Scene {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn load_avatar(
    config: Option<&str>,
    scene: Option<&str>,
    logger: &Logger,
) -> Result<DemoAvatar, CliError> {
    let config = load_config(config)?;
    let registry = load_scene(scene, &config)?;

    let transform = config.initial_transform();
    logger.debug(format!(
        "Placing {} at {} rotated {} scaled {} with texture {}",
        config.node_name_root,
        transform.position,
        transform.euler_angles,
        transform.scale,
        config.texture_name
    ));

    let count = registry
        .find_morph_node(&config.node_name_mesh)
        .map(|v| v.morph_targets.len())
        .unwrap_or_default();

    Ok(Avatar::new(
        config,
        &registry,
        MorphWeights::new(count),
        HeadPose::default(),
        LoggingSynthesizer::default(),
    )?)
}

/// Step the avatar one frame at a time until nothing but idle motion is left.
fn simulate(avatar: &mut DemoAvatar, frame: Duration, trace: bool, logger: &Logger) {
    let mut elapsed = Duration::ZERO;

    // The first update always runs so queued commands get picked up
    loop {
        avatar.update(frame);
        elapsed += frame;

        if trace {
            print_frame(avatar, elapsed);
        }

        let done = avatar.animator().is_idle()
            && avatar.speech().pending() == 0
            && !avatar.head().is_gesturing();
        if done {
            break;
        }
        if elapsed >= MAX_SIMULATION {
            logger.warn("Simulation limit reached, stopping");
            break;
        }
    }

    logger.info(format!("Simulated {:.2}s", elapsed.as_secs_f32()));
}

fn print_frame(avatar: &DemoAvatar, elapsed: Duration) {
    let table = avatar.animator().table();
    let weights = avatar
        .animator()
        .sink()
        .as_slice()
        .iter()
        .enumerate()
        .filter(|(_, w)| **w > 0.0)
        .filter_map(|(i, w)| table.names().get(i).map(|name| format!("{name}={w:.2}")))
        .collect::<Vec<String>>();
    let (pitch, yaw) = avatar.head().rotation();

    println!(
        "{:>8.3}s pitch={:+.1} yaw={:+.1} {}",
        elapsed.as_secs_f32(),
        pitch.to_degrees(),
        yaw.to_degrees(),
        weights.join(" ")
    );
}
