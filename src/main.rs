//! voxplay main entry point
//!
//! The event loop waits on two sources:
//! 1. stdin (interactive commands)
//! 2. a waker triggered whenever the speech engine reports an event
//!
//! A poll timeout doubles as a tick so engines without callbacks can be polled.

use log::{debug, error, info};
use mio::{Events, Interest, Poll, Token, Waker};
use std::io;
use std::os::unix::io::AsRawFd;
use std::process;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;
use voxplay::catalog::CatalogView;
use voxplay::engine::{create_engine, EngineEvent, EventSender};
use voxplay::input::{
    drain_fd, parse_command, Command, LineBuffer, ReadStatus, HELP,
};
use voxplay::playback::config::Config;
use voxplay::playback::{
    check_rate, check_volume, PlaybackController, PlaybackSettings, ToggleOutcome,
};
use voxplay::ui::{render_catalog, TerminalView};
use voxplay::{Result, VoxError};

/// Token for stdin in mio poll
const STDIN: Token = Token(0);
/// Token for engine events in mio poll
const WAKER: Token = Token(1);

/// How long the loop sleeps before giving the engine a tick
const TICK_INTERVAL: Duration = Duration::from_millis(250);

const USAGE: &str = "\
Usage: voxplay [OPTIONS] [TEXT]

Speaks TEXT and exits, or starts an interactive session when no text is given.

Options:
  -d, --debug          write debug logs to voxplay.log
      --list-voices    print the voices grouped by language and exit
      --json           with --list-voices, print JSON
      --say TEXT       speak TEXT and exit
      --rate WPM       speech rate in words per minute
      --volume V       volume between 0.0 and 1.0
      --voice NAME     voice to use
  -h, --help           show this help";

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Options {
    debug: bool,
    help: bool,
    list_voices: bool,
    json: bool,
    say: Option<String>,
    rate: Option<f32>,
    volume: Option<f32>,
    voice: Option<String>,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self> {
        let mut options = Options::default();
        let mut words = Vec::new();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-d" | "--debug" => options.debug = true,
                "-h" | "--help" => options.help = true,
                "--list-voices" => options.list_voices = true,
                "--json" => options.json = true,
                "--say" => options.say = Some(value(&mut iter, arg)?),
                "--voice" => options.voice = Some(value(&mut iter, arg)?),
                "--rate" => options.rate = Some(check_rate(number(&mut iter, arg)?)?),
                "--volume" => options.volume = Some(check_volume(number(&mut iter, arg)?)?),
                other if other.starts_with('-') && other.len() > 1 => {
                    return Err(VoxError::Command(format!("unknown option '{}'", other)));
                }
                word => words.push(word.to_string()),
            }
        }

        if !words.is_empty() {
            if options.say.is_some() {
                return Err(VoxError::Command(
                    "give the text either with --say or as arguments, not both".to_string(),
                ));
            }
            options.say = Some(words.join(" "));
        }

        Ok(options)
    }

    /// Apply command line overrides on top of the configured settings
    fn apply(&self, settings: &mut PlaybackSettings) {
        if let Some(rate) = self.rate {
            settings.rate = rate;
        }
        if let Some(volume) = self.volume {
            settings.volume = volume;
        }
        if let Some(voice) = &self.voice {
            settings.voice = Some(voice.clone());
        }
    }
}

fn value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| VoxError::Command(format!("'{}' needs a value", flag)))
}

fn number<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<f32> {
    let raw = value(iter, flag)?;
    raw.parse()
        .map_err(|_| VoxError::Command(format!("'{}' expects a number, got '{}'", flag, raw)))
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match Options::parse(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    if options.help {
        println!("{}", USAGE);
        return;
    }

    init_logging(options.debug);

    if let Err(e) = run(options) {
        error!("Fatal error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(debug_mode: bool) {
    if debug_mode {
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("voxplay.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open voxplay.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "voxplay version {} starting (debug mode, logging to voxplay.log)",
            voxplay::VERSION
        );
    } else {
        // Normal mode: only errors, unless RUST_LOG says otherwise
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Error)
            .parse_default_env()
            .init();
    }
}

fn run(options: Options) -> Result<()> {
    if options.list_voices {
        return list_voices(options.json);
    }

    let mut config = Config::load()?;
    info!("Configuration loaded from {:?}", config.path());
    let mut settings = config.settings();
    options.apply(&mut settings);

    let mut poll = Poll::new()?;
    let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);
    let (events, rx) = EventSender::channel();
    let events = events.with_waker(waker);

    let mut controller = PlaybackController::new(
        create_engine(),
        Box::new(TerminalView::stdout()),
        events,
        settings,
    );
    controller.initialize()?;

    match options.say {
        Some(text) => speak_once(&mut poll, &rx, &mut controller, &text),
        None => interactive(&mut poll, &rx, &mut controller, &mut config),
    }
}

/// Print the grouped catalog without starting a controller
fn list_voices(json: bool) -> Result<()> {
    let engine = create_engine();
    if !engine.is_supported() {
        return Err(VoxError::Unsupported);
    }

    let voices = engine.list_voices()?;
    let view = CatalogView::build(&voices);
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render_catalog(&view, None));
    }
    Ok(())
}

/// Speak one text and return once the engine is done with it
fn speak_once(
    poll: &mut Poll,
    rx: &Receiver<EngineEvent>,
    controller: &mut PlaybackController,
    text: &str,
) -> Result<()> {
    match controller.toggle(text)? {
        ToggleOutcome::Submitted(id) => debug!("Waiting for utterance {}", id),
        ToggleOutcome::Rejected(err) => return Err(err.into()),
        ToggleOutcome::EngineFailed => {
            return Err(VoxError::Engine("the engine refused the utterance".to_string()))
        }
        ToggleOutcome::Cancelled => return Ok(()),
    }

    wait_until_idle(poll, rx, controller)
}

/// Keep handling engine events until no utterance is active
fn wait_until_idle(
    poll: &mut Poll,
    rx: &Receiver<EngineEvent>,
    controller: &mut PlaybackController,
) -> Result<()> {
    let mut ready = Events::with_capacity(8);
    drain_events(rx, controller);
    while controller.state().is_active() {
        if let Err(e) = poll.poll(&mut ready, Some(TICK_INTERVAL)) {
            if e.kind() != io::ErrorKind::Interrupted {
                return Err(e.into());
            }
        }
        drain_events(rx, controller);
        controller.tick();
    }
    Ok(())
}

/// Interactive session reading commands from stdin
fn interactive(
    poll: &mut Poll,
    rx: &Receiver<EngineEvent>,
    controller: &mut PlaybackController,
    config: &mut Config,
) -> Result<()> {
    let stdin_fd = io::stdin().as_raw_fd();
    let mut stdin_source = mio::unix::SourceFd(&stdin_fd);
    poll.registry()
        .register(&mut stdin_source, STDIN, Interest::READABLE)
        .map_err(|e| {
            VoxError::Io(io::Error::new(
                e.kind(),
                format!("stdin must be a terminal or a pipe: {}", e),
            ))
        })?;

    println!("voxplay {} ready. Type 'help' for commands.", voxplay::VERSION);

    let mut session = Session::default();
    let mut lines = LineBuffer::new();
    let mut ready = Events::with_capacity(32);

    'outer: loop {
        if let Err(e) = poll.poll(&mut ready, Some(TICK_INTERVAL)) {
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(e.into());
        }

        for event in ready.iter() {
            if event.token() != STDIN {
                continue;
            }

            let status = drain_fd(stdin_fd, &mut lines)?;
            for line in lines.take_lines() {
                if session.handle_line(&line, controller, config) == Flow::Quit {
                    break 'outer;
                }
            }

            if status == ReadStatus::Closed {
                // EOF: run whatever was typed without a trailing newline and
                // let it finish playing before leaving
                if let Some(line) = lines.flush() {
                    if session.handle_line(&line, controller, config) == Flow::Quit {
                        break 'outer;
                    }
                }
                info!("stdin closed");
                poll.registry().deregister(&mut stdin_source)?;
                wait_until_idle(poll, rx, controller)?;
                break 'outer;
            }
        }

        drain_events(rx, controller);
        controller.tick();
    }

    controller.shutdown();
    Ok(())
}

fn drain_events(rx: &Receiver<EngineEvent>, controller: &mut PlaybackController) {
    for event in rx.try_iter() {
        controller.handle_event(event);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// The "text box" of the interactive session
#[derive(Default)]
struct Session {
    text: String,
}

impl Session {
    fn handle_line(
        &mut self,
        line: &str,
        controller: &mut PlaybackController,
        config: &mut Config,
    ) -> Flow {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                println!("{}", e);
                return Flow::Continue;
            }
        };

        match self.execute(command, controller, config) {
            Ok(flow) => flow,
            Err(e) => {
                println!("{}", e);
                Flow::Continue
            }
        }
    }

    fn execute(
        &mut self,
        command: Command,
        controller: &mut PlaybackController,
        config: &mut Config,
    ) -> Result<Flow> {
        match command {
            Command::Play(text) => {
                if let Some(text) = text {
                    self.text = text;
                }
                controller.toggle(&self.text)?;
            }
            Command::Stop => {
                if !controller.stop()? {
                    println!("Nothing is playing");
                }
            }
            Command::Text(text) => {
                self.text = text;
                println!("Text: {}", self.text);
            }
            Command::Voices => controller.present_catalog(),
            Command::Voice(name) => {
                controller.select_voice(&name)?;
                println!("Voice: {}", name);
            }
            Command::Rate(wpm) => {
                controller.set_rate(wpm)?;
                println!("Rate: {} wpm", wpm);
            }
            Command::Volume(volume) => {
                controller.set_volume(volume)?;
                println!("Volume: {}", volume);
            }
            Command::Status => {
                let state = controller.state();
                println!("Text: {}", self.text);
                println!("Voice: {}", state.selected_voice().unwrap_or("(engine default)"));
                println!("Rate: {} wpm", state.rate());
                println!("Volume: {}", state.volume());
                println!("Voices: {}", controller.catalog().len());
                println!("Button: {}", controller.button_label());
            }
            Command::Save => {
                config.store(controller.state());
                config.save()?;
                println!("Saved to {}", config.path().display());
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}
