//! framescope CLI - コマンドラインインターフェース
//!
//! コールスタックを検査する framescope のREPLインターフェース

mod demo;

use anyhow::Result;
use clap::{Parser, Subcommand};
use framescope_core::{
    BacktraceFilter, ByteString, CaptureConfig, CodeUnitExt, Command, Debugger, FrameRecord,
    PathFilter, TrackAction,
};
use framescope_host::{HostRuntime, Vm};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// framescope - Call Stack Inspector
#[derive(Parser)]
#[command(name = "framescope")]
#[command(version = "0.1.0")]
#[command(about = "Inspect call-stack frames of a running program", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: InspectCommand,
}

#[derive(Subcommand)]
enum InspectCommand {
    /// Run the bundled demo program and stop inside it
    Demo {
        /// Hide frames whose source path starts with this prefix
        #[arg(long, env = "FRAMESCOPE_SKIP_PATH", default_value = demo::DEFAULT_SKIP_PATH)]
        skip_path: String,

        /// Do not hide any frames
        #[arg(long)]
        all_frames: bool,

        /// Record method definitions while the program runs
        #[arg(long)]
        track_methods: bool,

        /// Run these commands instead of starting the REPL
        #[arg(short = 'x', long = "exec")]
        exec: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    println!("framescope - Call Stack Inspector");
    println!("Version 0.1.0");
    println!();

    match cli.command {
        InspectCommand::Demo {
            skip_path,
            all_frames,
            track_methods,
            exec,
        } => {
            let config = capture_config(&skip_path, all_frames, track_methods);
            run_demo(config, &exec)
        }
    }
}

/// ログ出力を初期化する（`RUST_LOG` が優先される）
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn capture_config(skip_path: &str, all_frames: bool, track_methods: bool) -> CaptureConfig {
    let config = CaptureConfig::new().with_method_tracking(track_methods);
    if all_frames || skip_path.is_empty() {
        config
    } else {
        config.with_skip_path_prefix(skip_path)
    }
}

/// デモプログラムを実行し、停止地点でデバッガを動かす
fn run_demo(config: CaptureConfig, exec: &[String]) -> Result<()> {
    let vm = Vm::new();
    let mut debugger = Debugger::new(&vm, config);
    debug!("starting demo program");

    demo::run(&vm, |vm| {
        println!("Stopped in the demo program ({} frames on the stack)", vm.stack_len());
        if let Some(prefix) = &debugger.config().skip_path_prefix {
            println!("Hiding frames under '{}'", prefix);
        }
        println!();

        if exec.is_empty() {
            run_repl(&mut debugger)
        } else {
            run_batch(&mut debugger, exec)
        }
    })?
}

/// REPLループを実行する
fn run_repl<H: HostRuntime>(debugger: &mut Debugger<'_, H>) -> Result<()> {
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("(framescope) ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                match handle_command(debugger, line) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

/// 指定されたコマンドを順に実行する
fn run_batch<H: HostRuntime>(debugger: &mut Debugger<'_, H>, commands: &[String]) -> Result<()> {
    for line in commands {
        println!("(framescope) {}", line);
        match handle_command(debugger, line) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}

/// コマンドを処理する（`quit` なら `false` を返す）
fn handle_command<H: HostRuntime>(debugger: &mut Debugger<'_, H>, line: &str) -> Result<bool> {
    match Command::parse(line) {
        Some(Command::Help) => print_help(),
        Some(Command::Quit) => {
            println!("Goodbye!");
            return Ok(false);
        }
        Some(Command::Backtrace(filter)) => handle_backtrace(debugger, filter)?,
        Some(Command::Frame(index)) => handle_frame(debugger, index)?,
        Some(Command::Locals(index)) => handle_locals(debugger, index.unwrap_or(0))?,
        Some(Command::Depth) => println!("Stack depth: {}", debugger.depth()?),
        Some(Command::Track(action)) => handle_track(debugger, action)?,
        Some(Command::Methods) => handle_methods(debugger),
        Some(Command::Find(pattern)) => handle_find(debugger, &pattern)?,
        None => {
            println!("Unknown command: {}", line);
            println!("Type 'help' for available commands.");
        }
    }

    Ok(true)
}

fn print_frame_line(index: usize, frame: &FrameRecord) {
    let marker = if frame.is_native() { " [native]" } else { "" };
    println!("  #{:<3} {} (depth {}){}", index, frame, frame.depth(), marker);
}

/// Backtraceコマンドを処理する
fn handle_backtrace<H: HostRuntime>(debugger: &mut Debugger<'_, H>, filter: BacktraceFilter) -> Result<()> {
    let frames = match filter {
        BacktraceFilter::Configured => debugger.capture()?,
        BacktraceFilter::All => debugger.capture_all()?,
        BacktraceFilter::Prefix(prefix) => {
            debugger.capture_with(&PathFilter::new(Some(ByteString::utf8(&prefix))))?
        }
    };

    if frames.is_empty() {
        println!("No frames");
        return Ok(());
    }

    println!("Backtrace ({} frames):", frames.len());
    for (index, frame) in frames.iter().enumerate() {
        print_frame_line(index, frame);
    }
    Ok(())
}

/// Frameコマンドを処理する
fn handle_frame<H: HostRuntime>(debugger: &mut Debugger<'_, H>, index: usize) -> Result<()> {
    let locals = debugger.locals(index)?;
    let frame = debugger.frame(index)?;

    println!("Frame #{}: {}", index, frame.label());
    println!("  location: {}:{}", frame.path(), frame.display_line());
    println!("  depth:    {}", frame.depth());
    println!("  kind:     {:?}", frame.kind());
    println!("  self:     {}", debugger.describe_value(frame.self_value()));
    if let Some(class) = frame.enclosing_type() {
        println!("  class:    {}", class.name);
    }
    if let Some(path) = frame.realpath() {
        println!("  realpath: {} ({})", path, path.encoding());
    }
    if let Some(unit) = frame.code_unit() {
        println!(
            "  defined:  lines {}-{}, params ({})",
            unit.first_line(),
            unit.last_line(),
            unit.parameter_symbols().join(", ")
        );
    }
    if !frame.binding().is_frame_live() {
        println!("  (frame has returned)");
    }

    print_locals(debugger, &locals);
    Ok(())
}

/// Localsコマンドを処理する
fn handle_locals<H: HostRuntime>(debugger: &mut Debugger<'_, H>, index: usize) -> Result<()> {
    let locals = debugger.locals(index)?;
    print_locals(debugger, &locals);
    Ok(())
}

fn print_locals<H: HostRuntime>(debugger: &Debugger<'_, H>, locals: &[(String, framescope_core::Value)]) {
    if locals.is_empty() {
        println!("No local variables");
        return;
    }

    println!("Local variables:");
    for (name, value) in locals {
        println!("  {} = {}", name, debugger.describe_value(value));
    }
}

/// Trackコマンドを処理する
fn handle_track<H: HostRuntime>(debugger: &mut Debugger<'_, H>, action: TrackAction) -> Result<()> {
    match action {
        TrackAction::On => {
            debugger.enable_method_tracking();
            println!("Method definition tracking enabled");
        }
        TrackAction::Off => {
            debugger.disable_method_tracking()?;
            println!("Method definition tracking disabled");
        }
        TrackAction::Status => {
            let state = if debugger.is_tracking() { "on" } else { "off" };
            println!(
                "Method definition tracking is {} ({} recorded)",
                state,
                debugger.method_definitions().len()
            );
        }
    }
    Ok(())
}

/// Methodsコマンドを処理する
fn handle_methods<H: HostRuntime>(debugger: &Debugger<'_, H>) {
    let definitions = debugger.method_definitions();
    if definitions.is_empty() {
        println!("No method definitions recorded");
        return;
    }

    println!("Method definitions ({} recorded):", definitions.len());
    for (i, def) in definitions.iter().enumerate() {
        let owner = debugger.describe_value(&def.receiver);
        let separator = if def.singleton { "." } else { "#" };
        println!(
            "  {}. {}{}{} at {}:{}",
            i + 1,
            owner,
            separator,
            def.name.as_deref().unwrap_or("?"),
            def.location.path,
            def.location.lineno
        );
    }
}

/// Findコマンドを処理する
fn handle_find<H: HostRuntime>(debugger: &Debugger<'_, H>, pattern: &str) -> Result<()> {
    let found = debugger.find_frames(pattern)?;
    if found.is_empty() {
        println!("No frames matching '{}'", pattern);
        return Ok(());
    }

    println!("Frames matching '{}' ({} found):", pattern, found.len());
    for (index, frame) in found {
        print_frame_line(index, frame);
    }
    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  help              - Show this help message");
    println!("  quit/exit/q       - Leave the debugger and let the program finish");
    println!();
    println!("Frame commands:");
    println!("  bt                - Capture and show frames, hiding the configured path prefix");
    println!("  bt all            - Capture and show every frame");
    println!("  bt <prefix>       - Capture frames, hiding the given path prefix");
    println!("  frame <n>         - Show details of frame #n");
    println!("  locals [n]        - Show local variables of frame #n (default #0)");
    println!("  find <regex>      - Find captured frames whose label matches");
    println!("  depth             - Show the current stack depth");
    println!();
    println!("Tracking commands:");
    println!("  track on|off      - Start or stop recording method definitions");
    println!("  track             - Show the tracking status");
    println!("  methods           - List recorded method definitions");
    println!();
    println!("Examples:");
    println!("  bt");
    println!("  frame #1");
    println!("  find ^comp");
}
