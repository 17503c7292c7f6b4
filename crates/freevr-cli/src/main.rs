//! FreeVR input tools: run the static device, inspect the input map, parse
//! descriptors.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use freevr_common::{DeviceConfig, InputConfig, InputDecl};
use freevr_input::report::{fprint_input_value, sprint_device, sprint_input};
use freevr_input::{
    parse_input_description, parse_input_dti, parse_mapname, process_sync, DriverRegistry,
    InputContext, InputProcess, PrintStyle,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "freevr-input")]
#[command(about = "FreeVR input subsystem tools")]
struct Args {
    /// JSON input configuration; a static demo device is used when absent
    #[arg(short, long, global = true, env = "FREEVR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Style {
    Brief,
    OneLine,
    Verbose,
}

impl From<Style> for PrintStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Brief => PrintStyle::Brief,
            Style::OneLine => PrintStyle::OneLine,
            Style::Verbose => PrintStyle::Verbose,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every device for a number of frames, freezing after each
    Demo {
        #[arg(short, long, default_value_t = 100)]
        frames: u64,
        /// Frame budget in microseconds, overriding the configuration
        #[arg(long)]
        frame_usec: Option<u64>,
    },

    /// Print the input map
    Map {
        #[arg(short, long, value_enum, default_value_t = Style::Brief)]
        style: Style,
        /// Also print every device
        #[arg(long)]
        devices: bool,
    },

    /// Look up one input by logical address, e.g. `2-way[0]` or `v[1]`
    Lookup {
        address: String,
        #[arg(short, long, value_enum, default_value_t = Style::Brief)]
        style: Style,
    },

    /// List the inputs the configuration describes for the user
    Ui,

    /// Parse an input description such as `valuator(wand:sinewave[4.0])`
    Parse { description: String },

    /// Print the effective configuration as JSON
    Config,

    /// Show version information
    Version,
}

fn demo_config() -> InputConfig {
    let decl = |name: &str, desc: &str, ui: Option<&str>| InputDecl {
        name: name.to_string(),
        desc: desc.to_string(),
        ui: ui.map(str::to_string),
        ..InputDecl::default()
    };
    InputConfig {
        min_frame_usec: 10_000,
        devices: vec![DeviceConfig {
            name: "static".to_string(),
            driver: "static".to_string(),
            args: "y=5.0;valuator=0.0".to_string(),
            inputs: vec![
                decl("blink", "2switch(static:toggle[2.0])", Some("flash the lights")),
                decl("steady", "2switch(static:constant[1])", None),
                decl("wave", "valuator(static:sinewave[4.0])", Some("sway the scene")),
                decl("head", "6sensor(static:constant[])", None),
                decl("bob", "6sensor(static:sinewave[3.0, 0.5])", None),
                decl("print_help", "control(static:print_help)", None),
                decl("system_pause_toggle", "control(static:system_pause_toggle)", None),
            ],
            ..DeviceConfig::default()
        }],
        ..InputConfig::default()
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<InputConfig> {
    match path {
        Some(path) => InputConfig::from_json_file(path)
            .with_context(|| format!("loading input configuration from {}", path.display())),
        None => Ok(demo_config()),
    }
}

fn bring_up(config: InputConfig) -> Result<Arc<InputContext>> {
    let registry = DriverRegistry::with_builtin();
    Ok(InputContext::bring_up(config, &registry)?)
}

fn main() -> Result<()> {
    freevr_common::init_tracing();

    let args = Args::parse();

    match args.command {
        Command::Demo { frames, frame_usec } => {
            let mut config = load_config(args.config.as_ref())?;
            if let Some(usec) = frame_usec {
                config.min_frame_usec = usec;
            }
            let frame = Duration::from_micros(config.min_frame_usec);
            let ctx = InputContext::new(config, &DriverRegistry::with_builtin())?;
            let mut process = InputProcess::all(Arc::clone(&ctx));
            process.init()?;
            ctx.create_input_map();
            if !ctx.all_devices_open() {
                warn!("not every input device is operating");
            }

            for _ in 0..frames {
                std::thread::sleep(frame);
                process_sync(&ctx, None, true, None)?;
                process.one_frame();
            }
            process.term();

            info!("polled {} frames", process.frame_count());
            print!("{}", sprint_input(&ctx, PrintStyle::Verbose));
        }
        Command::Map { style, devices } => {
            let ctx = bring_up(load_config(args.config.as_ref())?)?;
            print!("{}", sprint_input(&ctx, style.into()));
            if devices {
                for device in ctx.devices() {
                    print!("{}", sprint_device(device, style.into()));
                }
            }
        }
        Command::Lookup { address, style } => {
            parse_mapname(&address)?;
            let ctx = bring_up(load_config(args.config.as_ref())?)?;
            let input = ctx.get_from_mapname(&address);
            let mut out = String::new();
            fprint_input_value(&mut out, input.as_deref(), style.into())?;
            print!("{out}");
        }
        Command::Ui => {
            let ctx = bring_up(load_config(args.config.as_ref())?)?;
            print!("{}", ctx.sprint_input_ui());
        }
        Command::Parse { description } => {
            let desc = parse_input_description(&description)?;
            println!("type:     {}", desc.input_type);
            println!("args:     {}", desc.args);
            let dti = parse_input_dti(&desc.args)?;
            println!("device:   {}", dti.device);
            println!("kind:     {}", dti.kind);
            println!("instance: {}", dti.instance_value());
            if let Some(extra) = dti.instance_args() {
                println!("extra:    {extra}");
            }
        }
        Command::Config => {
            let config = load_config(args.config.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Version => {
            println!("freevr-input {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
