mod config;
mod error;
mod render;

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use dotmatrix_core::{Button, Cartridge, GameBoy};
use log::{debug, error, info};

use crate::{config::CliConfig, error::CliError};

#[derive(Parser)]
#[command(name = "dotmatrix", version, about = "Headless Game Boy (DMG) runner")]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Number of frames to run before writing the image
    #[arg(long)]
    frames: Option<u32>,

    /// Where to write the final frame as PNG
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Integer scale factor for the PNG
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=8))]
    scale: Option<u32>,

    /// Config file (defaults to the per-user config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hold a button for the whole run; may be repeated
    #[arg(long = "hold", value_name = "BUTTON")]
    hold: Vec<String>,

    /// Write the effective settings back to the config file
    #[arg(long)]
    save_config: bool,

    /// Enable debug logging of CPU state
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_buttons(names: &[String]) -> Result<Vec<Button>, CliError> {
    names
        .iter()
        .map(|name| Button::from_name(name).ok_or_else(|| CliError::UnknownButton(name.clone())))
        .collect()
}

/// Flags override values from the config file.
fn effective_config(args: &Args, file: CliConfig) -> CliConfig {
    CliConfig {
        frames: args.frames.unwrap_or(file.frames),
        scale: args.scale.unwrap_or(file.scale),
        output: args.output.clone().unwrap_or(file.output),
        ..file
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let file_cfg = if args.config.is_some() {
        config::read_config(&config_path)?
    } else {
        config::load_from_file(&config_path)
    };
    let cfg = effective_config(&args, file_cfg);
    if args.save_config {
        config::save_to_file(&config_path, &cfg)?;
        info!("Saved settings to {}", config_path.display());
    }

    let held = parse_buttons(&args.hold)?;
    let cart = Cartridge::from_file(&args.rom)?;

    let mut gb = GameBoy::new();
    gb.load_cart(cart);
    for &button in &held {
        gb.press(button);
    }

    for frame in 0..cfg.frames {
        gb.run_frame();
        if args.debug && frame.is_multiple_of(60) {
            debug!("frame {frame}: {}", gb.cpu.debug_state());
        }
    }

    render::write_png(&cfg.output, gb.framebuffer(), &cfg.palette, cfg.scale)?;
    info!(
        "Wrote frame {} to {}",
        gb.mmu.ppu.frames(),
        cfg.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn flags_override_config_file() {
        let args = Args::parse_from(["dotmatrix", "game.gb", "--frames", "3", "--scale", "2"]);
        let file = CliConfig {
            frames: 100,
            scale: 4,
            output: PathBuf::from("from-file.png"),
            ..CliConfig::default()
        };
        let cfg = effective_config(&args, file);
        assert_eq!(cfg.frames, 3);
        assert_eq!(cfg.scale, 2);
        assert_eq!(cfg.output, PathBuf::from("from-file.png"));
    }

    #[test]
    fn scale_is_bounded() {
        assert!(Args::try_parse_from(["dotmatrix", "game.gb", "--scale", "0"]).is_err());
        assert!(Args::try_parse_from(["dotmatrix", "game.gb", "--scale", "9"]).is_err());
    }

    #[test]
    fn hold_accepts_repeated_buttons() {
        let args = Args::parse_from(["dotmatrix", "game.gb", "--hold", "start", "--hold", "A"]);
        assert_eq!(
            parse_buttons(&args.hold).unwrap(),
            vec![Button::Start, Button::A]
        );
        assert!(matches!(
            parse_buttons(&["turbo".to_string()]),
            Err(CliError::UnknownButton(name)) if name == "turbo"
        ));
    }

    #[test]
    fn explicit_config_that_fails_to_parse_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("broken.toml");
        std::fs::write(&config_path, "scale = [").unwrap();
        let args = Args::parse_from([
            OsString::from("dotmatrix"),
            dir.path().join("missing.gb").into_os_string(),
            "--config".into(),
            config_path.into_os_string(),
        ]);
        assert!(matches!(run(args), Err(CliError::ConfigParse { .. })));
    }

    #[test]
    fn runs_a_rom_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let rom_path = dir.path().join("spin.gb");
        let out_path = dir.path().join("out.png");
        let mut rom = vec![0u8; 0x8000];
        // JR -2
        rom[0x0100] = 0x18;
        rom[0x0101] = 0xFE;
        std::fs::write(&rom_path, &rom).unwrap();

        let config_path = dir.path().join("config.toml");
        let args = Args::parse_from([
            OsString::from("dotmatrix"),
            rom_path.clone().into_os_string(),
            "--frames".into(),
            "2".into(),
            "-o".into(),
            out_path.clone().into_os_string(),
            "--config".into(),
            config_path.clone().into_os_string(),
            "--save-config".into(),
        ]);
        run(args).unwrap();

        assert!(out_path.exists());
        let saved = config::read_config(&config_path).unwrap();
        assert_eq!(saved.frames, 2);
        assert_eq!(saved.output, out_path);
    }
}
