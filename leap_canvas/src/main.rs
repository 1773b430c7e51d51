//! leap_canvas — interactive entry point.

use std::path::{Path, PathBuf};

use gesture_canvas::CanvasConfig;
use leap_canvas::app::{run, AppConfig};
use tracing_subscriber::EnvFilter;

/// Picked up from the working directory when no `--config` is given.
const DEFAULT_CONFIG: &str = "gesture_canvas.toml";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Leap Canvas — Multi-Hand Gesture Drawing Board        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Mouse/keyboard simulation  (use --features leap for hardware)");
    println!();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let quick = args.iter().any(|a| a == "--quick");
    let explicit = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let path = match explicit {
        Some(p) => Some(p),
        None if !quick && Path::new(DEFAULT_CONFIG).exists() => Some(PathBuf::from(DEFAULT_CONFIG)),
        None => None,
    };

    let canvas = match path {
        Some(p) => match CanvasConfig::load(&p) {
            Ok(cfg) => {
                println!("  Config: {}", p.display());
                cfg
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            println!("  Config: built-in defaults");
            CanvasConfig::default()
        }
    };

    if args.iter().any(|a| a == "--print-config") {
        match canvas.to_toml_string() {
            Ok(text) => {
                println!();
                print!("{}", text);
                return;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    println!(
        "  Canvas {}×{}, {} fps cap, {} s guest window",
        canvas.canvas.width, canvas.canvas.height, canvas.frame.max_fps, canvas.roles.guest_window_secs,
    );
    println!();
    println!("  Opening canvas window…");
    println!();

    let cfg = AppConfig { canvas, ..AppConfig::default() };
    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
