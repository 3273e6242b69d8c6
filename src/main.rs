mod cli;

use glbrecode::{config, inspect, recode};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, RecodeArgs};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "glbrecode=trace,glbrecode_core=trace,glbrecode_basis=trace".to_string()
        } else {
            "glbrecode=info,glbrecode_core=info,glbrecode_basis=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Inspect { input, json }) => inspect_file(&input, json),
        Some(Commands::CheckTools) => check_tools(cli.config.as_deref()),
        Some(Commands::Validate {
            config: config_path,
        }) => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        None => recode_glb(cli.recode, cli.config.as_deref()),
    }
}

fn recode_glb(args: RecodeArgs, config_path: Option<&Path>) -> Result<()> {
    let (Some(input), Some(output)) = (args.input, args.output) else {
        anyhow::bail!("Both INPUT and OUTPUT are required");
    };

    let config = config::load_config_or_default(config_path)?;
    let job = recode::RecodeJob {
        input,
        output,
        preset: args.preset,
        keep_intermediates: args.keep_intermediates,
        resize_npot: args.resize_npot,
    };

    let outcome = recode::run(&job, &config)?;
    recode::print_summary(&outcome);
    Ok(())
}

fn inspect_file(input: &Path, json: bool) -> Result<()> {
    let input = recode::resolve_input(input)?;
    let report = inspect::inspect(&input)?;

    if json {
        let json_str = serde_json::to_string_pretty(&report)?;
        println!("{}", json_str);
    } else {
        inspect::print_report(&report);
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tool = glbrecode_basis::check_basisu(config.tools.basisu_path.as_deref());

    let status = if tool.available { "✓" } else { "✗" };
    print!("{} {}", status, tool.name);
    if let Some(ref version) = tool.version {
        print!(" ({})", version);
    }
    if let Some(ref path) = tool.path {
        print!(" - {}", path.display());
    }
    println!();

    println!();
    if tool.available {
        println!("All required tools are available!");
    } else {
        println!("basisu is missing. Install it or set tools.basisu_path in the config.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_config(&config);
        }
    }

    Ok(())
}

fn print_config(config: &config::Config) {
    match config.tools.basisu_path {
        Some(ref path) => println!("  basisu: {}", path.display()),
        None => println!("  basisu: (PATH)"),
    }
    println!("  Preset: {}", config.encoder.preset);
    println!("  Extra args: {}", config.encoder.extra_args.len());
    println!("  Resize NPOT: {}", config.encoder.resize_npot);
    if let Some(ref dir) = config.encoder.keep_intermediates {
        println!("  Intermediates: {}", dir.display());
    }
    println!("  Extension: {}", config.output.extension);
    println!("  MIME type: {}", config.output.mime_type);
}
