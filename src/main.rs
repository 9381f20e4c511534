use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use pcmforge::audio::{BitDepth, TargetFormat};
use pcmforge::cli::{Cli, Commands, ConfigAction};
use pcmforge::config::Config;
use pcmforge::ipc::{AudioMethodHandler, IpcServer, MethodCall, MethodResponse, send_call};
use pcmforge::service::AudioService;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Convert {
            input,
            output,
            sample_rate,
            channels,
            bit_depth,
        } => {
            let service = AudioService::new(load_config(cli.config.as_deref())?);
            let mut target = TargetFormat::source();
            if let Some(rate) = sample_rate {
                target = target.with_sample_rate(rate);
            }
            if let Some(channels) = channels {
                target = target.with_channels(channels);
            }
            if let Some(bits) = bit_depth {
                target = target.with_bit_depth(BitDepth::try_from(bits)?);
            }
            let written = run_blocking(move || service.convert_to_wav(&input, &output, target))
                .await
                .context("Conversion failed")?;
            println!("{}", written.display());
        }
        Commands::Trim {
            input,
            output,
            start_ms,
            end_ms,
            format,
        } => {
            let service = AudioService::new(load_config(cli.config.as_deref())?);
            let kind = service.output_kind(&format)?;
            let written = run_blocking(move || {
                service.trim_audio(&input, &output, start_ms, end_ms, &kind)
            })
            .await
            .context("Trim failed")?;
            println!("{}", written.display());
        }
        Commands::Info { path, json } => {
            let service = AudioService::new(load_config(cli.config.as_deref())?);
            let info = run_blocking(move || service.get_audio_info(&path))
                .await
                .context("Failed to read audio info")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Duration:    {} ms", info.duration_ms);
                println!("Sample rate: {} Hz", info.sample_rate);
                println!("Channels:    {}", info.channels);
                println!("Bit rate:    {} b/s", info.bit_rate);
                println!("Format:      {}", info.format);
            }
        }
        Commands::Waveform { path, samples } => {
            let service = AudioService::new(load_config(cli.config.as_deref())?);
            let waveform = run_blocking(move || service.get_waveform(&path, samples))
                .await
                .context("Failed to compute waveform")?;
            for value in waveform {
                println!("{:.4}", value);
            }
        }
        Commands::Serve { socket } => {
            let config = load_config(cli.config.as_deref())?;
            let socket_path = resolve_socket(socket, &config);
            serve(config, socket_path).await?;
        }
        Commands::Call {
            method,
            args,
            socket,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let socket_path = resolve_socket(socket, &config);
            call(&socket_path, method, &args).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigAction::Path => {
                let path = cli.config.unwrap_or_else(Config::default_path);
                println!("{}", path.display());
            }
        },
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "pcmforge",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// `-q` shows errors only; `-v` info; `-vv` debug. `RUST_LOG` wins when set.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/pcmforge/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    Ok(config.with_env_overrides())
}

fn resolve_socket(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.or_else(|| config.server.socket_path.clone())
        .unwrap_or_else(IpcServer::default_socket_path)
}

/// Operations block on file and decoder I/O, so they run off the runtime threads.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> pcmforge::Result<T> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

async fn serve(config: Config, socket_path: PathBuf) -> Result<()> {
    let server = Arc::new(
        IpcServer::new(socket_path)?.with_max_message_bytes(config.server.max_message_bytes),
    );
    let handler = AudioMethodHandler::new(AudioService::new(config));

    let running = Arc::clone(&server);
    let mut task = tokio::spawn(async move { running.start(handler).await });

    tokio::select! {
        result = &mut task => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutting down");
            server.stop().await?;
            task.await??;
        }
    }
    Ok(())
}

async fn call(socket_path: &Path, method: String, args: &str) -> Result<()> {
    let args: serde_json::Value =
        serde_json::from_str(args).context("Arguments must be a JSON object")?;
    let serde_json::Value::Object(args) = args else {
        bail!("Arguments must be a JSON object");
    };

    let response = send_call(socket_path, &MethodCall { method, args }).await?;
    match response {
        MethodResponse::Success { value } => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        MethodResponse::Error { code, message } => bail!("{}: {}", code, message),
        MethodResponse::NotImplemented => bail!("Method not implemented by server"),
    }
}
