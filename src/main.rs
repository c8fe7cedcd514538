use clap::Parser;
use img_zipper::cli::{Args, Commands};
use img_zipper::{logger, server, zip_images, ServerConfig, TransformConfig};
use rayon::ThreadPoolBuilder;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);
    setup_thread_pool(args.command.threads());

    run(args.command)
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Zip {
            inputs,
            output,
            format,
            quality,
            max_length,
            max_width,
            max_height,
            no_resize,
            recursive,
            ..
        } => {
            let max_length = (!no_resize).then_some(max_length);
            let config = TransformConfig::new(format, quality, max_length)?
                .with_bounds(max_width, max_height)?;
            zip_images(&inputs, &output, &config, recursive)?;
        }
        Commands::Serve {
            config,
            bind,
            port,
            output,
        } => {
            let mut server_config = ServerConfig::resolve(config.as_deref())?;
            if let Some(bind) = bind {
                server_config.bind = bind;
            }
            if let Some(port) = port {
                server_config.port = port;
            }
            if let Some(output) = output {
                server_config.output_path = output;
            }

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(server_config))?;
        }
    }

    Ok(())
}

fn setup_thread_pool(threads: Option<usize>) {
    if let Some(num_threads) = threads {
        ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .unwrap_or_else(|e| {
                img_zipper::warn!("Failed to set thread pool size: {}", e);
            });
    }
}
