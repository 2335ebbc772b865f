use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    txtshelf::logging::init().context("init logging")?;

    let cli = txtshelf::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = txtshelf::commands::resolve_config(&cli.global);
    tracing::debug!(?config, "resolved config");

    match cli.command {
        txtshelf::cli::Command::Import(args) => {
            txtshelf::commands::import(args, &config)
                .await
                .context("import")?;
        }
        txtshelf::cli::Command::Toc(args) => {
            txtshelf::commands::toc(args, &config).context("toc")?;
        }
        txtshelf::cli::Command::Render(args) => {
            txtshelf::commands::render(args, &config).context("render")?;
        }
        txtshelf::cli::Command::List => {
            txtshelf::commands::list(&config).await.context("list")?;
        }
        txtshelf::cli::Command::Open(args) => {
            txtshelf::commands::open(args, &config).await.context("open")?;
        }
        txtshelf::cli::Command::Progress(args) => {
            txtshelf::commands::progress(args, &config)
                .await
                .context("progress")?;
        }
        txtshelf::cli::Command::Read(args) => {
            txtshelf::commands::read(args, &config)
                .await
                .context("read")?;
        }
        txtshelf::cli::Command::Delete(args) => {
            txtshelf::commands::delete(args, &config)
                .await
                .context("delete")?;
        }
    }

    Ok(())
}
