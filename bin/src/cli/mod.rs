use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simplelog::LevelFilter;

mod fonts;
mod generate;
mod preview;
mod stampargs;

/// Stamps names onto PDF certificate templates.
#[derive(Parser, Debug)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Logging level.
    #[arg(long, default_value = "Warn")]
    log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
enum Command {
    Generate(generate::Command),
    Preview(preview::Command),
    Fonts(fonts::Command),
}

pub fn run() -> Result<()> {
    let args = Args::parse();

    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())
        .with_context(|| "configuring logging")?;

    let xdg_dirs = xdg::BaseDirectories::with_prefix("signit");

    use Command::*;
    match &args.command {
        Generate(cmd) => generate::run(cmd, &xdg_dirs),
        Preview(cmd) => preview::run(cmd, &xdg_dirs),
        Fonts(cmd) => fonts::run(cmd),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use googletest::prelude::*;

    use super::*;

    #[gtest]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[gtest]
    fn test_default_log_level() -> anyhow::Result<()> {
        let args = Args::try_parse_from(["signit", "fonts"])?;
        expect_that!(args.log_level, eq(LevelFilter::Warn));
        Ok(())
    }

    #[gtest]
    fn test_generate_args() -> anyhow::Result<()> {
        let args = Args::try_parse_from([
            "signit",
            "--log-level=debug",
            "generate",
            "template.pdf",
            "names.csv",
            "out",
            "--font=Courier",
            "--bold",
            "--no-progress",
        ])?;

        expect_that!(args.log_level, eq(LevelFilter::Debug));
        expect_that!(matches!(args.command, Command::Generate(_)), eq(true));
        Ok(())
    }

    #[gtest]
    fn test_missing_arguments_rejected() {
        expect_that!(
            Args::try_parse_from(["signit", "generate", "template.pdf"]).is_err(),
            eq(true)
        );
    }
}
