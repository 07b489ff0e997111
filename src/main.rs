#[cfg(not(feature = "cli"))]
compile_error!("The `ese` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::process;

use ese::cli;
use ese::cli::app::{Cli, ColorMode, Commands};
use ese::EseError;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, EseError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| EseError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Parse {
            file,
            verbose,
            json,
        } => cli::parse::execute(
            &cli::parse::ParseOptions {
                file,
                verbose,
                json,
            },
            &mut writer,
        ),

        Commands::Pages {
            file,
            page,
            list,
            json,
        } => cli::pages::execute(
            &cli::pages::PagesOptions {
                file,
                page,
                list_mode: list,
                json,
            },
            &mut writer,
        ),

        Commands::Dump {
            file,
            page,
            offset,
            length,
            raw,
        } => cli::dump::execute(
            &cli::dump::DumpOptions {
                file,
                page,
                offset,
                length,
                raw,
            },
            &mut writer,
        ),

        Commands::Checksum {
            file,
            page,
            bad_only,
            json,
        } => cli::checksum::execute(
            &cli::checksum::ChecksumOptions {
                file,
                page,
                bad_only,
                json,
            },
            &mut writer,
        ),

        Commands::Tables {
            file,
            verbose,
            json,
        } => cli::tables::execute(
            &cli::tables::TablesOptions {
                file,
                verbose,
                json,
            },
            &mut writer,
        ),

        Commands::Records {
            file,
            table,
            limit,
            json,
        } => cli::records::execute(
            &cli::records::RecordsOptions {
                file,
                table,
                limit,
                json,
            },
            &mut writer,
        ),

        Commands::Export { file, table, json } => cli::export::execute(
            &cli::export::ExportOptions { file, table, json },
            &mut writer,
        ),

        Commands::Validate { file, json } => cli::validate::execute(
            &cli::validate::ValidateOptions { file, json },
            &mut writer,
        ),

        Commands::Find { dir, verbose, json } => cli::find::execute(
            &cli::find::FindOptions { dir, verbose, json },
            &mut writer,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
