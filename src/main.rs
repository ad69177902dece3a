//! stagehand - copy, print and delete local files and remote objects.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use stagehand::{AccessOptions, CopyOptions, Store, StoreConfig};
use std::io::Read;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = cli().get_matches();
    let (command, args) = matches.subcommand().context("a subcommand is required")?;
    let use_pool = !args.get_flag("no-pool");
    let extra = parse_extra(args)?;

    let config = StoreConfig::from_env()?;
    let store = build_store(&config)?;

    match command {
        "copy" => {
            let source = required(args, "source")?;
            let destination = required(args, "destination")?;
            let mut options = CopyOptions::new().pooled(use_pool);
            options.extra = extra;
            store.copy(source, destination, &options).await?;
        }
        "cat" => {
            let location = required(args, "location")?;
            let mut options = AccessOptions::new().pooled(use_pool);
            options.extra = extra;
            let content = store
                .access(location, "rb", &options, |handle| {
                    let mut content = Vec::new();
                    handle.read_to_end(&mut content)?;
                    Ok(content)
                })
                .await?;
            std::io::Write::write_all(&mut std::io::stdout(), &content)?;
        }
        "delete" => {
            let location = required(args, "location")?;
            store.delete(location, use_pool).await?;
        }
        other => anyhow::bail!("unknown subcommand {other}"),
    }

    Ok(())
}

fn cli() -> Command {
    Command::new("stagehand")
        .version(stagehand::VERSION)
        .about("Copy, print and delete local files and remote objects")
        .long_about(
            "stagehand moves data between local paths and object stores such as \
             s3://bucket/key, staging remote objects through a private cache.",
        )
        .subcommand_required(true)
        .arg(
            Arg::new("no-pool")
                .long("no-pool")
                .help("Build a fresh client per transfer instead of using the session pool")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("extra")
                .long("extra")
                .value_name("KEY=VALUE")
                .help("Provider-specific transfer option; may be repeated")
                .action(ArgAction::Append)
                .global(true),
        )
        .subcommand(
            Command::new("copy")
                .about("Copy SOURCE to DESTINATION")
                .arg(Arg::new("source").required(true).index(1))
                .arg(Arg::new("destination").required(true).index(2)),
        )
        .subcommand(
            Command::new("cat")
                .about("Write a file or object to standard output")
                .arg(Arg::new("location").required(true).index(1)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a file or object")
                .arg(Arg::new("location").required(true).index(1)),
        )
}

#[cfg(feature = "s3")]
fn build_store(config: &StoreConfig) -> Result<Store> {
    Ok(Store::from_config(config)?)
}

#[cfg(not(feature = "s3"))]
fn build_store(_config: &StoreConfig) -> Result<Store> {
    Ok(Store::builder().build()?)
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument {name}"))
}

fn parse_extra(matches: &ArgMatches) -> Result<stagehand::backend::TransferOptions> {
    let mut extra = stagehand::backend::TransferOptions::new();
    if let Some(values) = matches.get_many::<String>("extra") {
        for value in values {
            let (key, val) = value
                .split_once('=')
                .with_context(|| format!("--extra expects KEY=VALUE, got {value:?}"))?;
            extra.insert(key.to_string(), val.to_string());
        }
    }
    Ok(extra)
}
