// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]

use anyhow::Result;
use clap::Parser;
use fare_cli::{
    commands,
    config::{Args, Command},
};
use fare_payload::KeyPair;
use log::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger.
    // Set the log level by setting the RUST_LOG environment variable.
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    debug!("Settings: {:?}", args);

    match &args.command {
        Command::Keygen => print!("{}", commands::keygen(args.key_epoch())),
        Command::Inspect { payload } => {
            let inspection = commands::inspect(payload, &args.key_ring()?)?;
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        }
        Command::Demo => {
            let key_pair = match args.key_pair()? {
                Some(key_pair) => key_pair,
                None => {
                    info!("No signing key configured, using a throwaway one");
                    KeyPair::generate(args.key_epoch())
                }
            };
            let key_ring = args.key_ring_for(&key_pair)?;
            let demo = commands::demo(
                key_pair,
                key_ring,
                args.issuance_policy(),
                args.max_validation_attempts,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&demo)?);
        }
    }

    Ok(())
}
