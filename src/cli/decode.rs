// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Decode command - print the plain text behind a final artifact

use miette::Result;
use std::path::PathBuf;

use super::{load_config, Overrides};
use crate::stages::{decode, read_input, ArtifactLayout, StageKind};

/// Run the decode command
pub async fn run(file: Option<PathBuf>, config_path: PathBuf, _verbose: bool) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => {
            let config = load_config(&config_path, &Overrides::default())?;
            ArtifactLayout::new(&config.output_dir).final_output()
        }
    };

    let raw = read_input(&path, StageKind::Finalize.name())?;
    let encoded = String::from_utf8_lossy(&raw);
    let plain = decode(&encoded)?;

    println!("{}", plain);

    Ok(())
}
