//! Bone map command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use console::Style;
use std::fs;
use std::path::{Path, PathBuf};

use sxr_anim::{derive_bone_map, format_bone_map, parse_bone_map};

use crate::utils::{load_skeleton, write_output};

#[derive(Subcommand)]
pub enum BonemapCommands {
    /// Print a bone map matching bones by name
    Derive {
        /// Source skeleton JSON file
        source: PathBuf,

        /// Target skeleton JSON file
        target: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a text bone map against two skeletons
    Check {
        /// Source skeleton JSON file
        source: PathBuf,

        /// Target skeleton JSON file
        target: PathBuf,

        /// Bone map text file
        map: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

pub fn execute(cmd: BonemapCommands) -> Result<()> {
    match cmd {
        BonemapCommands::Derive {
            source,
            target,
            output,
        } => handle_derive(&source, &target, output.as_ref()),
        BonemapCommands::Check {
            source,
            target,
            map,
            no_color,
        } => handle_check(&source, &target, &map, no_color),
    }
}

fn handle_derive(source: &Path, target: &Path, output: Option<&PathBuf>) -> Result<()> {
    let source = load_skeleton(source)?;
    let target = load_skeleton(target)?;

    let map = derive_bone_map(&source, &target);
    log::info!(
        "Matched {} of {} source bones by name",
        map.iter().flatten().count(),
        map.len()
    );
    let text = format_bone_map(&map, &source, &target).context("Failed to format bone map")?;
    write_output(output, &text)
}

fn handle_check(source: &Path, target: &Path, map_path: &Path, no_color: bool) -> Result<()> {
    let source = load_skeleton(source)?;
    let target = load_skeleton(target)?;
    let text = fs::read_to_string(map_path)
        .with_context(|| format!("Failed to read bone map from {}", map_path.display()))?;

    let map = parse_bone_map(&text, &source, &target);
    let source_names = source.bone_names();
    let target_names = target.bone_names();

    let (ok, missing) = if no_color {
        (Style::new(), Style::new())
    } else {
        (Style::new().green(), Style::new().yellow())
    };

    println!("=== Bone Map ===");
    let mut covered = vec![false; target_names.len()];
    for (src, dst) in map.iter().enumerate() {
        match dst {
            Some(dst) => {
                covered[*dst] = true;
                println!(
                    "{} {} -> {}",
                    ok.apply_to("✓"),
                    source_names[src],
                    target_names[*dst]
                );
            }
            None => println!("{} {} (unmapped)", missing.apply_to("-"), source_names[src]),
        }
    }

    let mapped = map.iter().flatten().count();
    println!(
        "\nMapped {mapped} of {} source bones onto {} target bones",
        source_names.len(),
        target_names.len()
    );

    let undriven: Vec<&str> = target_names
        .iter()
        .zip(&covered)
        .filter(|(_, c)| !**c)
        .map(|(n, _)| n.as_str())
        .collect();
    if !undriven.is_empty() {
        println!("Target bones without a source: {}", undriven.join(", "));
    }
    Ok(())
}
