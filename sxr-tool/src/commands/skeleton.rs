//! Skeleton description command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use sxr_anim::{BoneOptions, SkeletonDescription};

use crate::utils::{
    TreeOptions, load_description, load_skeleton, render_tree, skeleton_tree, write_output,
};

#[derive(Subcommand)]
pub enum SkeletonCommands {
    /// Display information about a skeleton description
    Info {
        /// Path to the skeleton JSON file
        file: PathBuf,

        /// List every bone
        #[arg(short, long)]
        detailed: bool,
    },

    /// Display the bone hierarchy as a tree
    Tree {
        /// Path to the skeleton JSON file
        file: PathBuf,

        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,

        /// Show bone details on the same line
        #[arg(short, long)]
        compact: bool,

        /// Hide bone details
        #[arg(long)]
        no_metadata: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Append the bones of one skeleton that another lacks
    Merge {
        /// Skeleton receiving the bones
        base: PathBuf,

        /// Skeleton providing the bones
        extra: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn execute(cmd: SkeletonCommands) -> Result<()> {
    match cmd {
        SkeletonCommands::Info { file, detailed } => handle_info(&file, detailed),
        SkeletonCommands::Tree {
            file,
            depth,
            compact,
            no_metadata,
            no_color,
        } => handle_tree(
            &file,
            &TreeOptions {
                max_depth: depth,
                no_color,
                show_metadata: !no_metadata,
                compact,
            },
        ),
        SkeletonCommands::Merge {
            base,
            extra,
            output,
        } => handle_merge(&base, &extra, output.as_ref()),
    }
}

/// Longest parent chain, counting the root as depth 1
fn hierarchy_depth(desc: &SkeletonDescription) -> usize {
    let mut depths: Vec<usize> = Vec::with_capacity(desc.bones.len());
    for bone in &desc.bones {
        let depth = usize::try_from(bone.parent)
            .ok()
            .and_then(|p| depths.get(p))
            .map_or(1, |d| d + 1);
        depths.push(depth);
    }
    depths.into_iter().max().unwrap_or(0)
}

fn count_with(desc: &SkeletonDescription, option: BoneOptions) -> usize {
    desc.bones
        .iter()
        .filter(|b| b.options.contains(option))
        .count()
}

fn handle_info(path: &Path, detailed: bool) -> Result<()> {
    // Building the skeleton validates the hierarchy
    let skeleton = load_skeleton(path)?;
    let desc = skeleton.description();

    println!("=== Skeleton Information ===");
    println!("File: {}", path.display());
    println!("Bones: {}", skeleton.num_bones());
    let roots: Vec<&str> = desc
        .bones
        .iter()
        .filter(|b| b.parent < 0)
        .map(|b| b.name.as_str())
        .collect();
    println!("Roots: {}", roots.join(", "));
    println!("Depth: {}", hierarchy_depth(&desc));
    println!("Animated: {}", count_with(&desc, BoneOptions::ANIMATED));
    println!("Physics: {}", count_with(&desc, BoneOptions::PHYSICS));
    println!("Locked: {}", count_with(&desc, BoneOptions::LOCKED));

    let bound = skeleton.bind_pose().bound();
    println!(
        "Bind pose bounds: min ({:.3}, {:.3}, {:.3}) max ({:.3}, {:.3}, {:.3})",
        bound.min.x, bound.min.y, bound.min.z, bound.max.x, bound.max.y, bound.max.z
    );

    if detailed {
        println!("\n=== Bones ===");
        let pose = skeleton.bind_pose();
        for (i, bone) in desc.bones.iter().enumerate() {
            let p = pose.world_position(i)?;
            println!(
                "{i:4} {:<24} parent {:>4}  {:<20} world ({:.3}, {:.3}, {:.3})",
                bone.name,
                bone.parent,
                format!("{:?}", bone.options),
                p.x,
                p.y,
                p.z
            );
        }
    }

    Ok(())
}

fn handle_tree(path: &Path, options: &TreeOptions) -> Result<()> {
    let desc = load_description(path)?;
    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("skeleton");
    print!("{}", render_tree(&skeleton_tree(title, &desc), options));
    Ok(())
}

fn handle_merge(base: &Path, extra: &Path, output: Option<&PathBuf>) -> Result<()> {
    let base_skeleton = load_skeleton(base)?;
    let extra_skeleton = load_skeleton(extra)?;

    let added = base_skeleton
        .merge(&extra_skeleton)
        .context("Failed to merge skeletons")?;
    log::info!(
        "Merged {added} bones from {} into {}",
        extra.display(),
        base.display()
    );

    let json = serde_json::to_string_pretty(&base_skeleton.description())
        .context("Failed to serialize merged skeleton")?;
    write_output(output, &format!("{json}\n"))
}
