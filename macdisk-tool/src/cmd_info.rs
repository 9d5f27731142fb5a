use std::process;

use crate::scan::{for_each_image, parse_flags};
use crate::style::*;

/// Expansion result and a per-partition summary.
pub(crate) fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (_, paths) = parse_flags(args);
    if paths.is_empty() {
        eprintln!("Usage: macdisk-tool info <image...>");
        process::exit(1);
    }

    for_each_image(&paths, &mut |image| {
        header(&image.path().display().to_string());

        if image.partitions().is_empty() {
            println!("  {DIM}No Macintosh volumes found{RESET}");
            println!();
            return;
        }

        for (index, partition) in image.partitions().iter().enumerate() {
            println!();
            println!(
                "  {GREEN}{BOLD}Partition {index}{RESET} {DIM}({}){RESET}",
                partition.kind()
            );
            let tree = partition.tree();
            kv("Volume name", partition.volume_name());
            kv("Files", &tree.file_count().to_string());
            // The root is not somebody's child, so it is not counted.
            kv("Folders", &(tree.folder_count() - 1).to_string());
        }
        println!();
    });

    Ok(())
}
