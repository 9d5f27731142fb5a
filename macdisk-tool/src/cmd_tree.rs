use std::process;

use macdisk::macfs::{FolderId, Tree};

use crate::scan::{for_each_image, parse_flags};
use crate::style::*;

pub(crate) fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (_, paths) = parse_flags(args);
    if paths.is_empty() {
        eprintln!("Usage: macdisk-tool tree <image...>");
        process::exit(1);
    }

    for_each_image(&paths, &mut |image| {
        for partition in image.partitions() {
            header(&format!(
                "{} {DIM}[{}]{RESET} in {}",
                partition.volume_name(),
                partition.kind(),
                image.path().display()
            ));
            println!();
            let tree = partition.tree();
            print_folder(tree, tree.root(), "");
            println!();
        }
    });

    Ok(())
}

fn print_folder(tree: &Tree, folder: FolderId, prefix: &str) {
    let node = tree.folder(folder);
    let total = node.files().len() + node.folders().len();
    let mut shown = 0usize;

    for &file_id in node.files() {
        shown += 1;
        let connector = if shown == total { ELBOW } else { TEE };
        let file = tree.file(file_id);
        println!(
            "  {prefix}{DIM}{connector}{RESET} {} {DIM}{}/{} {}{RESET}",
            file.name(),
            file.file_type(),
            file.creator(),
            format_size(file.data_size() as u64 + file.rsrc_size() as u64)
        );
    }

    for &sub in node.folders() {
        shown += 1;
        let last = shown == total;
        let connector = if last { ELBOW } else { TEE };
        println!(
            "  {prefix}{DIM}{connector}{RESET} {BLUE}{BOLD}{}{RESET}",
            tree.folder(sub).name()
        );
        let child_prefix = if last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}{PIPE}   ")
        };
        print_folder(tree, sub, &child_prefix);
    }
}
