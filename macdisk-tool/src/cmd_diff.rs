use std::collections::HashSet;
use std::process;

use crate::scan::{collect_files, parse_flags, FileEntry, Filter};
use crate::style::*;

/// Compare two path sets by the weak file key (name, codes, fork sizes)
/// and report files present on one side only.
pub(crate) fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (flags, paths) = parse_flags(args);
    if paths.len() != 2 {
        eprintln!("Usage: macdisk-tool diff <path-a> <path-b> [--type=XXXX] [--creator=XXXX] [--name=substring]");
        process::exit(1);
    }

    let filters = Filter::from_flags(&flags);
    let side_a = collect_files(&paths[..1], &filters, false);
    let side_b = collect_files(&paths[1..], &filters, false);

    let keys_a: HashSet<String> = side_a.iter().map(|entry| entry.key()).collect();
    let keys_b: HashSet<String> = side_b.iter().map(|entry| entry.key()).collect();

    print_side(
        &format!("Only in {}", paths[0].display()),
        side_a.iter().filter(|entry| !keys_b.contains(&entry.key())),
    );
    print_side(
        &format!("Only in {}", paths[1].display()),
        side_b.iter().filter(|entry| !keys_a.contains(&entry.key())),
    );

    Ok(())
}

fn print_side<'a>(title: &str, entries: impl Iterator<Item = &'a FileEntry>) {
    header(title);
    let mut count = 0usize;
    for entry in entries {
        count += 1;
        println!("  {DIM}{}:{RESET}{}", entry.folder, entry.describe());
    }
    if count == 0 {
        println!("  {DIM}(no differences){RESET}");
    } else {
        println!();
        println!("  {DIM}{count} file(s){RESET}");
    }
}
