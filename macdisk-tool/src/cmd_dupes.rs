use std::collections::BTreeMap;
use std::process;

use crate::scan::{collect_files, parse_flags, FileEntry, Filter};
use crate::style::*;

/// Find files that occur more than once: same name, codes and sizes, and
/// the same fork content digests.
pub(crate) fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (flags, paths) = parse_flags(args);
    if paths.is_empty() {
        eprintln!("Usage: macdisk-tool dupes <paths...> [--type=XXXX] [--creator=XXXX] [--name=substring]");
        process::exit(1);
    }

    let filters = Filter::from_flags(&flags);
    let entries = collect_files(&paths, &filters, true);

    let mut groups: BTreeMap<String, Vec<&FileEntry>> = BTreeMap::new();
    for entry in &entries {
        groups.entry(entry.content_key()).or_default().push(entry);
    }

    let mut duplicates = 0usize;
    for group in groups.values().filter(|group| group.len() > 1) {
        duplicates += 1;
        println!(
            "{BOLD}{}{RESET} {DIM}{} copies{RESET}",
            group[0].describe(),
            group.len()
        );
        for entry in group {
            println!(
                "  {DIM}{}:{RESET}{} {DIM}in {}{RESET}",
                entry.folder,
                entry.name,
                entry.image.display()
            );
        }
        println!();
    }

    if duplicates == 0 {
        println!("  {DIM}No duplicates found{RESET}");
    } else {
        println!("  {DIM}{duplicates} duplicated file(s){RESET}");
    }

    Ok(())
}
