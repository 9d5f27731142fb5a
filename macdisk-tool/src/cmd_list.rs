use std::collections::BTreeMap;
use std::process;

use crate::scan::{collect_files, fork_sizes, parse_flags, FileEntry, Filter};
use crate::style::*;

pub(crate) fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (flags, paths) = parse_flags(args);
    if paths.is_empty() {
        eprintln!("Usage: macdisk-tool list <paths...> [--type=XXXX[/CCCC]] [--creator=XXXX] [--name=substring] [--group]");
        process::exit(1);
    }

    let filters = Filter::from_flags(&flags);
    let entries = collect_files(&paths, &filters, false);

    if flags.contains_key("group") {
        print_groups(&entries);
    } else {
        for entry in &entries {
            println!(
                "{DIM}{}:{RESET}{} {}",
                entry.folder,
                entry.name,
                describe_tail(entry)
            );
        }
        println!();
        println!("  {DIM}{} file(s){RESET}", entries.len());
    }

    Ok(())
}

fn describe_tail(entry: &FileEntry) -> String {
    format!(
        "{CYAN}{}{RESET}/{CYAN}{}{RESET} {DIM}{}{RESET}",
        entry.file_type,
        entry.creator,
        fork_sizes(
            entry.data_size,
            entry.data_size,
            entry.rsrc_size,
            entry.rsrc_size
        )
    )
}

/// Aggregate by name/type/creator, reporting occurrence counts and the
/// fork-size ranges seen across disks.
fn print_groups(entries: &[FileEntry]) {
    let mut groups: BTreeMap<String, Vec<&FileEntry>> = BTreeMap::new();
    for entry in entries {
        let key = format!("{}|{}|{}", entry.name, entry.file_type, entry.creator);
        groups.entry(key).or_default().push(entry);
    }

    for group in groups.values() {
        let first = group[0];
        let dmin = group.iter().map(|e| e.data_size).min().unwrap_or(0);
        let dmax = group.iter().map(|e| e.data_size).max().unwrap_or(0);
        let rmin = group.iter().map(|e| e.rsrc_size).min().unwrap_or(0);
        let rmax = group.iter().map(|e| e.rsrc_size).max().unwrap_or(0);
        println!(
            "{} {CYAN}{}{RESET}/{CYAN}{}{RESET} {BOLD}{}{RESET} occurrence(s) {DIM}{}{RESET}",
            first.name,
            first.file_type,
            first.creator,
            group.len(),
            fork_sizes(dmin, dmax, rmin, rmax)
        );
    }
    println!();
    println!("  {DIM}{} group(s){RESET}", groups.len());
}
