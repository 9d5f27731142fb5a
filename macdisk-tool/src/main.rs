//! macdisk-tool — CLI for exploring vintage Macintosh disk images
//!
//! Walks the stack end-to-end: container unwrapping (DC42, CD-ROM BIN,
//! Apple Partition Map) → MFS/HFS volumes → files, forks and resources.
//!
//! # Usage
//!
//! ```text
//! macdisk-tool info <image...>                           Partition overview
//! macdisk-tool list <paths...> [filters] [--group]       List files
//! macdisk-tool tree <image...>                           Folder trees
//! macdisk-tool diff <path-a> <path-b> [filters]          One-sided files
//! macdisk-tool dupes <paths...> [filters]                Duplicate files
//! macdisk-tool rsrc <image...> [--rsrc-type=XXXX]        Resource listings
//!
//! Filters: --type=XXXX[/CCCC]  --creator=XXXX  --name=substring
//! Paths may be directories; they are searched recursively.
//! ```

mod cmd_diff;
mod cmd_dupes;
mod cmd_info;
mod cmd_list;
mod cmd_rsrc;
mod cmd_tree;
mod scan;
mod style;

use std::env;
use std::process;

use style::{BOLD, DIM, GREEN, RED, RESET};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "list" => cmd_list::run(&args[2..]),
        "tree" => cmd_tree::run(&args[2..]),
        "diff" => cmd_diff::run(&args[2..]),
        "dupes" => cmd_dupes::run(&args[2..]),
        "rsrc" => cmd_rsrc::run(&args[2..]),
        "info" => cmd_info::run(&args[2..]),
        "-h" | "--help" | "help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("{RED}Unknown command: {}{RESET}", args[1]);
            print_usage();
            process::exit(1);
        }
    };

    if let Err(error) = result {
        eprintln!("{RED}error:{RESET} {error}");
        process::exit(1);
    }
}

fn print_usage() {
    eprintln!(
        r#"
{BOLD}macdisk-tool{RESET} — vintage Macintosh disk image explorer

{DIM}Containers (DC42, CD-ROM BIN, APM) → MFS/HFS volumes → files & resources{RESET}

{BOLD}USAGE:{RESET}
    macdisk-tool <COMMAND> [OPTIONS]

{BOLD}COMMANDS:{RESET}
    {GREEN}info{RESET}   <image...>                 Partition overview
    {GREEN}list{RESET}   <paths...> [--group]       List files across images
    {GREEN}tree{RESET}   <image...>                 Folder trees
    {GREEN}diff{RESET}   <path-a> <path-b>          Files present on one side only
    {GREEN}dupes{RESET}  <paths...>                 Duplicate files by fork content
    {GREEN}rsrc{RESET}   <image...>                 Resource fork listings

{BOLD}FILTERS:{RESET}
    --type=XXXX[/CCCC]   Match file type (and creator)
    --creator=XXXX       Match creator code
    --name=substring     Case-insensitive name match

{BOLD}EXAMPLES:{RESET}
    macdisk-tool info "System 7.dsk"
    macdisk-tool list floppies/ --type=APPL --group
    macdisk-tool diff "disk1.img" "disk2.img"
    macdisk-tool rsrc game.iso --rsrc-type="ICN#"

{DIM}Directories are searched recursively for disk images{RESET}
"#
    );
}
