use std::process;

use macdisk::macfs::{visit_folder, File, FileVisitor, Tree};
use macdisk::macrsrc::RsrcParser;

use crate::scan::{for_each_image, matches_all, parse_flags, Filter};
use crate::style::*;

/// Parse every resource fork and list the resources inside.
pub(crate) fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (flags, paths) = parse_flags(args);
    if paths.is_empty() {
        eprintln!("Usage: macdisk-tool rsrc <image...> [--type=XXXX] [--rsrc-type=XXXX] [--name=substring]");
        process::exit(1);
    }

    let filters = Filter::from_flags(&flags);
    let rsrc_type = flags.get("rsrc-type").cloned();

    struct Lister<'a> {
        filters: &'a [Filter],
        rsrc_type: Option<&'a str>,
    }

    impl FileVisitor for Lister<'_> {
        fn visit_file(&mut self, tree: &Tree, file: &File) {
            if file.rsrc_size() == 0 || !matches_all(self.filters, file) {
                return;
            }

            let fork = match file.read_rsrc(0, file.rsrc_size()) {
                Ok(fork) => fork,
                Err(error) => {
                    eprintln!(
                        "{RED}error:{RESET} reading resource fork of {}: {error}",
                        file.name()
                    );
                    return;
                }
            };

            let parent = file.parent().map(|id| tree.path_string(id)).unwrap_or_default();
            println!("{DIM}{parent}:{RESET}{BOLD}{}{RESET}", file.name());

            let parser = RsrcParser::from_slice(&fork);
            if !parser.is_valid() {
                println!("    {RED}invalid resource fork{RESET}");
                return;
            }
            match parser.resources() {
                Ok(resources) => {
                    for resource in &resources {
                        let type_code = resource.type_code().to_string();
                        if self.rsrc_type.is_some_and(|want| want != type_code) {
                            continue;
                        }
                        if resource.has_name() {
                            println!(
                                "    {CYAN}{type_code}{RESET} ID={} [{}] {} bytes",
                                resource.id(),
                                resource.name(),
                                resource.len()
                            );
                        } else {
                            println!(
                                "    {CYAN}{type_code}{RESET} ID={} {} bytes",
                                resource.id(),
                                resource.len()
                            );
                        }
                    }
                }
                Err(error) => println!("    {RED}error reading resources: {error}{RESET}"),
            }
        }
    }

    for_each_image(&paths, &mut |image| {
        for partition in image.partitions() {
            let tree = partition.tree();
            let mut lister = Lister {
                filters: &filters,
                rsrc_type: rsrc_type.as_deref(),
            };
            visit_folder(tree, tree.root(), &mut lister);
        }
    });

    Ok(())
}
