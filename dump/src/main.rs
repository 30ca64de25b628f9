//! A CLI tool for inspecting the contents of a DICOM file
//! by printing its element tree in a human readable format.
use clap::Parser;
use dcmtree_core::Tag;
use dcmtree_dump::{ColorMode, DumpOptions};
use dcmtree_object::OpenFileOptions;
use snafu::{Report, ResultExt, Whatever};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{error, warn, Level};

/// Exit code for when any of the files could not be read or printed.
const ERROR_FILE: i32 = 1;

/// Dump the contents of DICOM files
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// The DICOM file(s) to read
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Do not read pixel data values
    #[arg(long = "header-only")]
    header_only: bool,
    /// The maximum number of nested sequence levels
    #[arg(long = "max-depth")]
    max_depth: Option<usize>,
    /// Print only the first element with this tag,
    /// searching nested sequences too
    #[arg(long = "find", value_name = "GGGG,EEEE")]
    find: Option<Tag>,
    /// The width of the display
    /// (default is to check automatically)
    #[arg(short = 'w', long = "width")]
    width: Option<u32>,
    /// Print all values to the end
    #[arg(long = "no-limit")]
    no_limit: bool,
    /// The color mode
    #[arg(long = "color", default_value = "auto")]
    color: ColorMode,
    /// Print more information while reading
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let App {
        files: filenames,
        header_only,
        max_depth,
        find,
        width,
        no_limit,
        color,
        verbose,
    } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
            .with_writer(std::io::stderr)
            .finish(),
    )
    .whatever_context("Could not set up global logging subscriber")
    .unwrap_or_else(|e: Whatever| {
        eprintln!("[ERROR] {}", Report::from_error(e));
    });

    let mut open_options = OpenFileOptions::new().header_only(header_only);
    if let Some(max_depth) = max_depth {
        open_options = open_options.max_depth(max_depth);
    }

    let mut options = DumpOptions::new();
    options.no_limit(no_limit).color_mode(color);
    if let Some(width) = width {
        options.width(width);
    }

    let mut errors = 0;
    for filename in &filenames {
        println!("{}: ", filename.display());
        let obj = match open_options.clone().open_file(filename) {
            Ok(obj) => obj,
            Err(e) => {
                error!("{}", Report::from_error(e));
                errors += 1;
                continue;
            }
        };

        let result = match find {
            Some(tag) => match obj.find_tag(tag) {
                Some(element) => options.dump_element(element),
                None => {
                    warn!("No element {} in {}", tag, filename.display());
                    Ok(())
                }
            },
            None => options.dump_file(&obj),
        };

        if let Err(e) = result {
            if e.kind() == ErrorKind::BrokenPipe {
                // the reader went away, nothing left to print
                break;
            }
            error!("{}", Report::from_error(e));
            errors += 1;
        }
    }

    if errors > 0 {
        std::process::exit(ERROR_FILE);
    }
}

#[cfg(test)]
mod tests {
    use crate::App;
    use clap::{CommandFactory, Parser};
    use dcmtree_core::Tag;

    #[test]
    fn verify_cli() {
        App::command().debug_assert();
    }

    #[test]
    fn parse_find_tag() {
        let app = App::parse_from(["dcmtree-dump", "--find", "0010,0010", "file.dcm"]);
        assert_eq!(app.find, Some(Tag(0x0010, 0x0010)));
        assert!(App::try_parse_from(["dcmtree-dump", "--find", "nope", "file.dcm"]).is_err());
    }
}
