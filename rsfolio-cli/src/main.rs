pub mod loggers;

use crate::loggers::init_logger;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rsfolio::config::{FootnoteConfig, LayoutConfig};
use rsfolio::converter::{load_document, load_footnotes, save_footnotes};
use rsfolio::footnotes::extract_footnotes;
use rsfolio::registry::{ReferenceTable, Volume};
use rsfolio::runner::{extract_chapters, fix_footnote_references, link_volumes, write_chapters};
use std::path::PathBuf;

const DEFAULT_FOOTNOTES: &str = "src/content/footnotes.json";
const DEFAULT_VOLUMES_DIR: &str = "src/content/volumes";

#[derive(Parser, Debug)]
#[command(version, about = "Rebuild markdown chapters and footnotes from book fragment dumps", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble chapters of a volume into markdown files.
    Chapters {
        /// Fragment dump of the volume.
        #[arg(required_unless_present = "list")]
        dump: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        volume: u8,
        /// 1-based chapter numbers, comma separated. Default: all.
        #[arg(short, long, value_delimiter = ',')]
        chapters: Vec<usize>,
        /// Print the chapters of the volume and exit.
        #[arg(long)]
        list: bool,
        /// Assemble without writing any file.
        #[arg(long)]
        dry_run: bool,
        #[arg(short, long, default_value = DEFAULT_VOLUMES_DIR)]
        output_dir: PathBuf,
        /// JSON file overriding layout thresholds.
        #[arg(long)]
        layout: Option<PathBuf>,
    },

    /// Read the notes region into a footnote store.
    Footnotes {
        dump: PathBuf,
        #[arg(long, default_value_t = 512)]
        start: usize,
        #[arg(long, default_value_t = 700)]
        end: usize,
        #[arg(short, long, default_value = DEFAULT_FOOTNOTES)]
        output: PathBuf,
    },

    /// Replace page citations in footnotes with chapter links.
    FixRefs {
        #[arg(short, long, default_value = DEFAULT_FOOTNOTES)]
        footnotes: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },

    /// Rebuild the footnote sections of chapter files.
    Link {
        #[arg(short, long, default_value = DEFAULT_FOOTNOTES)]
        footnotes: PathBuf,
        #[arg(short = 'd', long, default_value = DEFAULT_VOLUMES_DIR)]
        volumes_dir: PathBuf,
        /// Process only this volume.
        #[arg(long)]
        volume: Option<u8>,
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose)?;

    match args.command {
        Command::Chapters {
            dump,
            volume,
            chapters,
            list,
            dry_run,
            output_dir,
            layout,
        } => {
            let volume = Volume::from_number(volume)?;
            let registry = volume.chapters()?;
            if list {
                for line in registry.listing() {
                    println!("{}", line);
                }
                return Ok(());
            }
            // reject a bad selection before loading the dump
            registry.select(&chapters)?;

            let dump = dump.ok_or_else(|| anyhow!("a fragment dump is required"))?;
            let layout = match layout {
                Some(path) => LayoutConfig::from_json_file(&path)?,
                None => LayoutConfig::default(),
            };
            let document = load_document(&dump).await?;
            let outputs = extract_chapters(&document, &registry, &chapters, &layout, args.verbose)?;

            if dry_run {
                for output in outputs.iter() {
                    println!("{}: {}", output.file_name, serde_json::to_string(&output.report)?);
                }
                return Ok(());
            }
            for path in write_chapters(&output_dir, volume, &outputs).await? {
                tracing::info!("Saved {}", path.display());
            }
        }
        Command::Footnotes {
            dump,
            start,
            end,
            output,
        } => {
            let document = load_document(&dump).await?;
            let extraction = extract_footnotes(&document, &FootnoteConfig::with_range(start, end))?;
            save_footnotes(&output, &extraction.store).await?;
            tracing::info!(
                "Saved {} footnotes to {}",
                extraction.store.len(),
                output.display()
            );
        }
        Command::FixRefs { footnotes, dry_run } => {
            let table = ReferenceTable::builtin();
            let fix = fix_footnote_references(&footnotes, &table, dry_run).await?;
            if dry_run {
                for (number, replacements) in fix.changed.iter() {
                    println!("[{}] {}", number, serde_json::to_string(replacements)?);
                }
            }
            println!(
                "{} footnotes with page references, {} replacements",
                fix.changed.len(),
                fix.total_replacements()
            );
        }
        Command::Link {
            footnotes,
            volumes_dir,
            volume,
            dry_run,
        } => {
            let volume = volume.map(Volume::from_number).transpose()?;
            let store = load_footnotes(&footnotes).await?;
            let summary = link_volumes(&volumes_dir, volume, &store, dry_run).await?;
            println!(
                "{} markers found, {} footnotes linked",
                summary.total_markers(),
                summary.total_linked()
            );
        }
    }

    Ok(())
}
