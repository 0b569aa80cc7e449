//! # RuSt FOLIO (rsfolio)
//!
//! The `rsfolio` library rebuilds markdown chapters from the positioned, styled
//! text fragments of a typeset book.
//!
//! A page arrives as geometric blocks of lines of fragments. Each block is
//! classified by position and typography (prose, verse, section header,
//! subheading, running header or footnote area), rendered with inline emphasis
//! and footnote markers, and stitched into chapters bounded by page ranges and
//! optional marker phrases. The notes region at the end of a volume is read
//! into a footnote store, page citations inside the notes are turned into
//! chapter links, and every chapter file gets a footnote section that matches
//! its markers.
//!
//! ## Quick Start
//!
//! ### Installation
//! To start using the `rsfolio` library, add it to your project's dependencies in the `Cargo.toml` file:
//!
//! ```bash
//! cargo add rsfolio
//! ```
//!
//! Then, import the necessary modules in your code:
//!
//! ```rust
//! extern crate rsfolio;
//! use rsfolio::runner;
//! ```
//!
//! ## Examples
//!
//! Extracting the first chapter of volume 1 from a fragment dump:
//!
//! ```rust,no_run
//! # use rsfolio::config::LayoutConfig;
//! # use rsfolio::converter::load_document;
//! # use rsfolio::registry::Volume;
//! # use rsfolio::runner::{extract_chapters, write_chapters};
//! # use std::path::Path;
//! # async fn try_main() -> anyhow::Result<()> {
//! let document = load_document(Path::new("lamrim_1.json")).await?;
//! let registry = Volume::One.chapters()?;
//! let outputs = extract_chapters(&document, &registry, &[1], &LayoutConfig::default(), true)?;
//! write_chapters(Path::new("volumes"), Volume::One, &outputs).await?;
//! # Ok(())
//! # }
//! # #[tokio::main]
//! # async fn main() {
//! #    try_main().await.unwrap();
//! # }
//! ```
//!
//! Relinking footnotes of existing chapter files:
//!
//! ```rust,no_run
//! # use rsfolio::converter::load_footnotes;
//! # use rsfolio::runner::link_volumes;
//! # use std::path::Path;
//! # async fn try_main() -> anyhow::Result<()> {
//! let store = load_footnotes(Path::new("footnotes.json")).await?;
//! let summary = link_volumes(Path::new("volumes"), None, &store, false).await?;
//! println!("{} markers, {} linked", summary.total_markers(), summary.total_linked());
//! # Ok(())
//! # }
//! # #[tokio::main]
//! # async fn main() {
//! #    try_main().await.unwrap();
//! # }
//! ```
//!
//! ## Tests
//!
//! The library includes a set of tests to ensure its functionality. To run the tests, use the following command:
//!
//! ```sh
//! cargo test
//! ```

pub mod assembler;
pub mod classifier;
pub mod cleaner;
pub mod config;
pub mod converter;
pub mod footnotes;
pub mod formatter;
pub mod linker;
pub mod models;
pub mod references;
pub mod registry;
pub mod runner;
pub mod test_utils;
