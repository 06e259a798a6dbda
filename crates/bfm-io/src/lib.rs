//! # bfm-io: Network Data Input and Result Output
//!
//! Reads the branch and bus CSV tables, normalizes them to per-unit with
//! [`bfm_core::UnitConverter`], validates the radial topology and writes run
//! artifacts.
//!
//! ```rust,no_run
//! use bfm_io::{LoadOptions, NetworkData};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let data = NetworkData::from_csv(
//!         Path::new("branches.csv"),
//!         Path::new("buses.csv"),
//!         &LoadOptions::default(),
//!     )?;
//!     println!("{} buses, {} defaulted cells", data.network().nodes().len(), data.defaulted_cells());
//!     Ok(())
//! }
//! ```

pub mod exporters;
pub mod network_data;
pub mod profile;
pub mod tables;

pub use exporters::{prepare_output_dir, write_json, write_text, OUTPUT_FILE, RESOLUTION_FILE};
pub use network_data::{LoadConvention, LoadOptions, NetworkData};
pub use profile::{load_profile_csv, profile_from_table};
pub use tables::RawTable;
