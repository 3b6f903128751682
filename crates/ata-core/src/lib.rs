//! ata-core — Item information, MILP formulation and result extraction for
//! automated test assembly.
//!
//! The pipeline is: [`model::ItemPool`] → [`information::InformationMatrix`]
//! → [`formulation::Formulation`] (built from [`variables`], [`constraints`]
//! and [`objective`]) → a [`traits::SolverAdapter`] → [`extract`] →
//! [`report::AssemblyReport`]. [`engine::Assembler`] runs all of it.

pub mod config;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod extract;
pub mod formulation;
pub mod information;
pub mod lp_format;
pub mod model;
pub mod objective;
pub mod parser;
pub mod report;
pub mod statistics;
pub mod traits;
pub mod variables;

pub use config::AssemblyConfig;
pub use engine::Assembler;
pub use error::AssemblyError;
pub use model::{AbilityLevel, Item, ItemPool};
