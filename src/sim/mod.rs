//! In-memory hosts
//!
//! Browser, page and storage stand-ins used by the tests and the
//! `simulate` command.

mod browser;
mod document;
mod harness;

pub use browser::SimBrowser;
pub use document::{Element, ElementKind, MemoryDocument, RootSnapshot};
pub use harness::{run_scenario, LocalCoordinatorLink, ScenarioReport, Simulation, TabReport};
