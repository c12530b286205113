//! # localturk
//!
//! Mechanical Turk-style labeling on your own machine.
//!
//! Tasks are rows of a CSV file. Each worker is shown one task at a time
//! through an HTML template; submitted forms are appended to an output CSV.
//!
//! ## Task Flow
//! 1. Read the task table and the output table
//! 2. Build a [`CompletionIndex`] from the output rows
//! 3. Shuffle the tasks and serve the first one no output row covers
//! 4. Append the submitted form and check it added new columns
//!
//! A task is covered when some output row contains all of its fields (after
//! whitespace normalization), so output rows may carry extra answer columns.
//! Progress lives only in the output file: restarting the server, or editing
//! the file by hand, is reflected on the next request.
//!
//! ## Modules
//! - `record`: rows and value normalization
//! - `store`: CSV-backed table storage
//! - `completion`: completion lookups over output rows
//! - `selector`: randomized next-task selection
//! - `integrity`: submission sanity check and the one-shot flash message
//! - `turk`: the service tying the above together
//! - `render`: HTML pages and template substitution
//! - `api`: HTTP routes

pub mod api;
pub mod completion;
pub mod config;
pub mod integrity;
pub mod record;
pub mod render;
pub mod selector;
pub mod store;
pub mod turk;
pub mod util;

pub use completion::CompletionIndex;
pub use config::Config;
pub use record::Record;
pub use selector::{RandomOrder, TaskOrder, TaskSelector, TaskStats};
pub use store::{CsvStore, StoreError, TabularStore};
pub use turk::{LocalTurk, TurkError};
