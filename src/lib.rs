//! # spamsieve
//!
//! Spam/ham text classification with a side-by-side model evaluation
//! pipeline.
//!
//! ## Features
//!
//! - English text normalization (lowercasing, punctuation and stop word removal)
//! - TF-IDF vectorization with a vocabulary fitted on training texts only
//! - Supervised classifiers: naive Bayes, decision tree, random forest, linear SVM
//! - Unsupervised isolation forest, scored on the same spamness scale
//! - Accuracy, classification report, confusion matrix, ROC/AUC and a ranked leaderboard
//!
//! ```no_run
//! use std::path::Path;
//!
//! use spamsieve::config::PipelineConfig;
//! use spamsieve::pipeline::Pipeline;
//!
//! # fn main() -> spamsieve::error::Result<()> {
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let outcome = pipeline.run(Path::new("spam.csv"))?;
//! for (rank, record) in outcome.leaderboard.entries().iter().enumerate() {
//!     println!("{}. {} {:.4}", rank + 1, record.model_name, record.accuracy);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod feature;
pub mod ml;
pub mod pipeline;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
