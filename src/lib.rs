//! Extract ThreatSpec threat-modeling annotations from source comments.
//!
//! Security engineers write free-text claims near function declarations
//! using a small fixed grammar (`ThreatSpec X for Y`, `Mitigates A against
//! B with C`, `Exposes A to B with C`, `Does A for B`). This library finds
//! those claims, ties them to the functions they describe and turns them
//! into one structured record per declaration, keyed by function identity
//! and source location.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use threatspec_parser::{aggregator, output, Grammar};
//!
//! let grammar = Grammar::new().unwrap();
//! let records = aggregator::aggregate(&grammar, &[PathBuf::from("main.go")]).unwrap();
//! println!("{}", output::to_csv(&records));
//! ```

pub mod aggregator;
pub mod error;
pub mod grammar;
pub mod language;
pub mod matcher;
pub mod output;
pub mod parser;
pub mod record;

pub use aggregator::{aggregate, process_file};
pub use error::{Error, Result};
pub use grammar::{Grammar, Pattern};
pub use language::{detect_language, is_supported_file, Language};
pub use matcher::{match_comments, AnnotationMatch};
pub use output::{format_report, to_csv, to_json, CSV_HEADER};
pub use parser::{parse_file, parse_source, CommentGroup, CommentLine, Declaration, ParsedSource};
pub use record::{Field, Record};
