//! Report outputs.
//!
//! # Submodules
//!
//! - [`xlsx`]: one sheet per group with merged source cells
//! - [`jsonl`]: annotated-documents log, one JSON object per line
//! - [`html`]: optional preview with aligned spans highlighted
//!
//! # Output Structure
//!
//! ```text
//! article_keywords.xlsx
//! ├── Marathi   (source | keyword | category)
//! ├── English
//! └── Hindi
//!
//! extracted.jsonl
//! extraction_preview.html   (with --html)
//! ```

pub mod html;
pub mod jsonl;
pub mod xlsx;
