//! Data layer: discovery, parsing, AMR merging and export.
//!
//! Architecture:
//! ```text
//!  grid_root/  alpha.xl0  alpha.xl1  grr.xl0 ...
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ scanner  │  group files → Variable { name, level files }
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse BAM text → Level { spacing, time slices }
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  merge   │  finest level wins → MergedDataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  export  │  Arrow batch / CSV / Parquet
//!   └──────────┘
//! ```

pub mod export;
pub mod loader;
pub mod merge;
pub mod model;
pub mod scanner;
