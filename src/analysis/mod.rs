//! Analysis layer: regularisation and integrals of merged data.
//!
//! ```text
//!   MergedDataset
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ regularise │  patch |x - s| < radius (clip / extrapolate / floor)
//!   └────────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ integrate  │  adaptive Gauss–Kronrod, value ± error
//!   └────────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │  derived   │  proper distance per time step
//!   └────────────┘
//! ```

pub mod derived;
pub mod integrate;
pub mod regularise;
