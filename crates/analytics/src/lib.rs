//! Campaign analytics engine — KPI derivation, segment rollups, chi-square
//! significance testing and improvement deltas.
//!
//! Every function here is pure and synchronous: inputs are value types owned
//! by the caller, nothing is cached, and identical inputs always produce
//! identical outputs.

pub mod improvement;
pub mod kpi;
pub mod records;
pub mod segment;
pub mod significance;

pub use improvement::{compute_improvement, compute_improvement_for};
pub use kpi::compute_kpis;
pub use segment::{aggregate_by_segment, summarize};
pub use significance::{
    run_significance_test, ContingencyTable, SignificanceTester, SIGNIFICANCE_LEVEL,
};
