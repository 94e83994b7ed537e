//! Allocation previews, yearly tax reports and loss-harvesting scans.

mod tax_calculator;
mod tax_model;
mod tax_service;


pub use tax_calculator::{build_tax_report, preview_allocation, resolve_harvest_threshold};
pub use tax_model::{
    AllocationPreview, AllocationPreviewRequest, GainSummary, HarvestOpportunity, HarvestReport,
    PreviewedAllocation, TaxReport,
};
pub use tax_service::{TaxService, TaxServiceTrait};
