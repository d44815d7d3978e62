use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-fiscal-year totals for the reports view and HMRC self-assessment
/// figures. Computed by aggregation over the fiscal-year date window, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearSummary {
    /// Fiscal-year label, e.g. `"2024/2025"`.
    pub year_label: String,
    /// Sum of invoiced amounts for jobs dated within the year.
    pub total_income: Decimal,
    /// Sum of receipt/expense amounts within the year.
    pub total_costs: Decimal,
    /// Income minus costs.
    pub total_profit: Decimal,
    /// VAT portion of costs, reclaimable where registered.
    pub total_vat: Decimal,
    /// Sum of mileage deductions within the year.
    pub mileage_deduction: Decimal,
    pub job_count: i64,
}
