use chrono::{NaiveDate, Weekday};
use serde::{Serialize, Serializer};
use std::fmt;
use tabled::Tabled;

use crate::util::{format_int, format_number};

pub const REQUIRED_COLUMNS: [&str; 5] = ["date", "product", "region", "price", "quantity"];

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAY_NAMES[day.num_days_from_monday() as usize]
}

/// Month name for a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month.clamp(1, 12) - 1) as usize]
}

/// One input row as read from the source. Empty fields are `None` and are
/// dropped during cleaning; malformed fields never get this far.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub date: Option<NaiveDate>,
    pub product: Option<String>,
    pub region: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u64>,
}

impl RawTransaction {
    pub fn complete(
        date: NaiveDate,
        product: &str,
        region: &str,
        price: f64,
        quantity: u64,
    ) -> Self {
        Self {
            date: Some(date),
            product: Some(product.to_string()),
            region: Some(region.to_string()),
            price: Some(price),
            quantity: Some(quantity),
        }
    }
}

/// Price bins over `(0, 50], (50, 100], (100, 150], (150, 200]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PriceCategory {
    Low,
    Medium,
    High,
    Premium,
}

impl PriceCategory {
    pub const BREAKPOINTS: [f64; 5] = [0.0, 50.0, 100.0, 150.0, 200.0];

    pub fn from_price(price: f64) -> Option<Self> {
        const BINS: [PriceCategory; 4] = [
            PriceCategory::Low,
            PriceCategory::Medium,
            PriceCategory::High,
            PriceCategory::Premium,
        ];
        bin_index(price, &Self::BREAKPOINTS).map(|i| BINS[i])
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriceCategory::Low => "Low",
            PriceCategory::Medium => "Medium",
            PriceCategory::High => "High",
            PriceCategory::Premium => "Premium",
        }
    }
}

/// Order value bins over `(0, 100], (100, 500], (500, 1000], (1000, inf)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OrderValueCategory {
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl OrderValueCategory {
    pub const BREAKPOINTS: [f64; 5] = [0.0, 100.0, 500.0, 1000.0, f64::INFINITY];

    pub fn from_revenue(revenue: f64) -> Option<Self> {
        const BINS: [OrderValueCategory; 4] = [
            OrderValueCategory::Small,
            OrderValueCategory::Medium,
            OrderValueCategory::Large,
            OrderValueCategory::VeryLarge,
        ];
        bin_index(revenue, &Self::BREAKPOINTS).map(|i| BINS[i])
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderValueCategory::Small => "Small",
            OrderValueCategory::Medium => "Medium",
            OrderValueCategory::Large => "Large",
            OrderValueCategory::VeryLarge => "VeryLarge",
        }
    }
}

// Bins are left-open, right-closed: `(edges[i], edges[i + 1]]`.
fn bin_index(value: f64, edges: &[f64]) -> Option<usize> {
    if !value.is_finite() {
        return None;
    }
    edges
        .windows(2)
        .position(|w| value > w[0] && value <= w[1])
}

pub const UNBINNED: &str = "Unbinned";

/// A transaction plus all derived analytical fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub date: NaiveDate,
    pub product: String,
    pub region: String,
    pub price: f64,
    pub quantity: u64,
    pub revenue: f64,
    pub revenue_ma7: f64,
    pub weekday: Weekday,
    pub month: u32,
    pub iso_year: i32,
    pub week_number: u32,
    pub price_category: Option<PriceCategory>,
    pub order_value_category: Option<OrderValueCategory>,
    pub margin_percent: f64,
    pub cost: f64,
    pub profit: f64,
}

impl EnrichedRecord {
    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }

    pub fn month_name(&self) -> &'static str {
        month_name(self.month)
    }

    pub fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Price => self.price,
            Measure::Quantity => self.quantity as f64,
            Measure::Revenue => self.revenue,
            Measure::Cost => self.cost,
            Measure::Profit => self.profit,
            Measure::MarginPercent => self.margin_percent,
            Measure::RevenueMa7 => self.revenue_ma7,
        }
    }

    pub fn key(&self, dimension: Dimension) -> GroupKey {
        match dimension {
            Dimension::Product => GroupKey::Label(self.product.clone()),
            Dimension::Region => GroupKey::Label(self.region.clone()),
            Dimension::Date => GroupKey::Date(self.date),
            Dimension::Weekday => GroupKey::Weekday(self.weekday.num_days_from_monday()),
            Dimension::Month => GroupKey::Month(self.month),
            Dimension::Week => GroupKey::Week {
                year: self.iso_year,
                week: self.week_number,
            },
            Dimension::PriceCategory => GroupKey::Price(self.price_category),
            Dimension::OrderValueCategory => GroupKey::OrderValue(self.order_value_category),
        }
    }
}

/// The cleaned, enriched table. Built once, then only read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichedTable {
    rows: Vec<EnrichedRecord>,
}

impl EnrichedTable {
    pub fn new(rows: Vec<EnrichedRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EnrichedRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, measure: Measure) -> Vec<f64> {
        self.rows.iter().map(|r| r.measure(measure)).collect()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.date).min()?;
        let max = self.rows.iter().map(|r| r.date).max()?;
        Some((min, max))
    }
}

/// Categorical columns a table can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    Product,
    Region,
    Date,
    Weekday,
    Month,
    Week,
    PriceCategory,
    OrderValueCategory,
}

/// Numeric columns that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Measure {
    Price,
    Quantity,
    Revenue,
    Cost,
    Profit,
    MarginPercent,
    RevenueMa7,
}

impl Measure {
    pub fn name(&self) -> &'static str {
        match self {
            Measure::Price => "price",
            Measure::Quantity => "quantity",
            Measure::Revenue => "revenue",
            Measure::Cost => "cost",
            Measure::Profit => "profit",
            Measure::MarginPercent => "margin_percent",
            Measure::RevenueMa7 => "revenue_ma7",
        }
    }
}

/// A grouping key. Ordering is the natural order of the dimension: lexical
/// for labels, calendar order for dates, weekdays, months and weeks, and bin
/// order for categories (uncategorised rows first).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Label(String),
    Date(NaiveDate),
    Weekday(u32),
    Month(u32),
    Week { year: i32, week: u32 },
    Price(Option<PriceCategory>),
    OrderValue(Option<OrderValueCategory>),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Label(s) => f.write_str(s),
            GroupKey::Date(d) => write!(f, "{}", d),
            GroupKey::Weekday(i) => f.write_str(WEEKDAY_NAMES[*i as usize % 7]),
            GroupKey::Month(m) => f.write_str(month_name(*m)),
            GroupKey::Week { year, week } => write!(f, "{}-W{:02}", year, week),
            GroupKey::Price(c) => f.write_str(c.map_or(UNBINNED, |c| c.label())),
            GroupKey::OrderValue(c) => f.write_str(c.map_or(UNBINNED, |c| c.label())),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn fmt_decimal(n: &f64) -> String {
    format_number(*n, 2)
}

fn fmt_count(n: &usize) -> String {
    format_int(*n)
}

fn fmt_pct(n: &f64) -> String {
    format!("{}%", format_number(*n, 1))
}

fn fmt_weekday(d: &Weekday) -> String {
    weekday_name(*d).to_string()
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ProductSummaryRow {
    #[tabled(rename = "Product")]
    pub product: String,
    #[tabled(rename = "QtyTotal")]
    pub total_quantity: u64,
    #[tabled(rename = "QtyMean", display_with = "fmt_decimal")]
    pub mean_quantity: f64,
    #[tabled(rename = "Sales", display_with = "fmt_count")]
    pub sales_count: usize,
    #[tabled(rename = "RevenueTotal", display_with = "fmt_decimal")]
    pub total_revenue: f64,
    #[tabled(rename = "RevenueMean", display_with = "fmt_decimal")]
    pub mean_revenue: f64,
    #[tabled(rename = "ProfitTotal", display_with = "fmt_decimal")]
    pub total_profit: f64,
    #[tabled(rename = "ProfitMean", display_with = "fmt_decimal")]
    pub mean_profit: f64,
    #[tabled(rename = "PriceMean", display_with = "fmt_decimal")]
    pub mean_price: f64,
    #[tabled(rename = "PriceStd", display_with = "fmt_decimal")]
    pub price_std: f64,
    #[tabled(rename = "MarginMean", display_with = "fmt_decimal")]
    pub mean_margin: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct RegionSummaryRow {
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "RevenueTotal", display_with = "fmt_decimal")]
    pub total_revenue: f64,
    #[tabled(rename = "RevenueMean", display_with = "fmt_decimal")]
    pub mean_revenue: f64,
    #[tabled(rename = "Sales", display_with = "fmt_count")]
    pub sales_count: usize,
    #[tabled(rename = "ProfitTotal", display_with = "fmt_decimal")]
    pub total_profit: f64,
    #[tabled(rename = "ProfitMean", display_with = "fmt_decimal")]
    pub mean_profit: f64,
    #[tabled(rename = "QtyTotal")]
    pub total_quantity: u64,
    #[tabled(rename = "Products", display_with = "fmt_count")]
    pub distinct_products: usize,
    #[tabled(rename = "Share", display_with = "fmt_pct")]
    pub market_share: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DailyRow {
    #[tabled(rename = "Date")]
    pub date: NaiveDate,
    #[tabled(rename = "Revenue", display_with = "fmt_decimal")]
    pub revenue: f64,
    #[tabled(rename = "Quantity")]
    pub quantity: u64,
    #[tabled(rename = "Profit", display_with = "fmt_decimal")]
    pub profit: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct WeeklyRow {
    #[tabled(rename = "Year")]
    pub iso_year: i32,
    #[tabled(rename = "Week")]
    pub week: u32,
    #[tabled(rename = "Revenue", display_with = "fmt_decimal")]
    pub revenue: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct WeekdayRow {
    #[tabled(rename = "Weekday", display_with = "fmt_weekday")]
    pub weekday: Weekday,
    #[tabled(rename = "RevenueTotal", display_with = "fmt_decimal")]
    pub total_revenue: f64,
    #[tabled(rename = "RevenueMean", display_with = "fmt_decimal")]
    pub mean_revenue: f64,
    #[tabled(rename = "Sales", display_with = "fmt_count")]
    pub sales_count: usize,
}

/// A label with a single metric, e.g. mean ticket per product.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct RankedValue {
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Value", display_with = "fmt_decimal")]
    pub value: f64,
}
