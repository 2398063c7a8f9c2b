//! Normalized holdings: loading, enrichment with prices and asset classes,
//! grouping for drift analysis and aggregated CSV export.
use crate::core::allocation::AllocationLevel;
use crate::core::classify::Classifier;
use crate::core::drift::HoldingRow;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

static CD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CD \d\.\d+%").expect("valid CD pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    Security,
    Treasury,
    #[serde(rename = "Money Market")]
    MoneyMarket,
    Cash,
    #[serde(rename = "CD")]
    Cd,
}

impl SecurityType {
    /// Classifies a position from its brokerage description.
    pub fn infer(description: &str) -> Self {
        if description.starts_with("UNITED STATES TREAS") {
            SecurityType::Treasury
        } else if description.contains("MONEY MARKET") || description.contains("CASH RESERVES") {
            SecurityType::MoneyMarket
        } else if description.starts_with("FDIC-INSURED DEPOSIT SWEEP") {
            SecurityType::Cash
        } else if CD_PATTERN.is_match(description) {
            SecurityType::Cd
        } else {
            SecurityType::Security
        }
    }

    /// Positions whose quantity already is their market value.
    pub fn is_cash_like(&self) -> bool {
        !matches!(self, SecurityType::Security)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityType::Security => "Security",
            SecurityType::Treasury => "Treasury",
            SecurityType::MoneyMarket => "Money Market",
            SecurityType::Cash => "Cash",
            SecurityType::Cd => "CD",
        }
    }
}

impl Display for SecurityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of a normalized holdings CSV, as produced by a brokerage parser.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HoldingRecord {
    pub account_name: String,
    pub ticker: String,
    #[serde(default)]
    pub description: String,
    pub quantity: f64,
    #[serde(default)]
    pub cost_basis: Option<f64>,
}

/// A position valued at current prices and tagged with its asset class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub account_name: String,
    pub ticker: String,
    pub description: String,
    pub quantity: f64,
    pub cost_basis: f64,
    pub security_type: SecurityType,
    pub current_value: f64,
    pub asset_class: String,
    pub core: bool,
}

/// Which field of a [`Holding`] becomes the drift category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupBy {
    Account,
    AssetClass,
    Ticker,
}

impl From<AllocationLevel> for GroupBy {
    fn from(level: AllocationLevel) -> Self {
        match level {
            AllocationLevel::AssetClass => GroupBy::AssetClass,
            AllocationLevel::Ticker => GroupBy::Ticker,
        }
    }
}

impl Holding {
    pub fn key(&self, group_by: GroupBy) -> &str {
        match group_by {
            GroupBy::Account => &self.account_name,
            GroupBy::AssetClass => &self.asset_class,
            GroupBy::Ticker => &self.ticker,
        }
    }
}

pub fn read_holdings_csv<R: Read>(reader: R) -> Result<Vec<HoldingRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    csv_reader
        .deserialize()
        .enumerate()
        .map(|(i, record)| record.with_context(|| format!("Invalid holdings row {}", i + 1)))
        .collect()
}

pub fn read_holdings_file<P: AsRef<Path>>(path: P) -> Result<Vec<HoldingRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open holdings file: {}", path.display()))?;
    let records = read_holdings_csv(file)
        .with_context(|| format!("Failed to parse holdings file: {}", path.display()))?;
    debug!("Loaded {} holdings from {}", records.len(), path.display());
    Ok(records)
}

/// Values every record and tags it with asset class and core status.
///
/// Securities are worth `quantity × price`. Cash-like positions are worth
/// their quantity and are keyed by their security type instead of a ticker.
/// A security without a price is kept at zero value.
pub fn enrich(
    records: &[HoldingRecord],
    prices: &HashMap<String, f64>,
    classifier: &Classifier,
) -> Vec<Holding> {
    records
        .iter()
        .map(|record| {
            let security_type = SecurityType::infer(&record.description);
            let (ticker, current_value) = if security_type.is_cash_like() {
                (security_type.to_string(), record.quantity)
            } else {
                let value = match prices.get(&record.ticker) {
                    Some(price) => record.quantity * price,
                    None => {
                        warn!(ticker = %record.ticker, "No price available, valuing at 0");
                        0.0
                    }
                };
                (record.ticker.clone(), value)
            };

            Holding {
                account_name: record.account_name.clone(),
                asset_class: classifier.asset_class(&ticker),
                core: classifier.is_core(&ticker),
                ticker,
                description: record.description.clone(),
                quantity: record.quantity,
                cost_basis: record.cost_basis.unwrap_or(0.0),
                security_type,
                current_value,
            }
        })
        .collect()
}

/// Tickers that need a market price.
pub fn priced_tickers(records: &[HoldingRecord]) -> Vec<String> {
    let mut tickers: Vec<String> = records
        .iter()
        .filter(|r| !SecurityType::infer(&r.description).is_cash_like())
        .map(|r| r.ticker.clone())
        .collect();
    tickers.sort();
    tickers.dedup();
    tickers
}

pub fn group_by(holdings: &[Holding], group_by: GroupBy) -> Vec<HoldingRow> {
    holdings
        .iter()
        .map(|h| HoldingRow::new(h.key(group_by), h.current_value))
        .collect()
}

/// Portfolio value split by kind of position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PortfolioTotals {
    pub total: f64,
    /// Everything except single stocks.
    pub core: f64,
    pub cds: f64,
    pub treasuries: f64,
    pub money_market: f64,
    pub cash: f64,
}

impl PortfolioTotals {
    pub fn from_holdings(holdings: &[Holding]) -> Self {
        holdings.iter().fold(Self::default(), |mut totals, h| {
            totals.total += h.current_value;
            if h.core {
                totals.core += h.current_value;
            }
            match h.security_type {
                SecurityType::Cd => totals.cds += h.current_value,
                SecurityType::Treasury => totals.treasuries += h.current_value,
                SecurityType::MoneyMarket => totals.money_market += h.current_value,
                SecurityType::Cash => totals.cash += h.current_value,
                SecurityType::Security => {}
            }
            totals
        })
    }
}

/// Quantity, cost basis and value summed over one group of holdings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub quantity: f64,
    pub cost_basis: f64,
    pub current_value: f64,
}

/// Sums holdings per `group_by` key, largest value first.
pub fn aggregate_by(holdings: &[Holding], group_by: GroupBy) -> Vec<GroupTotal> {
    let mut groups: BTreeMap<&str, GroupTotal> = BTreeMap::new();
    for h in holdings {
        let key = h.key(group_by);
        let entry = groups.entry(key).or_insert_with(|| GroupTotal {
            key: key.to_string(),
            ..Default::default()
        });
        entry.quantity += h.quantity;
        entry.cost_basis += h.cost_basis;
        entry.current_value += h.current_value;
    }

    let mut totals: Vec<GroupTotal> = groups.into_values().collect();
    totals.sort_by(|a, b| b.current_value.total_cmp(&a.current_value));
    totals
}

const EXPORT_HEADER: [&str; 6] = [
    "account_name",
    "asset_class",
    "ticker",
    "quantity",
    "cost_basis",
    "current_value",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
struct AggregatedHolding {
    account_name: String,
    asset_class: String,
    ticker: String,
    quantity: f64,
    cost_basis: f64,
    current_value: f64,
}

/// Writes holdings summed per (account, asset class, ticker) as CSV with a
/// header row.
pub fn export_aggregated_csv<W: Write>(holdings: &[Holding], writer: W) -> Result<()> {
    let mut groups: BTreeMap<(&str, &str, &str), AggregatedHolding> = BTreeMap::new();
    for h in holdings {
        let entry = groups
            .entry((h.account_name.as_str(), h.asset_class.as_str(), h.ticker.as_str()))
            .or_insert_with(|| AggregatedHolding {
                account_name: h.account_name.clone(),
                asset_class: h.asset_class.clone(),
                ticker: h.ticker.clone(),
                ..Default::default()
            });
        entry.quantity += h.quantity;
        entry.cost_basis += h.cost_basis;
        entry.current_value += h.current_value;
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    if groups.is_empty() {
        // serialize() only emits the header alongside the first row
        csv_writer
            .write_record(EXPORT_HEADER)
            .context("Failed to write CSV header")?;
    }
    for row in groups.values() {
        csv_writer.serialize(row).context("Failed to write CSV row")?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::taxonomy::{Classification, TaxonomyConfig};

    const HOLDINGS_CSV: &str = "\
account_name,ticker,description,quantity,cost_basis
Brokerage,ITOT,ISHARES CORE S&P TOTAL US STOCK MKT ETF,10,900.50
Brokerage,SPAXX,FIDELITY GOVERNMENT MONEY MARKET,2500,
IRA,ITOT,ISHARES CORE S&P TOTAL US STOCK MKT ETF,5,480
IRA,912797GK7,UNITED STATES TREAS BILLS 0.00000% 06/27/2024,10000,9800
IRA,AAPL,APPLE INC,3,300
IRA,CD123,BANK OF RUST CD 4.500% 01/01/2026,5000,5000
";

    fn classifier() -> Classifier {
        let yaml = r#"
name: Asset Classes
children:
  - name: US Equities
    children:
      - name: ITOT
      - name: AAPL
  - name: US Bonds
    children:
      - name: Treasury
  - name: Short-Term
    children:
      - name: Money Market
      - name: CD
"#;
        let config: TaxonomyConfig = serde_yaml::from_str(yaml).unwrap();
        Classifier::new(Classification::from_config(&config), vec!["AAPL".to_string()])
    }

    fn prices() -> HashMap<String, f64> {
        HashMap::from([("ITOT".to_string(), 100.0), ("AAPL".to_string(), 200.0)])
    }

    #[test]
    fn test_infer_security_type() {
        assert_eq!(
            SecurityType::infer("UNITED STATES TREAS BILLS 0.00000% 06/27/2024"),
            SecurityType::Treasury
        );
        assert_eq!(
            SecurityType::infer("FIDELITY GOVERNMENT MONEY MARKET"),
            SecurityType::MoneyMarket
        );
        assert_eq!(SecurityType::infer("CASH RESERVES"), SecurityType::MoneyMarket);
        assert_eq!(
            SecurityType::infer("FDIC-INSURED DEPOSIT SWEEP"),
            SecurityType::Cash
        );
        assert_eq!(
            SecurityType::infer("BANK OF RUST CD 4.500% 01/01/2026"),
            SecurityType::Cd
        );
        assert_eq!(SecurityType::infer("CD LADDER FUND"), SecurityType::Security);
        assert_eq!(SecurityType::infer("APPLE INC"), SecurityType::Security);
    }

    #[test]
    fn test_read_holdings_csv() {
        let records = read_holdings_csv(HOLDINGS_CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].ticker, "ITOT");
        assert_eq!(records[0].cost_basis, Some(900.5));
        assert_eq!(records[1].cost_basis, None);
        assert_eq!(records[3].quantity, 10000.0);
    }

    #[test]
    fn test_read_holdings_csv_reports_bad_row() {
        let csv = "account_name,ticker,description,quantity,cost_basis\nIRA,ITOT,X,not-a-number,1\n";
        let err = read_holdings_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Invalid holdings row 1"));
    }

    #[test]
    fn test_enrich_values_and_classifies() {
        let records = read_holdings_csv(HOLDINGS_CSV.as_bytes()).unwrap();
        let holdings = enrich(&records, &prices(), &classifier());

        assert_eq!(holdings[0].current_value, 1000.0);
        assert_eq!(holdings[0].asset_class, "US Equities");
        assert!(holdings[0].core);

        assert_eq!(holdings[1].ticker, "Money Market");
        assert_eq!(holdings[1].current_value, 2500.0);
        assert_eq!(holdings[1].asset_class, "Short-Term");
        assert_eq!(holdings[1].cost_basis, 0.0);

        assert_eq!(holdings[3].ticker, "Treasury");
        assert_eq!(holdings[3].asset_class, "US Bonds");

        assert_eq!(holdings[4].current_value, 600.0);
        assert!(!holdings[4].core);

        assert_eq!(holdings[5].ticker, "CD");
        assert_eq!(holdings[5].current_value, 5000.0);
    }

    #[test]
    fn test_enrich_missing_price_and_unknown_class() {
        let records = vec![HoldingRecord {
            account_name: "IRA".to_string(),
            ticker: "ZZZZ".to_string(),
            description: "MYSTERY FUND".to_string(),
            quantity: 10.0,
            cost_basis: None,
        }];
        let holdings = enrich(&records, &HashMap::new(), &classifier());
        assert_eq!(holdings[0].current_value, 0.0);
        assert_eq!(holdings[0].asset_class, "Unknown");
    }

    #[test]
    fn test_priced_tickers_skip_cash_like() {
        let records = read_holdings_csv(HOLDINGS_CSV.as_bytes()).unwrap();
        assert_eq!(priced_tickers(&records), vec!["AAPL", "ITOT"]);
    }

    #[test]
    fn test_group_by() {
        let records = read_holdings_csv(HOLDINGS_CSV.as_bytes()).unwrap();
        let holdings = enrich(&records, &prices(), &classifier());

        let by_account = group_by(&holdings, GroupBy::Account);
        assert_eq!(by_account.len(), 6);
        assert_eq!(by_account[2].category, "IRA");

        let by_class = group_by(&holdings, GroupBy::AssetClass);
        assert_eq!(by_class[0], HoldingRow::new("US Equities", 1000.0));
    }

    #[test]
    fn test_portfolio_totals() {
        let records = read_holdings_csv(HOLDINGS_CSV.as_bytes()).unwrap();
        let totals = PortfolioTotals::from_holdings(&enrich(&records, &prices(), &classifier()));

        assert_eq!(totals.total, 19600.0);
        assert_eq!(totals.core, 19000.0);
        assert_eq!(totals.cds, 5000.0);
        assert_eq!(totals.treasuries, 10000.0);
        assert_eq!(totals.money_market, 2500.0);
        assert_eq!(totals.cash, 0.0);
        assert_eq!(PortfolioTotals::from_holdings(&[]), PortfolioTotals::default());
    }

    #[test]
    fn test_aggregate_by() {
        let records = read_holdings_csv(HOLDINGS_CSV.as_bytes()).unwrap();
        let holdings = enrich(&records, &prices(), &classifier());

        let by_class = aggregate_by(&holdings, GroupBy::AssetClass);
        let keys: Vec<&str> = by_class.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["US Bonds", "Short-Term", "US Equities"]);
        assert_eq!(
            by_class[2],
            GroupTotal {
                key: "US Equities".to_string(),
                quantity: 18.0,
                cost_basis: 1680.5,
                current_value: 2100.0,
            }
        );

        let by_account = aggregate_by(&holdings, GroupBy::Account);
        assert_eq!(by_account.len(), 2);
        assert_eq!(by_account[0].key, "IRA");
        assert_eq!(by_account[0].current_value, 16100.0);
        assert_eq!(by_account[1].current_value, 3500.0);
    }

    #[test]
    fn test_export_aggregated_csv() {
        let records = read_holdings_csv(HOLDINGS_CSV.as_bytes()).unwrap();
        let mut holdings = enrich(&records, &prices(), &classifier());
        // Same position split across two lots
        holdings.push(holdings[0].clone());

        let mut out = Vec::new();
        export_aggregated_csv(&holdings, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "account_name,asset_class,ticker,quantity,cost_basis,current_value"
        );
        assert_eq!(lines[1], "Brokerage,Short-Term,Money Market,2500.0,0.0,2500.0");
        assert_eq!(lines[2], "Brokerage,US Equities,ITOT,20.0,1801.0,2000.0");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_export_empty_holdings_writes_header() {
        let mut out = Vec::new();
        export_aggregated_csv(&[], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "account_name,asset_class,ticker,quantity,cost_basis,current_value\n"
        );
    }
}
