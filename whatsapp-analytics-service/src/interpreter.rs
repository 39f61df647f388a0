//! Conversation interpreter — classifies inbound text and renders replies.
//!
//! Turns free-form or menu-driven text into a financial query, consults the
//! per-user selection memory, and formats the report. This is the error
//! boundary for the conversation: every inbound message yields a reply
//! string, never an error.

use crate::db::Db;
use regex::Regex;
use whatsapp_analytics_types::Metric;

pub const WELCOME: &str = "Welcome to Business Analytics 📊\n\nChoose an option:\n1️⃣ EBITDA\n2️⃣ Revenue\n3️⃣ Sales\n4️⃣ Inventory\n\nOr try query directly:\n👉 EBITDA 01/25 to 03/25\n👉 01/25 to 03/25";

pub const APOLOGY: &str = "⚠️ Sorry, I couldn't process your query.";

/// A whole-month date range derived from `MM/YY to MM/YY` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRange {
    pub from_month: String,
    pub from_year: String,
    pub to_month: String,
    pub to_year: String,
}

impl ReportRange {
    /// Inclusive lower bound, day 01 of the from-month.
    pub fn from_date(&self) -> String {
        format!("{}-{}-01", self.from_year, self.from_month)
    }

    /// Inclusive upper bound, day 31 of the to-month. Dates are compared as
    /// ISO strings, so day 31 covers every real month end.
    pub fn to_date(&self) -> String {
        format!("{}-{}-31", self.to_year, self.to_month)
    }

    fn span(&self) -> String {
        format!(
            "{}/{} → {}/{}",
            self.from_month, self.from_year, self.to_month, self.to_year
        )
    }
}

/// Century policy for two-digit years: `YY` always means `20YY`.
pub fn expand_year(yy: u32) -> u32 {
    2000 + yy
}

/// What an inbound message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `EBITDA 01/25 to 03/25` — explicit metric and range.
    MetricRange { metric: Metric, range: ReportRange },
    /// `01/25 to 03/25` — range only; the remembered metric disambiguates.
    BareRange { range: ReportRange },
    /// `1`..`4` — menu pick, remembered for the next range query.
    MenuChoice(Metric),
    Unrecognized,
}

/// Classify a message. First match wins; the metric+range form is checked
/// before the bare range so the metric name is never dropped.
pub fn classify(text: &str) -> Intent {
    let text = text.trim();

    let metric_re =
        Regex::new(r"(?i)(EBITDA|SALES|REVENUE|COGS|INVENTORY)\s+(\d{2})/(\d{2})\s+to\s+(\d{2})/(\d{2})")
            .unwrap();
    if let Some(caps) = metric_re.captures(text) {
        if let Some(metric) = Metric::parse_name(&caps[1]) {
            return Intent::MetricRange {
                metric,
                range: range_from_captures(&caps, 2),
            };
        }
    }

    let range_re = Regex::new(r"(?i)(\d{2})/(\d{2})\s+to\s+(\d{2})/(\d{2})").unwrap();
    if let Some(caps) = range_re.captures(text) {
        return Intent::BareRange {
            range: range_from_captures(&caps, 1),
        };
    }

    if let Some(metric) = Metric::from_menu_key(text) {
        return Intent::MenuChoice(metric);
    }

    Intent::Unrecognized
}

fn range_from_captures(caps: &regex::Captures, first: usize) -> ReportRange {
    ReportRange {
        from_month: caps[first].to_string(),
        from_year: expand_year(caps[first + 1].parse().unwrap()).to_string(),
        to_month: caps[first + 2].to_string(),
        to_year: expand_year(caps[first + 3].parse().unwrap()).to_string(),
    }
}

/// Handle one inbound message and produce the reply text.
///
/// Never fails: store errors are logged and turned into the apology string
/// so the caller always has something to send back.
pub fn handle_message(db: &Db, company_id: i64, sender: &str, text: &str) -> String {
    match try_handle(db, company_id, sender, text) {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("Failed to process message from {}: {}", sender, e);
            APOLOGY.to_string()
        }
    }
}

fn try_handle(db: &Db, company_id: i64, sender: &str, text: &str) -> Result<String, String> {
    match classify(text) {
        Intent::MetricRange { metric, range } => {
            let total = db.sum_metric(metric, company_id, &range.from_date(), &range.to_date())?;
            Ok(render_single(metric, &range, total))
        }
        Intent::BareRange { range } => {
            if let Some(metric) = db.get_selection(sender)? {
                let total =
                    db.sum_metric(metric, company_id, &range.from_date(), &range.to_date())?;
                return Ok(render_single(metric, &range, total));
            }
            let from = range.from_date();
            let to = range.to_date();
            // Fixed order: EBITDA, Revenue, Sales, Inventory.
            let ebitda = db.sum_metric(Metric::Ebitda, company_id, &from, &to)?;
            let revenue = db.sum_metric(Metric::Revenue, company_id, &from, &to)?;
            let sales = db.sum_metric(Metric::Sales, company_id, &from, &to)?;
            let inventory = db.sum_metric(Metric::Inventory, company_id, &from, &to)?;
            Ok(format!(
                "📊 Report ({})\nEBITDA: ₹{}\nRevenue: ₹{}\nSales: ₹{}\nInventory: {}",
                range.span(),
                format_amount(ebitda),
                format_amount(revenue),
                format_amount(sales),
                format_amount(inventory)
            ))
        }
        Intent::MenuChoice(metric) => {
            db.set_selection(sender, metric)?;
            Ok(format!(
                "You selected {} ✅\n\nPlease provide date range (MM/YY to MM/YY)\n👉 Example: 01/25 to 03/25",
                metric.label()
            ))
        }
        Intent::Unrecognized => Ok(WELCOME.to_string()),
    }
}

fn render_single(metric: Metric, range: &ReportRange, total: f64) -> String {
    format!(
        "📊 {} Report ({}): ₹{}",
        metric.label(),
        range.span(),
        format_amount(total)
    )
}

/// Render a total with thousands separators. Whole amounts carry no
/// decimals; zero renders as "0".
pub fn format_amount(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as i64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative && (whole > 0 || frac > 0) {
        out.push('-');
    }
    out.push_str(&grouped);
    if frac > 0 {
        out.push_str(&format!(".{:02}", frac));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Db {
        Db::open(":memory:").expect("in-memory db")
    }

    fn q1_2025() -> ReportRange {
        ReportRange {
            from_month: "01".to_string(),
            from_year: "2025".to_string(),
            to_month: "03".to_string(),
            to_year: "2025".to_string(),
        }
    }

    #[test]
    fn test_expand_year_is_fixed_century() {
        for yy in 0..=99 {
            assert_eq!(expand_year(yy), 2000 + yy);
        }
    }

    #[test]
    fn test_classify_metric_range() {
        let intent = classify("EBITDA 01/25 to 03/25");
        assert_eq!(
            intent,
            Intent::MetricRange {
                metric: Metric::Ebitda,
                range: q1_2025(),
            }
        );
    }

    #[test]
    fn test_metric_range_wins_over_bare_range() {
        // The tail of this input also matches the bare-range pattern; the
        // metric interpretation must win.
        match classify("EBITDA 01/25 to 03/25") {
            Intent::MetricRange { metric, .. } => assert_eq!(metric, Metric::Ebitda),
            other => panic!("Expected MetricRange, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_is_case_and_space_tolerant() {
        assert!(matches!(
            classify("  ebitda 01/25 TO 03/25  "),
            Intent::MetricRange {
                metric: Metric::Ebitda,
                ..
            }
        ));
        assert!(matches!(
            classify("Cogs   02/24  to  04/24"),
            Intent::MetricRange {
                metric: Metric::Cogs,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_bare_range() {
        let intent = classify("01/25 to 03/25");
        assert_eq!(intent, Intent::BareRange { range: q1_2025() });
    }

    #[test]
    fn test_classify_menu_keys() {
        assert_eq!(classify("1"), Intent::MenuChoice(Metric::Ebitda));
        assert_eq!(classify("2"), Intent::MenuChoice(Metric::Revenue));
        assert_eq!(classify("3"), Intent::MenuChoice(Metric::Sales));
        assert_eq!(classify("4"), Intent::MenuChoice(Metric::Inventory));
        assert_eq!(classify(" 2 "), Intent::MenuChoice(Metric::Revenue));
        assert_eq!(classify("5"), Intent::Unrecognized);
    }

    #[test]
    fn test_classify_unrecognized() {
        assert_eq!(classify("hello"), Intent::Unrecognized);
        assert_eq!(classify(""), Intent::Unrecognized);
        assert_eq!(classify("   "), Intent::Unrecognized);
        assert_eq!(classify("01/25 until 03/25"), Intent::Unrecognized);
    }

    #[test]
    fn test_range_dates() {
        let range = q1_2025();
        assert_eq!(range.from_date(), "2025-01-01");
        assert_eq!(range.to_date(), "2025-03-31");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(100.0), "100");
        assert_eq!(format_amount(2050000.0), "2,050,000");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(-1234.0), "-1,234");
    }

    #[test]
    fn test_menu_choice_persists_and_prompts() {
        let db = test_db();
        let reply = handle_message(&db, 100, "15550001111", "1");
        assert!(reply.starts_with("You selected EBITDA"));
        assert!(reply.contains("MM/YY to MM/YY"));
        assert_eq!(db.get_selection("15550001111").unwrap(), Some(Metric::Ebitda));
    }

    #[test]
    fn test_bare_range_without_selection_reports_all_four() {
        let db = test_db();
        let reply = handle_message(&db, 100, "15550001111", "01/25 to 03/25");
        assert_eq!(
            reply,
            "📊 Report (01/2025 → 03/2025)\nEBITDA: ₹2,050,000\nRevenue: ₹3,500,000\nSales: ₹1,400,000\nInventory: 600"
        );
    }

    #[test]
    fn test_bare_range_with_selection_reports_single_metric() {
        let db = test_db();
        db.set_selection("15550001111", Metric::Sales).unwrap();
        let reply = handle_message(&db, 100, "15550001111", "01/25 to 03/25");
        assert_eq!(reply, "📊 SALES Report (01/2025 → 03/2025): ₹1,400,000");
    }

    #[test]
    fn test_explicit_metric_ignores_selection() {
        let db = test_db();
        db.set_selection("15550001111", Metric::Inventory).unwrap();
        let reply = handle_message(&db, 100, "15550001111", "EBITDA 01/25 to 03/25");
        assert_eq!(reply, "📊 EBITDA Report (01/2025 → 03/2025): ₹2,050,000");
    }

    #[test]
    fn test_reselection_changes_the_bare_range_report() {
        let db = test_db();
        handle_message(&db, 100, "15550001111", "1");
        handle_message(&db, 100, "15550001111", "3");
        let reply = handle_message(&db, 100, "15550001111", "01/25 to 03/25");
        assert!(reply.starts_with("📊 SALES Report"));
    }

    #[test]
    fn test_unmatched_text_gets_welcome_verbatim() {
        let db = test_db();
        let reply = handle_message(&db, 100, "15550001111", "hello");
        assert_eq!(reply, WELCOME);
    }

    #[test]
    fn test_empty_range_reports_zero() {
        let db = test_db();
        let reply = handle_message(&db, 100, "15550001111", "EBITDA 01/99 to 03/99");
        assert_eq!(reply, "📊 EBITDA Report (01/2099 → 03/2099): ₹0");
    }

    #[test]
    fn test_selections_do_not_leak_across_users() {
        let db = test_db();
        handle_message(&db, 100, "111", "3");
        let reply = handle_message(&db, 100, "222", "01/25 to 03/25");
        // User 222 never picked a metric, so they get the full overview.
        assert!(reply.starts_with("📊 Report"));
    }
}
