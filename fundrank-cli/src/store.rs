//! Comparison persistence: the CSV audit trail.
//!
//! One row per oracle submission, appended as verdicts arrive so an
//! interrupted run still leaves a loadable file. The format doubles as the
//! input to `fundrank score`, which re-fits without touching the LLM.

use fundrank_core::{ConfigError, IdMap, Item, Ledger, Outcome};

pub const CSV_HEADER: &str = "item_a,item_b,outcome";

/// A persisted verdict: decided/tied, or abandoned after retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedOutcome {
    Decided(Outcome),
    Undecided,
}

impl RecordedOutcome {
    pub fn token(self) -> &'static str {
        match self {
            RecordedOutcome::Decided(Outcome::FirstWins) => "a",
            RecordedOutcome::Decided(Outcome::SecondWins) => "b",
            RecordedOutcome::Decided(Outcome::Tie) => "tie",
            RecordedOutcome::Undecided => "undecided",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "a" => Some(RecordedOutcome::Decided(Outcome::FirstWins)),
            "b" => Some(RecordedOutcome::Decided(Outcome::SecondWins)),
            "tie" => Some(RecordedOutcome::Decided(Outcome::Tie)),
            "undecided" => Some(RecordedOutcome::Undecided),
            _ => None,
        }
    }
}

/// IDs go into the CSV verbatim, so they must not contain delimiters.
pub fn check_id(id: &str) -> Result<(), String> {
    if id.contains(',') || id.contains('\n') || id.contains('\r') {
        return Err(format!("item id {id:?} contains a comma or newline and cannot be saved to CSV"));
    }
    Ok(())
}

pub fn format_row(id_a: &str, id_b: &str, outcome: RecordedOutcome) -> String {
    format!("{id_a},{id_b},{}", outcome.token())
}

/// Parse a comparisons CSV back into rows. The header line is optional.
pub fn load_comparisons(content: &str) -> Result<Vec<(String, String, RecordedOutcome)>, String> {
    let mut rows = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line == CSV_HEADER {
            continue;
        }
        let mut fields = line.splitn(3, ',');
        let (Some(a), Some(b), Some(token)) = (fields.next(), fields.next(), fields.next()) else {
            return Err(format!("line {}: expected {CSV_HEADER:?}, got {line:?}", line_no + 1));
        };
        let Some(outcome) = RecordedOutcome::from_token(token.trim()) else {
            return Err(format!(
                "line {}: unknown outcome {:?} (expected a, b, tie, or undecided)",
                line_no + 1,
                token
            ));
        };
        if a == b {
            return Err(format!("line {}: item {a:?} compared with itself", line_no + 1));
        }
        rows.push((a.to_string(), b.to_string(), outcome));
    }
    Ok(rows)
}

/// Derive the item set from the rows themselves, in first-appearance order.
pub fn items_from_rows(rows: &[(String, String, RecordedOutcome)]) -> Vec<Item> {
    let mut items: Vec<Item> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for (a, b, _) in rows {
        for id in [a, b] {
            if seen.insert(id.clone()) {
                items.push(Item::bare(id.clone()));
            }
        }
    }
    items
}

/// Fold loaded rows into a fresh ledger.
pub fn ledger_from_rows(
    rows: &[(String, String, RecordedOutcome)],
    id_map: &IdMap,
) -> Result<Ledger, ConfigError> {
    let mut ledger = Ledger::new(id_map.len());
    for (a, b, outcome) in rows {
        let idx_a = id_map.index_of(a).ok_or_else(|| ConfigError::UnknownItem(a.clone()))?;
        let idx_b = id_map.index_of(b).ok_or_else(|| ConfigError::UnknownItem(b.clone()))?;
        match outcome {
            RecordedOutcome::Decided(o) => ledger.record(idx_a, idx_b, *o),
            RecordedOutcome::Undecided => ledger.record_undecided(idx_a, idx_b),
        }
    }
    Ok(ledger)
}
