//! Output formatting: terminal table, JSON, and CSV leaderboard.

use fundrank_core::RankingReport;

/// Print non-fatal warnings to stderr (never mixed into the result stream).
pub fn report_warnings(report: &RankingReport) {
    for warning in &report.warnings {
        eprintln!("Warning: {warning}");
    }
}

fn winrate(wins: f64, games: u64) -> f64 {
    if games == 0 {
        0.0
    } else {
        wins / games as f64
    }
}

/// Print results as a formatted terminal table.
pub fn print_table(report: &RankingReport) {
    // Find the widest label for padding
    let name_width = report
        .entries
        .iter()
        .map(|e| e.label.len())
        .max()
        .unwrap_or(4)
        .max(4); // at least "Item"

    println!(
        " # | {:<name_width$} | Strength |  Wins | Games | Winrate | Allocation",
        "Item"
    );
    println!(
        "---|-{}-|----------|-------|-------|---------|-----------",
        "-".repeat(name_width)
    );

    for (i, e) in report.entries.iter().enumerate() {
        println!(
            "{:>2} | {:<name_width$} | {:>8.4} | {:>5.1} | {:>5} | {:>7.3} | {:>10}",
            i + 1,
            e.label,
            e.strength,
            e.wins,
            e.games,
            winrate(e.wins, e.games),
            e.allocation,
        );
    }

    let total_allocated: u64 = report.entries.iter().map(|e| e.allocation).sum();
    println!(
        "\n{} items ranked from {} comparisons; {} units allocated",
        report.entries.len(),
        report.total_comparisons,
        total_allocated,
    );
}

/// Print results as JSON.
pub fn print_json(report: &RankingReport) {
    println!("{}", serde_json::to_string_pretty(report).unwrap());
}

/// Print a machine-readable CSV leaderboard.
///
/// Columns: rank, item, label, strength, rating_log, wins, games, winrate,
/// allocation. `rating_log` is the natural log of the strength (the additive
/// scale people plot); -inf for items pinned to zero.
pub fn print_csv(report: &RankingReport) {
    println!("rank,item,label,strength,rating_log,wins,games,winrate,allocation");
    for (i, e) in report.entries.iter().enumerate() {
        println!(
            "{},{},{},{:.6},{:.3},{:.1},{},{:.3},{}",
            i + 1,
            e.id,
            e.label,
            e.strength,
            e.strength.ln(),
            e.wins,
            e.games,
            winrate(e.wins, e.games),
            e.allocation,
        );
    }
}
