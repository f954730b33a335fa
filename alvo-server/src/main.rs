use std::env;
use std::path::Path;
use std::process;
use std::time::Instant;

use chrono::Utc;
use log::info;
use serde::Serialize;

use alvo_bridge::{DashboardResponse, DrillDownResponse, Session};
use alvo_engine::{FilterState, PeriodSelection, Severity};

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ReportJson {
    generated_at: String,
    snapshot: String,
    compute_ms: u128,
    dashboard: DashboardResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    drill_down: Option<DrillDownResponse>,
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

struct Args {
    snapshot: String,
    filter: FilterState,
    drill: Option<PeriodSelection>,
    json_output: bool,
}

fn usage() -> ! {
    eprintln!("Usage: alvo-server <snapshot.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --client N        Filter to one client id");
    eprintln!("  --manufacturer N  Filter to one manufacturer id");
    eprintln!("  --category N      Filter to one category id");
    eprintln!("  --store N         Filter to one store id");
    eprintln!("  --severity N      Decline bucket 0-3 (mild..collapse)");
    eprintln!("  --months LIST     Comma-separated month indices, e.g. 12,13,14");
    eprintln!("  --drill LIST      Also compute a drill-down for these month indices");
    eprintln!("  --json            Output as JSON instead of formatted text");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  alvo-server fixtures/snapshot.json");
    eprintln!("  alvo-server fixtures/snapshot.json --store 2 --severity 1 --json");
    process::exit(1);
}

fn parse_id(flag: &str, value: Option<&String>) -> u32 {
    match value.and_then(|v| v.parse().ok()) {
        Some(id) => id,
        None => {
            eprintln!("Error: {} requires a numeric id", flag);
            process::exit(1);
        }
    }
}

fn parse_months(flag: &str, value: Option<&String>) -> Vec<usize> {
    let Some(raw) = value else {
        eprintln!("Error: {} requires a comma-separated list of month indices", flag);
        process::exit(1);
    };
    raw.split(',')
        .map(|part| {
            part.trim().parse().unwrap_or_else(|_| {
                eprintln!("Error: {} got a non-numeric month index {:?}", flag, part);
                process::exit(1);
            })
        })
        .collect()
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let snapshot = args[1].clone();
    let mut filter = FilterState::default();
    let mut drill = None;
    let mut json_output = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--client" => {
                filter.client = Some(parse_id("--client", args.get(i + 1)));
                i += 2;
            }
            "--manufacturer" => {
                filter.manufacturer = Some(parse_id("--manufacturer", args.get(i + 1)));
                i += 2;
            }
            "--category" => {
                filter.category = Some(parse_id("--category", args.get(i + 1)));
                i += 2;
            }
            "--store" => {
                filter.store = Some(parse_id("--store", args.get(i + 1)));
                i += 2;
            }
            "--severity" => {
                let index = parse_id("--severity", args.get(i + 1));
                filter.severity = u8::try_from(index).ok().and_then(Severity::from_index);
                if filter.severity.is_none() {
                    eprintln!("Error: --severity must be 0, 1, 2 or 3");
                    process::exit(1);
                }
                i += 2;
            }
            "--months" => {
                filter.period = PeriodSelection::months(parse_months("--months", args.get(i + 1)));
                i += 2;
            }
            "--drill" => {
                drill = Some(PeriodSelection::months(parse_months("--drill", args.get(i + 1))));
                i += 2;
            }
            "--json" => {
                json_output = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
            }
        }
    }

    Args {
        snapshot,
        filter,
        drill,
        json_output,
    }
}

// ---------------------------------------------------------------------------
// Human-readable output
// ---------------------------------------------------------------------------

/// Format a monetary amount with thousands separators and two decimals.
/// Works on the formatted decimal string, so magnitudes past integer
/// range stay exact.
fn format_money(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let formatted = format!("{:.2}", amount.abs());
    let (whole, frac) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let grouped: String = grouped.chars().rev().collect();
    format!("{}{}.{}", sign, grouped, frac)
}

fn print_human(response: &DashboardResponse, drill: Option<&DrillDownResponse>, compute_ms: u128) {
    println!();
    println!("  Alvo sales dashboard");
    if let Some(updated) = &response.updated_at {
        println!("  snapshot updated {}", updated);
    }
    println!();

    if response.no_matching_rows {
        println!("  No transactions match the active filters.");
        println!();
        return;
    }

    for window in [&response.window_a, &response.window_b] {
        println!(
            "  {:24} R$ {:>14}  {:>8.0} sales  {:>6.1} clients  ({} months)",
            window.label,
            format_money(window.revenue),
            window.transactions,
            window.clients,
            window.months,
        );
    }
    println!(
        "  {:24} {:>+.1}% revenue vs {}",
        "", response.revenue_change_pct, response.chart_label_a
    );
    println!();

    if !response.top_manufacturers.is_empty() {
        println!("  Top manufacturers ({}):", response.year_label);
        for (i, entry) in response.top_manufacturers.iter().take(10).enumerate() {
            let arrow = if entry.rising { "+" } else { "-" };
            println!(
                "  {:>3}. {:32} R$ {:>14}  {}",
                i + 1,
                entry.name,
                format_money(entry.baseline + entry.current),
                arrow,
            );
        }
        println!();
    }

    if !response.top_products.is_empty() {
        println!("  Top products in category:");
        for (i, entry) in response.top_products.iter().take(10).enumerate() {
            println!(
                "  {:>3}. {:32} R$ {:>14}",
                i + 1,
                entry.name,
                format_money(entry.total),
            );
        }
        println!();
    }

    if let Some(drill) = drill {
        println!(
            "  Drill-down: {} vs {}",
            drill.window_a.label, drill.window_b.label
        );
        println!(
            "    {:22} R$ {:>14}",
            drill.window_a.label,
            format_money(drill.window_a.revenue)
        );
        println!(
            "    {:22} R$ {:>14}",
            drill.window_b.label,
            format_money(drill.window_b.revenue)
        );
        println!();
    }

    println!("  Computed in {}ms", compute_ms);
    println!();
}


// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    let args = parse_args();

    let mut session = Session::new();
    let load_start = Instant::now();
    if let Err(err) = session.load_snapshot(Path::new(&args.snapshot)) {
        eprintln!("Error loading snapshot: {}", err);
        process::exit(1);
    }
    info!(
        "snapshot {} loaded in {}ms",
        args.snapshot,
        load_start.elapsed().as_millis()
    );

    let compute_start = Instant::now();
    let dashboard = match session.dashboard(&args.filter) {
        Ok(response) => response,
        Err(err) => {
            eprintln!("Error computing dashboard: {}", err);
            process::exit(1);
        }
    };
    let drill_down = match &args.drill {
        Some(selection) => match session.drill_down(&args.filter, selection) {
            Ok(response) => Some(response),
            Err(err) => {
                eprintln!("Error computing drill-down: {}", err);
                process::exit(1);
            }
        },
        None => None,
    };
    let compute_ms = compute_start.elapsed().as_millis();

    if args.json_output {
        let report = ReportJson {
            generated_at: Utc::now().to_rfc3339(),
            snapshot: args.snapshot,
            compute_ms,
            dashboard,
            drill_down,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(err) => {
                eprintln!("Error serializing report: {}", err);
                process::exit(1);
            }
        }
    } else {
        print_human(&dashboard, drill_down.as_ref(), compute_ms);
    }
}
