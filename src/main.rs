// Driver: run the whole analysis over one CSV and print previews of every
// result table to the console.
//
// Usage: sales_insights [data.csv] [config.json]
use sales_insights::output::{preview_table_rows, render_correlation, render_pivot, to_json};
use sales_insights::util::{format_int, format_money, format_number};
use sales_insights::{analyze_file, AnalysisConfig, AnalysisRun};
use std::process::ExitCode;

const DEFAULT_INPUT: &str = "sales.csv";

fn print_growth(label: &str, growth: Option<f64>) {
    match growth {
        Some(g) => println!("{}: {}%", label, format_number(g, 2)),
        None => println!("{}: n/a", label),
    }
}

fn print_report(run: &AnalysisRun, config: &AnalysisConfig) {
    let report = &run.report;
    let top = config.top_n_preview;

    println!(
        "Processing dataset... ({} rows loaded, {} duplicates and {} incomplete rows removed)\n",
        format_int(run.cleaning.raw_rows),
        format_int(run.cleaning.duplicates_removed),
        format_int(run.cleaning.incomplete_removed)
    );

    let m = &report.metrics;
    println!("General Metrics");
    println!("Period: {} to {}", m.period_start, m.period_end);
    match to_json(m) {
        Ok(json) => println!("{}\n", json),
        Err(e) => eprintln!("Render error: {}", e),
    }
    if let Some(best) = &report.best_sale {
        println!(
            "Best sale: {} in {} on {} ({})\n",
            best.product,
            best.region,
            best.date,
            format_money(best.revenue)
        );
    }

    println!("Product Performance\n");
    println!("{}\n", preview_table_rows(&report.products, top));
    println!("Region Performance\n");
    println!("{}\n", preview_table_rows(&report.regions, top));

    println!("Product x Region (Revenue)\n");
    println!("{}\n", render_pivot(&report.product_by_region));
    println!("Region x Price Category (Revenue)\n");
    println!("{}\n", render_pivot(&report.region_by_price_category));

    let t = &report.temporal;
    println!("Temporal Analysis");
    print_growth("Mean daily growth", t.day_over_day_growth);
    println!("Mean daily revenue: {}", format_money(t.mean_daily_revenue));
    println!("Best day: {} ({})", t.best_day.date, format_money(t.best_day.revenue));
    println!("Worst day: {} ({})\n", t.worst_day.date, format_money(t.worst_day.revenue));
    println!("{}\n", preview_table_rows(&t.weekday, 7));

    let p = &report.patterns;
    println!("Patterns\n");
    println!("Mean ticket by product\n{}\n", preview_table_rows(&p.ticket_by_product, top));
    println!("Mean margin by region\n{}\n", preview_table_rows(&p.margin_by_region, top));
    print_growth("Mean weekly growth", p.week_over_week_growth);
    println!(
        "Revenue outliers: {} (fences {} .. {})\n",
        format_int(p.outliers.count),
        format_number(p.outliers.lower_fence, 2),
        format_number(p.outliers.upper_fence, 2)
    );
    println!("Correlation Matrix\n{}\n", render_correlation(&p.correlation));

    println!("Key Insights");
    for insight in &report.insights {
        println!("- {}", insight);
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let input = args.first().map(String::as_str).unwrap_or(DEFAULT_INPUT);
    let config = match args.get(1) {
        Some(path) => match AnalysisConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                return ExitCode::from(2);
            }
        },
        None => AnalysisConfig::default(),
    };

    match analyze_file(input, &config) {
        Ok(run) => {
            print_report(&run, &config);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
