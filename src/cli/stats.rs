use std::sync::Arc;

use ansi_term::Style;
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use clap::Parser;

use crate::{
    daemon::storage::{
        entities::{AggregatedUsage, Insights, TimeRange},
        kv::KeyValueStore,
        usage::UsageStore,
    },
    utils::{
        clock::DefaultClock,
        percentage::{duration_percentage, Percentage},
        time::format_duration,
    },
};

#[derive(Debug, Parser)]
pub struct StatsCommand {
    #[arg(short, long, value_enum, default_value_t = TimeRange::Today, help = "Days to sum up")]
    range: TimeRange,
    #[arg(short = 'p', long = "percentage", help = "Hide sites below this share of the total", default_value_t = Percentage::new_opt(0.).unwrap())]
    min_percentage: Percentage,
    #[arg(short, long, help = "Also show the most active day and the daily average")]
    insights: bool,
}

#[derive(Debug, Parser)]
pub struct SiteCommand {
    #[arg(help = "Domain to show, for example example.com")]
    domain: String,
    #[arg(short, long, value_enum, default_value_t = TimeRange::Month, help = "Days to show")]
    range: TimeRange,
}

/// Prints per site totals of a range, longest first.
pub async fn process_stats_command(
    store: impl KeyValueStore,
    StatsCommand {
        range,
        min_percentage,
        insights,
    }: StatsCommand,
) -> Result<()> {
    let usage = UsageStore::new(store, Arc::new(DefaultClock));
    let aggregated = usage.aggregate(range).await?;

    println!(
        "{}",
        Style::new()
            .bold()
            .paint(format!("Total\t{}", format_duration(aggregated.total_time)))
    );
    for line in usage_lines(&aggregated, min_percentage) {
        println!("{line}");
    }

    if insights {
        println!();
        for line in insight_lines(&usage.insights(range).await?) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn process_site_command(
    store: impl KeyValueStore,
    SiteCommand { domain, range }: SiteCommand,
) -> Result<()> {
    let usage = UsageStore::new(store, Arc::new(DefaultClock));
    let history = usage.domain_history(&domain, range).await?;
    let total = history
        .iter()
        .fold(Duration::zero(), |total, (_, time)| total + *time);

    println!(
        "{}",
        Style::new()
            .bold()
            .paint(format!("{domain}\t{}", format_duration(total)))
    );
    for line in history_lines(&history) {
        println!("{line}");
    }
    Ok(())
}

fn usage_lines(aggregated: &AggregatedUsage, min_percentage: Percentage) -> Vec<String> {
    aggregated
        .by_domain
        .iter()
        .map(|entry| (entry, duration_percentage(entry.time, aggregated.total_time)))
        .filter(|(_, share)| *share >= min_percentage)
        .map(|(entry, share)| {
            format!(
                "{}%\t{}\t{}",
                *share as i32,
                format_duration(entry.time),
                entry.domain
            )
        })
        .collect()
}

fn insight_lines(insights: &Insights) -> Vec<String> {
    let mut lines = vec![];
    if let Some((date, time)) = insights.most_active_day {
        lines.push(format!(
            "Most active day\t{}\t{}",
            date.format("%Y-%m-%d"),
            format_duration(time)
        ));
    }
    lines.push(format!(
        "Daily average\t{}",
        format_duration(insights.daily_average)
    ));
    lines
}

fn history_lines(history: &[(NaiveDate, Duration)]) -> Vec<String> {
    history
        .iter()
        .map(|(date, time)| format!("{}\t{}", date.format("%Y-%m-%d"), format_duration(*time)))
        .collect()
}
