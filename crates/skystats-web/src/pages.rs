//! Server-rendered HTML pages.

use chrono::{DateTime, Utc};
use skystats_common::{escape_html, format_timestamp, truncate_string};
use skystats_stats::chart::{build_points, cadence, render_svg, trend_summary, ChartOptions};
use skystats_stats::{AggregatedSeries, Granularity, LookupFailure, StatsReport};
use std::fmt::Write;
use tracing::warn;

/// Shown above the chart when the data came from the cache.
pub const CACHED_NOTICE: &str = "Showing cached data (updated within the last hour)";

const STYLE: &str = "body{font-family:sans-serif;max-width:56rem;margin:0 auto;padding:1rem;color:#111}\
header{display:flex;justify-content:space-between;align-items:center}\
.panel{border:2px solid #ccc;border-radius:.5rem;padding:1.5rem;margin:1rem 0;text-align:center}\
.error{background:#fef2f2;border-color:#fecaca}.warning{background:#fefce8;border-color:#fef08a}\
.grid{display:grid;grid-template-columns:1fr 1fr;gap:1.5rem}\
table{width:100%;border-collapse:collapse}td{padding:.25rem 0}td.num{text-align:right}\
.muted{color:#666;font-size:.9rem}nav a{margin-right:.75rem}img{max-width:100%}";

fn layout(title: &str, description: &str, likes: Option<u64>, body: &str) -> String {
    let likes = likes.map_or_else(String::new, |count| {
        format!(
            r#"<form method="post" action="/like"><button type="submit">&#9829; {count}</button></form>"#
        )
    });
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<meta name="description" content="{description}">
<style>{STYLE}</style>
</head>
<body>
<header><a href="/"><strong>Bluesky Stats</strong></a>{likes}</header>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
        description = escape_html(description),
    )
}

fn search_form(value: &str) -> String {
    format!(
        r#"<form method="get" action="/search">
<label>@<input type="text" name="handle" value="{}" placeholder="Enter a Bluesky handle" required></label>
<button type="submit">View Stats</button>
</form>"#,
        escape_html(value)
    )
}

/// Landing page with the search form.
pub fn landing_page(likes: Option<u64>) -> String {
    let body = format!(
        "<h1>Bluesky Stats</h1>\n<h2>Follower and Following Stats</h2>\n{}",
        search_form("")
    );
    layout(
        "Bluesky Stats",
        "Welcome to Bluesky Stats where you can get follower and following stats for any Bluesky actor.",
        likes,
        &body,
    )
}

/// Red panel for a failed lookup.
pub fn error_panel(message: &str) -> String {
    format!(
        r#"<div class="panel error"><h2>Oops! Something went wrong</h2><p>{}</p></div>"#,
        escape_html(message)
    )
}

/// Yellow panel for an account without any dated records.
pub fn no_data_panel() -> String {
    r#"<div class="panel warning"><h2>No Data Available</h2><p>This account doesn't have any follower or following history yet.</p></div>"#
        .to_string()
}

fn period_nav(actor: &str, current: Granularity) -> String {
    let mut nav = String::from("<nav>");
    for granularity in Granularity::ALL {
        if granularity == current {
            let _ = write!(nav, "<strong>{}</strong> ", granularity.label());
        } else {
            let _ = write!(
                nav,
                r#"<a href="/{}?period={}">{}</a>"#,
                escape_html(actor),
                granularity,
                granularity.label()
            );
        }
    }
    nav.push_str("</nav>");
    nav
}

/// Newest-first table of one series.
pub fn stats_table(title: &str, series: &AggregatedSeries) -> String {
    let mut table = format!("<section><h3>{}</h3><table>", escape_html(title));
    for (period, stats) in series.iter_desc() {
        let _ = write!(
            table,
            r#"<tr><td>{}</td><td class="num">+{}</td><td class="num muted">Total: {}</td></tr>"#,
            period, stats.change, stats.cum_total
        );
    }
    table.push_str("</table></section>");
    table
}

fn chart_section(report: &StatsReport, granularity: Granularity) -> String {
    let points = build_points(
        report.follower_stats.get(granularity),
        report.follow_stats.get(granularity),
    );
    let actor = escape_html(&report.actor);
    let chart_url = format!("/{actor}/chart.svg?period={granularity}");
    // Rendered from this report; the chart route is only linked.
    let figure = match render_svg(&points, granularity, &ChartOptions::for_actor(&report.actor)) {
        Ok(svg) => svg,
        Err(e) => {
            warn!("Inline chart for {} failed: {}", report.actor, e);
            format!(
                r#"<img src="{chart_url}" alt="Cumulative followers and following for {actor}" width="900" height="480">"#
            )
        }
    };
    format!(
        r#"<section>
<h2>Follows &amp; Followers Growth for {actor}</h2>
<p class="muted">{label} Growth Trend</p>
<figure>{figure}</figure>
<p><strong>{trend}</strong></p>
<p class="muted">Showing {cadence} cumulative totals over time. <a href="{chart_url}">Download SVG</a></p>
</section>"#,
        label = granularity.label(),
        trend = trend_summary(&points, granularity),
        cadence = cadence(granularity),
    )
}

fn fetched_at_line(report: &StatsReport) -> String {
    let secs = report.fetched_at.floor() as i64;
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|at| format!(r#"<p class="muted">Fetched {}</p>"#, format_timestamp(at)))
        .unwrap_or_default()
}

/// Stats page body for a lookup outcome.
pub fn stats_page(
    requested: &str,
    outcome: &Result<StatsReport, LookupFailure>,
    granularity: Granularity,
    likes: Option<u64>,
) -> String {
    let actor = match outcome {
        Ok(report) => report.actor.as_str(),
        Err(_) => requested,
    };
    let display_actor = truncate_string(actor, 64);

    let mut body = search_form(actor);
    match outcome {
        Err(failure) => body.push_str(&error_panel(&failure.message)),
        Ok(report) => {
            let _ = write!(
                body,
                "<h1>Follower Stats for<br><small>{}</small></h1>",
                escape_html(&display_actor)
            );
            if report.is_empty() {
                body.push_str(&no_data_panel());
            } else {
                if report.cached {
                    let _ = write!(body, r#"<p class="muted">{CACHED_NOTICE}</p>"#);
                }
                body.push_str(&period_nav(&report.actor, granularity));
                body.push_str(&chart_section(report, granularity));
                body.push_str(r#"<div class="grid">"#);
                body.push_str(&stats_table(
                    &format!("Followers by {}", granularity.label()),
                    report.follower_stats.get(granularity),
                ));
                body.push_str(&stats_table(
                    &format!("Following by {}", granularity.label()),
                    report.follow_stats.get(granularity),
                ));
                body.push_str("</div>");
                body.push_str(&fetched_at_line(report));
            }
        }
    }

    layout(
        &format!("{display_actor} - Bluesky Stats"),
        &format!("Follower and following stats for {display_actor} on Bluesky."),
        likes,
        &body,
    )
}
