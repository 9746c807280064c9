//! Growth chart data preparation and SVG rendering

use crate::types::{AggregatedSeries, Granularity, PeriodKey};
use plotters::prelude::*;
use serde::Serialize;
use skystats_common::{Result, StatsError};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

const FOLLOWERS_COLOR: RGBColor = RGBColor(31, 119, 180);
const FOLLOWS_COLOR: RGBColor = RGBColor(255, 127, 14);

/// One x-axis position of the growth chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    /// Bucket key on the x axis.
    pub period: PeriodKey,
    /// New followers in this period.
    pub followers_change: u64,
    /// New follows in this period.
    pub following_change: u64,
    /// Follower total as of this period.
    pub followers_total: u64,
    /// Following total as of this period.
    pub following_total: u64,
}

/// Merges both series onto one ascending period axis.
///
/// A period present in only one series gets a zero change for the other,
/// whose running total is carried forward from the previous point.
pub fn build_points(followers: &AggregatedSeries, follows: &AggregatedSeries) -> Vec<ChartPoint> {
    let periods: BTreeSet<&PeriodKey> = followers
        .iter_asc()
        .chain(follows.iter_asc())
        .map(|(key, _)| key)
        .collect();

    let mut points: Vec<ChartPoint> = Vec::with_capacity(periods.len());
    let (mut followers_total, mut following_total) = (0, 0);
    for period in periods {
        let follower = followers.get(period.as_str());
        let follow = follows.get(period.as_str());
        followers_total = follower.map_or(followers_total, |s| s.cum_total);
        following_total = follow.map_or(following_total, |s| s.cum_total);

        points.push(ChartPoint {
            period: period.clone(),
            followers_change: follower.map_or(0, |s| s.change),
            following_change: follow.map_or(0, |s| s.change),
            followers_total,
            following_total,
        });
    }
    points
}

/// Adverb used in chart captions ("monthly", "weekly", "daily").
pub fn cadence(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Month => "monthly",
        Granularity::Week => "weekly",
        Granularity::Day => "daily",
    }
}

/// Describes the follower change of the most recent point.
pub fn trend_summary(points: &[ChartPoint], granularity: Granularity) -> String {
    match points.last().map_or(0, |p| p.followers_change) {
        0 => "No change".to_string(),
        n => format!("Followers up by {n} this {granularity}"),
    }
}

/// Output size and caption of a rendered chart.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Caption drawn above the plot.
    pub title: String,
}

impl ChartOptions {
    /// Default size with a caption naming `actor`.
    pub fn for_actor(actor: &str) -> Self {
        Self {
            width: 900,
            height: 480,
            title: format!("Follows & Followers Growth for {actor}"),
        }
    }
}

/// Draws cumulative follower and following totals as an SVG document.
#[instrument(skip(points, options), fields(points = points.len()))]
pub fn render_svg(
    points: &[ChartPoint],
    granularity: Granularity,
    options: &ChartOptions,
) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let x_max = (points.len() as i32).max(1);
        let y_max = points
            .iter()
            .map(|p| p.followers_total.max(p.following_total))
            .max()
            .unwrap_or(0);
        let y_max = y_max + (y_max / 20).max(1);

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 20))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(56)
            .build_cartesian_2d(-1i32..x_max, 0u64..y_max)
            .map_err(chart_error)?;

        let label_for = |index: &i32| -> String {
            usize::try_from(*index)
                .ok()
                .and_then(|i| points.get(i))
                .map(|p| p.period.to_string())
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(points.len().clamp(1, 12))
            .x_label_formatter(&label_for)
            .x_desc(granularity.label())
            .y_desc("Total")
            .draw()
            .map_err(chart_error)?;

        let series: [(&str, RGBColor, fn(&ChartPoint) -> u64); 2] = [
            ("Total Followers", FOLLOWERS_COLOR, |p| p.followers_total),
            ("Total Following", FOLLOWS_COLOR, |p| p.following_total),
        ];
        for (name, color, value) in series {
            let coords: Vec<(i32, u64)> = points
                .iter()
                .enumerate()
                .map(|(i, p)| (i as i32, value(p)))
                .collect();

            chart
                .draw_series(LineSeries::new(coords.iter().copied(), color.stroke_width(2)))
                .map_err(chart_error)?
                .label(name)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
            chart
                .draw_series(coords.iter().map(|&c| Circle::new(c, 3, color.filled())))
                .map_err(chart_error)?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .draw()
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
    }

    debug!("Rendered {} byte SVG chart", svg.len());
    Ok(svg)
}

fn chart_error(e: impl std::fmt::Display) -> StatsError {
    StatsError::chart(e.to_string())
}
