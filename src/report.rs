//! Text rendering of an [`AnalysisReport`] for the chat terminal.

use std::fmt::Write;

use crate::analysis::AnalysisReport;
use crate::model::ReportMode;

const RULE: &str = "⸻";
const MISSING: &str = "n/a";

pub fn render(report: &AnalysisReport, mode: ReportMode) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, report, mode);
    out
}

fn write_report(out: &mut String, report: &AnalysisReport, mode: ReportMode) -> std::fmt::Result {
    let snap = &report.snapshot;
    let ind = &report.indicators;
    let full = mode == ReportMode::Full;

    writeln!(out, "{RULE}")?;
    writeln!(out, "🪙 Overview — {} ({})", snap.name, snap.symbol)?;
    writeln!(
        out,
        "Price: ${} | Market Cap: ${} | 24h Vol: ${}",
        format_price(snap.price),
        human_format(snap.market_cap),
        human_format(snap.volume_24h)
    )?;
    writeln!(
        out,
        "Supply: {} / {}",
        snap.circulating_supply.map_or(MISSING.into(), human_format),
        snap.total_supply.map_or("∞".into(), human_format)
    )?;
    if full && !snap.utility_description.is_empty() {
        writeln!(out, "Utility: {}…", snap.utility_description)?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "📈 Technical Analysis ({} samples to {})",
        report.points,
        report.as_of.format("%Y-%m-%d %H:%M UTC")
    )?;

    if full {
        writeln!(
            out,
            "SMA({}): {}",
            period_labels(ind.sma.keys()),
            value_list(ind.sma.values())
        )?;
        writeln!(
            out,
            "EMA({}): {}",
            period_labels(ind.ema.keys()),
            value_list(ind.ema.values())
        )?;
    }

    match &ind.rsi {
        Some(rsi) => writeln!(
            out,
            "RSI({}): {:.2} ({})",
            rsi.period,
            rsi.value,
            rsi_zone(rsi.value)
        )?,
        None => writeln!(out, "RSI: {MISSING}")?,
    }

    match &ind.macd {
        Some(macd) if full => writeln!(
            out,
            "MACD({},{},{}): {:.2} | Signal: {} | Histogram: {}",
            macd.fast_period,
            macd.slow_period,
            macd.signal_period,
            macd.macd,
            fixed(macd.signal),
            fixed(macd.histogram)
        )?,
        Some(macd) => writeln!(out, "MACD: {:.2} | Signal: {}", macd.macd, fixed(macd.signal))?,
        None => writeln!(out, "MACD: {MISSING}")?,
    }

    if full {
        match &ind.bollinger {
            Some(bb) => writeln!(
                out,
                "Bollinger Bands ({}, {:.1}): Lower {:.2} | Middle {:.2} | Upper {:.2}",
                bb.period, bb.std_dev_multiplier, bb.lower, bb.middle, bb.upper
            )?,
            None => writeln!(out, "Bollinger Bands: {MISSING}")?,
        }
        match &ind.volume {
            Some(vol) => writeln!(
                out,
                "Volume ({}): avg {} | latest {}{}",
                vol.period,
                human_format(vol.average),
                vol.relative.map_or(MISSING.into(), |r| format!("{r:.2}x avg")),
                if vol.surge { " (surge)" } else { "" }
            )?,
            None => writeln!(out, "Volume: {MISSING}")?,
        }
    }

    let levels = &report.levels;
    if full {
        writeln!(
            out,
            "Support: {} | Resistance: {}",
            price_list(&levels.support),
            price_list(&levels.resistance)
        )?;
        if let Some(range) = &report.range {
            writeln!(
                out,
                "Range (last {}): {} – {}",
                range.window,
                format_price(range.low),
                format_price(range.high)
            )?;
        }
    } else {
        writeln!(
            out,
            "Support: {} | Resistance: {}",
            levels.support.first().map_or(MISSING.into(), |&p| format_price(p)),
            levels.resistance.first().map_or(MISSING.into(), |&p| format_price(p))
        )?;
    }

    if report.trend.is_empty() {
        writeln!(out, "Price Chart: {MISSING}")?;
    } else {
        writeln!(out, "Price Chart: {}", report.trend)?;
    }
    write!(out, "{RULE}")
}

fn rsi_zone(value: f64) -> &'static str {
    if value >= 70.0 {
        "overbought"
    } else if value <= 30.0 {
        "oversold"
    } else {
        "neutral"
    }
}

fn fixed(value: Option<f64>) -> String {
    value.map_or(MISSING.into(), |v| format!("{v:.2}"))
}

fn period_labels<'a>(periods: impl Iterator<Item = &'a usize>) -> String {
    periods.map(|p| p.to_string()).collect::<Vec<_>>().join("/")
}

fn value_list<'a>(values: impl Iterator<Item = &'a Option<f64>>) -> String {
    let rendered: Vec<String> = values.map(|&v| fixed(v)).collect();
    if rendered.is_empty() {
        MISSING.into()
    } else {
        rendered.join(", ")
    }
}

fn price_list(levels: &[f64]) -> String {
    if levels.is_empty() {
        return MISSING.into();
    }
    levels
        .iter()
        .map(|&p| format_price(p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format large numbers with a K/M/B/T suffix and two decimals.
pub fn human_format(num: f64) -> String {
    const SUFFIXES: [&str; 5] = ["", "K", "M", "B", "T"];
    let mut value = num;
    let mut magnitude = 0;
    while value.abs() >= 1000.0 && magnitude < SUFFIXES.len() - 1 {
        magnitude += 1;
        value /= 1000.0;
    }
    format!("{value:.2}{}", SUFFIXES[magnitude])
}

/// Thousands-separated price; sub-unit prices keep six decimals.
pub fn format_price(price: f64) -> String {
    if price.abs() < 1.0 {
        return format!("{price:.6}");
    }
    let fixed = format!("{:.2}", price.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}
