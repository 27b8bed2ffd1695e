//! Human-readable miner status report
//!
//! Rendering is a pure function of the document and the thresholds; the
//! caller decides where the text goes. Colors come from `colored`, which
//! honours `NO_COLOR` and non-tty output on its own.

use colored::{Color, ColoredString, Colorize};
use std::fmt::Write;
use std::time::Duration;

use crate::config::Thresholds;
use crate::document::{ChainStats, MinerInfo, StatsSnapshot, StatusDocument};

/// Traffic-light classification of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Nominal,
    Caution,
    Critical,
}

impl Band {
    fn color(self) -> Color {
        match self {
            Band::Nominal => Color::Green,
            Band::Caution => Color::Yellow,
            Band::Critical => Color::Red,
        }
    }
}

impl Thresholds {
    pub fn fan_band(&self, rpm: i64) -> Band {
        if rpm >= self.fan_nominal_rpm {
            Band::Nominal
        } else if rpm >= self.fan_caution_rpm {
            Band::Caution
        } else {
            Band::Critical
        }
    }

    pub fn efficiency_band(&self, percent: f64) -> Band {
        if percent >= self.efficiency_good_pct {
            Band::Nominal
        } else if percent >= self.efficiency_fair_pct {
            Band::Caution
        } else {
            Band::Critical
        }
    }

    pub fn temp_band(&self, celsius: i64) -> Band {
        if celsius >= self.temp_crit_celsius {
            Band::Critical
        } else if celsius >= self.temp_warn_celsius {
            Band::Caution
        } else {
            Band::Nominal
        }
    }
}

fn paint(text: String, band: Band) -> ColoredString {
    text.color(band.color())
}

/// Renders the full report for a fetched document
pub fn render_document(doc: &StatusDocument, thresholds: &Thresholds) -> Result<String, serde_json::Error> {
    let info = doc.miner_info()?;
    let stats = doc.snapshot()?;
    Ok(render(&info, &stats, thresholds))
}

pub fn render(info: &MinerInfo, stats: &StatsSnapshot, thresholds: &Thresholds) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_report(&mut out, info, stats, thresholds);
    out
}

fn write_report(
    out: &mut String,
    info: &MinerInfo,
    stats: &StatsSnapshot,
    thresholds: &Thresholds,
) -> std::fmt::Result {
    // ── Miner ─────────────────────────────────────────────────
    section(out, "Miner Information:")?;
    writeln!(out, "Model: {}", info.model)?;
    writeln!(out, "Firmware Version: {}", info.miner_version)?;
    writeln!(out, "Compile Time: {}", info.compile_time)?;
    writeln!(out, "Uptime: {}", format_uptime(stats.elapsed))?;
    writeln!(
        out,
        "Operating Mode: {}",
        if stats.miner_mode == 0 { "Normal" } else { "Other" }
    )?;
    writeln!(out, "Frequency Level: {}%", stats.freq_level)?;

    // ── Hashrate ──────────────────────────────────────────────
    section(out, "Hashrate Information:")?;
    writeln!(out, "5s Hashrate:    {}", format_hashrate(stats.rate_5s))?;
    writeln!(out, "30m Hashrate:   {}", format_hashrate(stats.rate_30m))?;
    writeln!(out, "Average Rate:   {}", format_hashrate(stats.rate_avg))?;
    writeln!(out, "Ideal Rate:     {}", format_hashrate(stats.rate_ideal))?;
    writeln!(
        out,
        "Hardware Error Rate: {}",
        format!("{}%", stats.hwp_total).green()
    )?;

    // ── Fans ──────────────────────────────────────────────────
    section(out, "Fan Status:")?;
    writeln!(out, "Number of Fans: {}", stats.fan_num)?;
    for (i, &rpm) in stats.fan.iter().enumerate() {
        writeln!(
            out,
            "Fan {} Speed: {}",
            i + 1,
            paint(format!("{rpm:4} RPM"), thresholds.fan_band(rpm))
        )?;
    }

    // ── Chains ────────────────────────────────────────────────
    section(out, "Chain Information:")?;
    for chain in &stats.chain {
        write_chain(out, chain, thresholds)?;
    }
    Ok(())
}

fn write_chain(out: &mut String, chain: &ChainStats, thresholds: &Thresholds) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "{}", format!("Chain {}:", chain.index).yellow())?;
    writeln!(out, "Serial Number: {}", chain.sn)?;
    writeln!(out, "Frequency: {} MHz", chain.freq_avg)?;

    let efficiency = chain.efficiency();
    writeln!(out, "Real Hashrate:  {}", format_hashrate(chain.rate_real))?;
    writeln!(out, "Ideal Hashrate: {}", format_hashrate(chain.rate_ideal))?;
    writeln!(
        out,
        "Efficiency: {}",
        paint(format!("{efficiency:.1}%"), thresholds.efficiency_band(efficiency))
    )?;
    writeln!(out, "Number of ASICs: {}", chain.asic_num)?;
    let hw_band = if chain.hw == 0 { Band::Nominal } else { Band::Critical };
    writeln!(out, "Hardware Errors: {}", paint(chain.hw.to_string(), hw_band))?;

    writeln!(out)?;
    writeln!(out, "Temperatures:")?;
    writeln!(out, "Chip:  {}", temp_row(&chain.temp_chip, thresholds))?;
    writeln!(out, "PCB:   {}", temp_row(&chain.temp_pcb, thresholds))?;
    writeln!(out, "PIC:   {}", temp_row(&chain.temp_pic, thresholds))
}

fn section(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "{}", title.cyan())?;
    writeln!(out, "{}", "-".repeat(50))
}

fn temp_row(readings: &[i64], thresholds: &Thresholds) -> String {
    readings
        .iter()
        .map(|&t| paint(format!("{t:3}°C"), thresholds.temp_band(t)).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_uptime(seconds: u64) -> String {
    humantime::format_duration(Duration::from_secs(seconds)).to_string()
}

/// `1234567.891` -> `1,234,567.89 GH/s`
pub fn format_hashrate(rate: f64) -> String {
    let fixed = format!("{:.2}", rate.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rate < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{fraction} GH/s")
}
