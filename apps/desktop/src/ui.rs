use std::fmt::Write;

use client_core::{
    render::{LoadSlot, Notice, NoticeKind, SubmissionForm, STAR},
    FeedPanel, StatsPanel,
};

const BAR_WIDTH: usize = 30;

fn notice_line(notice: &Notice) -> String {
    let tag = match notice.kind {
        NoticeKind::Error => "error",
        NoticeKind::Success => "ok",
        NoticeKind::Info => "info",
    };
    format!("[{tag}] {}", notice.text)
}

fn slot_line(slot: &LoadSlot) -> Option<String> {
    match slot {
        LoadSlot::Loading => Some("Loading...".into()),
        LoadSlot::Hidden => None,
        LoadSlot::Failed(message) => Some(format!("[error] {message}")),
    }
}

pub fn stats_text(panel: &StatsPanel) -> String {
    let mut out = String::from("== Rating statistics ==\n");
    if let Some(line) = slot_line(&panel.slot) {
        let _ = writeln!(out, "{line}");
    }
    if let Some(chart) = &panel.chart {
        let _ = writeln!(out, "Total reviews: {}", chart.total);
        let _ = writeln!(out, "Average rating: {} {STAR}", chart.average);
        for row in &chart.rows {
            let filled = ((row.fill_percent / 100.0) * BAR_WIDTH as f64).round() as usize;
            let filled = filled.min(BAR_WIDTH);
            let _ = writeln!(
                out,
                "{:>3} |{}{}| {}",
                row.label,
                "#".repeat(filled),
                " ".repeat(BAR_WIDTH - filled),
                row.count
            );
        }
    }
    out
}

pub fn feed_text(panel: &FeedPanel) -> String {
    let mut out = format!("== Reviews (filter: {}) ==\n", panel.filter);
    if let Some(line) = slot_line(&panel.slot) {
        let _ = writeln!(out, "{line}");
    }
    if let Some(notice) = &panel.notice {
        let _ = writeln!(out, "{}", notice_line(notice));
    }
    for row in &panel.rows {
        let _ = writeln!(out, "{}  {}", row.stars, row.date);
        if row.text_is_placeholder {
            let _ = writeln!(out, "  ({})", row.text);
        } else {
            let _ = writeln!(out, "  {}", row.text);
        }
        let _ = writeln!(out, "  Summary: {}", row.ai_summary);
        let _ = writeln!(out, "  Recommended actions: {}", row.ai_recommended_actions);
        let _ = writeln!(out, "  AI response: {}", row.ai_response);
    }
    out
}

pub fn form_text(form: &SubmissionForm) -> String {
    let stars: String = form
        .stars
        .iter()
        .map(|lit| if *lit { STAR } else { '☆' })
        .collect();
    let mut out = format!("Rating: {stars}\nCharacters: {}\n", form.char_count);
    if let Some(notice) = &form.notice {
        let _ = writeln!(out, "{}", notice_line(notice));
    }
    if let Some(response) = &form.ai_response {
        let _ = writeln!(out, "AI response: {response}");
    }
    out
}
