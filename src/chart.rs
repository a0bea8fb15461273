//! Chart rendering (§2: explicitly out of scope as an engineering target,
//! kept only so the pipeline is end-to-end runnable). Minimal hand-rolled
//! SVG templating — no charting crate in the reference pack does anything
//! closer than this, so the shape is novel: one function per chart, each a
//! pure `&AggregateMetrics -> String`.

use crate::model::AggregateMetrics;
use crate::numfmt::format_count;

const WIDTH: u32 = 800;
const BAR_HEIGHT: u32 = 28;
const BAR_GAP: u32 = 10;

fn svg_open(width: u32, height: u32) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
    )
}

fn bar_chart(title: &str, rows: &[(String, f64, String)]) -> String {
    let height = 60 + rows.len() as u32 * (BAR_HEIGHT + BAR_GAP);
    let mut out = svg_open(WIDTH, height);
    out.push_str(&format!(
        "<text x=\"10\" y=\"24\" font-size=\"18\" font-family=\"sans-serif\" font-weight=\"bold\">{title}</text>\n"
    ));

    let max_fraction = rows.iter().map(|(_, f, _)| *f).fold(0.0_f64, f64::max).max(1.0);
    for (i, (label, fraction, detail)) in rows.iter().enumerate() {
        let y = 50 + i as u32 * (BAR_HEIGHT + BAR_GAP);
        let bar_width = ((WIDTH as f64 - 220.0) * (fraction / max_fraction)).max(2.0);
        out.push_str(&format!(
            "<text x=\"10\" y=\"{text_y}\" font-size=\"14\" font-family=\"sans-serif\">{label}</text>\n",
            text_y = y + BAR_HEIGHT - 8
        ));
        out.push_str(&format!(
            "<rect x=\"150\" y=\"{y}\" width=\"{bar_width:.1}\" height=\"{BAR_HEIGHT}\" fill=\"#4c78a8\" rx=\"3\"/>\n"
        ));
        out.push_str(&format!(
            "<text x=\"{label_x:.1}\" y=\"{text_y}\" font-size=\"13\" font-family=\"sans-serif\">{detail}</text>\n",
            label_x = 160.0 + bar_width,
            text_y = y + BAR_HEIGHT - 8
        ));
    }
    out.push_str("</svg>\n");
    out
}

/// `language_chart.svg`: ranked languages by byte share.
pub fn render_language_chart(metrics: &AggregateMetrics) -> String {
    let rows: Vec<(String, f64, String)> = metrics
        .ranked_languages
        .iter()
        .map(|lang| (lang.lang.clone(), lang.percentage, format!("{:.1}%", lang.percentage)))
        .collect();
    bar_chart("Most Used Languages", &rows)
}

/// `commit_history_chart.svg`: commits per day, most recent first.
pub fn render_commit_history_chart(metrics: &AggregateMetrics) -> String {
    let rows: Vec<(String, f64, String)> = metrics
        .commit_history
        .iter()
        .rev()
        .take(30)
        .map(|(date, count)| (date.clone(), *count as f64, format_count(*count as i64)))
        .collect();
    bar_chart("Commit History", &rows)
}

/// `commit_time_chart.svg`: commits binned by UTC hour of day.
pub fn render_commit_time_chart(metrics: &AggregateMetrics) -> String {
    let rows: Vec<(String, f64, String)> = metrics
        .hourly_distribution
        .iter()
        .map(|(hour, count)| (format!("{hour:02}:00"), *count as f64, format_count(*count as i64)))
        .collect();
    bar_chart("Commit Times (UTC)", &rows)
}

/// `commit_languages_chart.svg`: the top-5 languages touched by commits.
pub fn render_commit_languages_chart(metrics: &AggregateMetrics) -> String {
    let rows: Vec<(String, f64, String)> = metrics
        .top_commit_languages
        .iter()
        .map(|(lang, count)| (lang.clone(), *count as f64, format_count(*count as i64)))
        .collect();
    bar_chart("Languages Touched by Commits", &rows)
}

/// `summary_card.svg`: the four headline totals.
pub fn render_summary_card(metrics: &AggregateMetrics) -> String {
    let totals = &metrics.summary;
    let height = 140;
    let mut out = svg_open(WIDTH, height);
    out.push_str(
        "<text x=\"10\" y=\"24\" font-size=\"18\" font-family=\"sans-serif\" font-weight=\"bold\">Summary</text>\n",
    );
    let fields = [
        ("Repos", totals.repo_count as i64),
        ("Stars", totals.stars as i64),
        ("Commits", totals.commits as i64),
        ("Pull Requests", totals.prs as i64),
    ];
    for (i, (label, value)) in fields.iter().enumerate() {
        let x = 10 + i as u32 * 190;
        out.push_str(&format!(
            "<text x=\"{x}\" y=\"70\" font-size=\"24\" font-family=\"sans-serif\" font-weight=\"bold\">{}</text>\n",
            format_count(*value)
        ));
        out.push_str(&format!(
            "<text x=\"{x}\" y=\"95\" font-size=\"13\" font-family=\"sans-serif\">{label}</text>\n"
        ));
    }
    out.push_str("</svg>\n");
    out
}

/// One rendered chart, paired with the filename it should be written under.
pub struct RenderedChart {
    pub filename: &'static str,
    pub svg: String,
}

/// Render all five charts for a run.
pub fn render_all(metrics: &AggregateMetrics) -> Vec<RenderedChart> {
    vec![
        RenderedChart {
            filename: "language_chart.svg",
            svg: render_language_chart(metrics),
        },
        RenderedChart {
            filename: "commit_history_chart.svg",
            svg: render_commit_history_chart(metrics),
        },
        RenderedChart {
            filename: "commit_time_chart.svg",
            svg: render_commit_time_chart(metrics),
        },
        RenderedChart {
            filename: "commit_languages_chart.svg",
            svg: render_commit_languages_chart(metrics),
        },
        RenderedChart {
            filename: "summary_card.svg",
            svg: render_summary_card(metrics),
        },
    ]
}
