//! HTML rendering of a classified inquiry.

use crate::sentiment::{DocumentSentiment, Sentiment, SentimentResult};

/// Render the reply page for `message` and its classification.
///
/// Pure and infallible. Unknown sentiment labels produce no banner.
pub fn render(message: &str, result: &SentimentResult) -> String {
    let mut html = String::with_capacity(512 + message.len());

    html.push_str(r#"<body style="font-family: sans-serif;">"#);
    html.push_str("<h1>Kundenanfrage</h1>");
    html.push_str("<p>");
    push_escaped(&mut html, message);
    html.push_str("</p>");
    html.push_str("<h2>Erkannte Stimmung des Kunden</h2>");

    if let Some(document) = result.document() {
        if let Some((icon, label)) = banner(&document.sentiment) {
            html.push_str(&format!(
                r#"<div style="font-size: x-large"><span>{icon}</span><span>{label}</span></div>"#
            ));
        }
        push_scores(&mut html, document);
    }

    html.push_str("</body>");
    html
}

fn banner(sentiment: &Sentiment) -> Option<(&'static str, &'static str)> {
    match sentiment {
        Sentiment::Positive => Some(("😊", "Freundlich")),
        Sentiment::Neutral | Sentiment::Mixed => Some(("😑", "Neutral")),
        Sentiment::Negative => Some(("😡", "Verärgert")),
        Sentiment::Other(_) => None,
    }
}

fn push_scores(html: &mut String, document: &DocumentSentiment) {
    let scores = &document.confidence_scores;
    html.push_str("<div>");
    html.push_str(&format!(
        r#"<span style="font-weight: bold;">{} % </span><span>Positiv | </span>"#,
        percent(scores.positive)
    ));
    html.push_str(&format!(
        r#"<span style="font-weight: bold;">{} % </span><span>Neutral | </span>"#,
        percent(scores.neutral)
    ));
    html.push_str(&format!(
        r#"<span style="font-weight: bold;">{} % </span><span>Negativ</span>"#,
        percent(scores.negative)
    ));
    html.push_str("</div>");
}

/// `round(score * 100)`, halves rounding up.
pub fn percent(score: f64) -> i64 {
    (score * 100.0 + 0.5).floor() as i64
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
