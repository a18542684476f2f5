//! Server-rendered HTML for every state a visitor can be in.

use core::fmt::{self, Display, Write};
use quiz::{QuizSession, SessionError, State, Step};

const TITLE: &str = "Quizdeck";

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;max-width:46rem;margin:2rem auto;padding:0 1rem;line-height:1.5}\
pre{background:#f4f4f4;padding:.75rem;overflow-x:auto}\
progress{width:100%}\
label{display:block;margin:.4rem 0}\
.banner{padding:.5rem .75rem;border-radius:.25rem;margin:1rem 0}\
.error{background:#fde2e2}.ok{background:#e2f7e2}.bad{background:#fde2e2}\
.correct{font-weight:bold;color:#186a18}.chosen{text-decoration:underline}\
.muted{color:#666}";

/// Escapes text for safe inclusion in HTML element content and attribute values.
pub struct Escape<'a>(pub &'a str);

impl Display for Escape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        while let Some(pos) = rest.find(['&', '<', '>', '"', '\'']) {
            let (clean, tail) = rest.split_at(pos);
            f.write_str(clean)?;
            f.write_str(match tail.as_bytes()[0] {
                b'&' => "&amp;",
                b'<' => "&lt;",
                b'>' => "&gt;",
                b'"' => "&quot;",
                _ => "&#39;",
            })?;
            rest = &tail[1..];
        }
        f.write_str(rest)
    }
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>{TITLE}</title><style>{STYLE}</style></head><body><h1>{TITLE}</h1>{body}</body></html>"
    )
}

fn banner(out: &mut String, error: Option<&SessionError>) -> fmt::Result {
    match error {
        Some(err) => write!(out, "<p class=\"banner error\" role=\"alert\">{}</p>", Escape(&err.to_string())),
        None => Ok(()),
    }
}

fn button(out: &mut String, action: &str, label: &str) -> fmt::Result {
    write!(out, "<form method=\"post\" action=\"{action}\"><button type=\"submit\">{label}</button></form>")
}

/// Landing page shown before a session exists.
pub fn welcome(count: usize, total: usize, shuffle: bool) -> Result<String, fmt::Error> {
    let order = if shuffle { "in random order" } else { "in order" };
    let mut out = String::new();
    write!(out, "<p>{count} of {total} questions, {order}. Each question can only be answered once.</p>")?;
    button(&mut out, "/start", "Start")?;
    Ok(layout(&out))
}

/// Page for a visitor with a live session, with an optional error from their last action.
pub fn session(session: &QuizSession, error: Option<&SessionError>) -> Result<String, fmt::Error> {
    let mut out = String::new();
    banner(&mut out, error)?;
    match session.state() {
        State::InProgress(step) => in_progress(&mut out, session, step)?,
        State::Completed => results(&mut out, session)?,
    }
    Ok(layout(&out))
}

fn in_progress(out: &mut String, session: &QuizSession, step: Step) -> fmt::Result {
    let Ok(question) = session.current_question() else {
        return Ok(());
    };
    let position = session.current_index();
    let total = session.total();
    write!(
        out,
        "<progress value=\"{position}\" max=\"{total}\"></progress>\
<p class=\"muted\">Question {} of {total} &middot; score {}</p><h2>{}</h2>",
        position + 1,
        session.score(),
        Escape(question.text()),
    )?;
    if let Some(code) = question.code() {
        write!(out, "<pre><code>{}</code></pre>", Escape(code))?;
    }

    let Some(selected) = session.selected_option().filter(|_| step == Step::AwaitingAdvance) else {
        out.push_str("<form method=\"post\" action=\"/answer\">");
        for (i, option) in question.options().iter().enumerate() {
            write!(
                out,
                "<label><input type=\"radio\" name=\"choice\" value=\"{i}\" required> {}</label>",
                Escape(option)
            )?;
        }
        out.push_str("<button type=\"submit\">Submit</button></form>");
        return Ok(());
    };

    out.push_str("<ol start=\"0\">");
    for (i, option) in question.options().iter().enumerate() {
        let class = match (i == question.correct_index(), i == selected) {
            (true, true) => "correct chosen",
            (true, false) => "correct",
            (false, true) => "chosen",
            (false, false) => "",
        };
        write!(out, "<li class=\"{class}\">{}</li>", Escape(option))?;
    }
    out.push_str("</ol>");

    if question.is_correct(selected) {
        out.push_str("<p class=\"banner ok\">Correct!</p>");
    } else {
        write!(
            out,
            "<p class=\"banner bad\">Incorrect. The answer was: <strong>{}</strong></p>",
            Escape(question.correct_option())
        )?;
    }
    if !question.explanation().is_empty() {
        write!(out, "<details open><summary>Explanation</summary><p>{}</p></details>", Escape(question.explanation()))?;
    }

    let label = if position + 1 == total { "See results" } else { "Next question" };
    button(out, "/next", label)
}

fn results(out: &mut String, session: &QuizSession) -> fmt::Result {
    let Ok(summary) = session.summary() else {
        return Ok(());
    };
    write!(
        out,
        "<h2>Results</h2><p><strong>{}/{}</strong> &middot; {:.1}% &middot; {:.1} s</p><h3>Review</h3><ol>",
        summary.score(),
        summary.total(),
        summary.percent(),
        summary.elapsed().as_secs_f64(),
    )?;
    for (question, record) in session.review() {
        let verdict = if record.correct { "correct" } else { "incorrect" };
        write!(
            out,
            "<li><p><strong>{}</strong> ({verdict})</p><p class=\"muted\">Your answer: {} &middot; Correct answer: {}</p>",
            Escape(question.text()),
            Escape(&question.options()[record.chosen]),
            Escape(question.correct_option()),
        )?;
        if !question.explanation().is_empty() {
            write!(out, "<p>{}</p>", Escape(question.explanation()))?;
        }
        out.push_str("</li>");
    }
    out.push_str("</ol>");
    button(out, "/start", "Start over")
}
