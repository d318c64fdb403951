/*!
format.rs

Terminal presentation primitives for the human output paths of `juju-act`.

  - `StyleOptions::detect()` honours NO_COLOR, NO_EMOJI and COLUMNS
    (clamped to 40..=220, default 100).
  - Every helper returns a `String`; nothing here prints.
  - JSON output paths never go through this module.
*/

use std::borrow::Cow;

/* ---- Style Options ---- */

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);

        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
            term_width: width,
        }
    }

    /// No ANSI, no emoji; fixed width.
    #[cfg(test)]
    pub fn plain(term_width: usize) -> Self {
        StyleOptions {
            use_color: false,
            use_emoji: false,
            term_width,
        }
    }
}

/* ---- Color / Emoji ---- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Warning,
    Dim,
    Bold,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Warning => "38;5;214",
        Role::Dim => "2",
        Role::Bold => "1",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "info" => "ℹ",
        "list" => "📜",
        "model" => "🗂",
        "charm" => "📦",
        "action" => "⚙",
        _ => "",
    }
}

/* ---- Box Header ---- */

/// Single-box title with an optional dimmed subtitle; wraps on narrow terminals.
pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let title = color(Role::Primary, title.as_ref().trim(), style);
    let inner = match subtitle {
        Some(s) => format!("{title}  {}", color(Role::Secondary, s.as_ref(), style)),
        None => title,
    };

    let max_inner = style.term_width.clamp(20, 200) - 4;
    let lines = if display_width(&inner) > max_inner {
        wrap_text(&inner, max_inner)
    } else {
        vec![inner]
    };
    let inner_width = lines.iter().map(|l| display_width(l)).max().unwrap_or(0);

    let rule = "─".repeat(inner_width + 2);
    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(format!("┌{rule}┐"));
    for line in lines {
        let pad = " ".repeat(inner_width - display_width(&line));
        out.push(format!("│ {line}{pad} │"));
    }
    out.push(format!("└{rule}┘"));
    out.join("\n")
}

/* ---- Table Rendering ---- */

#[derive(Debug, Clone)]
pub struct TableOpts {
    /// 0 means the terminal width.
    pub max_width: usize,
    pub truncate: bool,
    pub header_sep: bool,
    pub min_col_width: usize,
}

impl Default for TableOpts {
    fn default() -> Self {
        Self {
            max_width: 0,
            truncate: true,
            header_sep: true,
            min_col_width: 4,
        }
    }
}

pub fn table(
    headers: &[&str],
    rows: &[Vec<String>],
    opts: TableOpts,
    style: &StyleOptions,
) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let col_count = headers.len();
    let width_limit = match opts.max_width {
        0 => style.term_width,
        w => w.min(style.term_width),
    };

    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    // shrink the widest columns first until the row fits
    let total: usize = widths.iter().sum::<usize>() + (col_count - 1) * 2;
    if total > width_limit {
        let mut overflow = total - width_limit;
        let mut order: Vec<usize> = (0..col_count).collect();
        order.sort_by(|a, b| widths[*b].cmp(&widths[*a]));
        for idx in order {
            if overflow == 0 {
                break;
            }
            if widths[idx] > opts.min_col_width {
                let shrink = (widths[idx] - opts.min_col_width).min(overflow);
                widths[idx] -= shrink;
                overflow -= shrink;
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(
        headers.iter().copied(),
        &widths,
        &opts,
        Some(Role::Accent),
        style,
    ));
    if opts.header_sep {
        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        lines.push(color(Role::Dim, sep.join("  "), style));
    }
    for row in rows {
        let cells = (0..col_count).map(|c| row.get(c).map(String::as_str).unwrap_or(""));
        lines.push(render_row(cells, &widths, &opts, None, style));
    }
    lines.join("\n")
}

fn render_row<'a>(
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
    opts: &TableOpts,
    role: Option<Role>,
    style: &StyleOptions,
) -> String {
    let rendered: Vec<String> = cells
        .zip(widths)
        .map(|(cell, w)| {
            let cell = pad_or_truncate(cell, *w, opts.truncate);
            match role {
                Some(r) => color(r, cell, style),
                None => cell,
            }
        })
        .collect();
    rendered.join("  ").trim_end().to_string()
}

fn pad_or_truncate(s: &str, width: usize, truncate: bool) -> String {
    let len = display_width(s);
    if len <= width {
        return format!("{s}{}", " ".repeat(width - len));
    }
    if !truncate {
        return s.to_string();
    }
    truncate_ellipsis(&strip_ansi(s), width)
}

/* ---- Text Helpers ---- */

pub fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if !current.is_empty() && display_width(&current) + display_width(word) + 1 > max_width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    match max_chars {
        0 => String::new(),
        1 => "…".into(),
        n => {
            let mut out: String = s.chars().take(n - 1).collect();
            out.push('…');
            out
        }
    }
}

/* ---- ANSI / Width Utilities ---- */

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for end in chars.by_ref() {
                if end.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

pub fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}
