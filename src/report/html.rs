use std::fmt::Write as _;

use super::table::ReportTable;
use super::ReportMeta;

#[derive(Clone, Copy, Debug)]
pub struct HtmlTableOptions {
    /// `width` attribute of the table, in percent.
    pub width_percent: u8,
    /// Whether the table's first row is a header row.
    pub header: bool,
    /// Prepend a row-number column.
    pub numbered: bool,
}

impl Default for HtmlTableOptions {
    fn default() -> Self {
        Self {
            width_percent: 100,
            header: true,
            numbered: false,
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// One `<tr>` per row, one `<td>` per cell, in table order.
///
/// With numbering the counter starts at 0 on the first row; a header row shows `#` instead,
/// so data rows read 1, 2, ...
pub fn table_to_html(table: &ReportTable, opts: &HtmlTableOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<table border=\"1\" width=\"{}%\">", opts.width_percent);
    for (i, row) in table.all_rows().enumerate() {
        out.push_str("<tr>");
        if opts.numbered {
            let label = if opts.header && i == 0 {
                "#".to_string()
            } else {
                i.to_string()
            };
            let _ = write!(out, "<td>{label}</td>");
        }
        for cell in row {
            let _ = write!(out, "<td>{}</td>", escape_html(cell));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    out
}

pub fn render_document(meta: &ReportMeta, table: &ReportTable, opts: &HtmlTableOptions) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    let _ = writeln!(
        out,
        "<title>Error analysis: sentence {}</title>",
        meta.sentence_id
    );
    out.push_str("</head>\n<body>\n<ul>\n");

    let refs = meta
        .reference_files
        .iter()
        .map(|r| escape_html(r))
        .collect::<Vec<_>>()
        .join(", ");
    let mut items: Vec<(&str, String)> = vec![
        ("Datetime", escape_html(&meta.datetime)),
        ("Working Directory", escape_html(&meta.working_dir)),
        ("Run Number", escape_html(&meta.run_number)),
        ("Input File", escape_html(&meta.input_file)),
        ("Reference Files", refs),
        ("Sentence ID", meta.sentence_id.to_string()),
        ("Source Sentence", escape_html(&meta.source_sentence)),
    ];
    for (i, r) in meta.references.iter().enumerate() {
        items.push(("Reference", format!("[{i}] {}", escape_html(r))));
    }
    items.push((
        "Decoder Command",
        format!("<code>{}</code>", escape_html(&meta.decoder_command)),
    ));
    if let Some(cmd) = meta.scorer_command.as_deref() {
        items.push(("Scorer Command", format!("<code>{}</code>", escape_html(cmd))));
    }
    for (label, value) in items {
        let _ = writeln!(out, "<li><b>{label}:</b> {value}</li>");
    }
    out.push_str("</ul>\n<hr>\n<h3>Output</h3>\n");
    out.push_str(&table_to_html(table, opts));
    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReportTable {
        let mut t = ReportTable::new(vec!["output sentence".into(), "LM0".into()]);
        t.push_row(vec!["a <b> & c".into(), "-1.5".into()]).expect("row");
        t.push_row(vec!["d".into(), "-2".into()]).expect("row");
        t
    }

    #[test]
    fn one_tr_per_row_and_one_td_per_cell() {
        let html = table_to_html(&sample(), &HtmlTableOptions::default());
        assert_eq!(html.matches("<tr>").count(), 3);
        assert_eq!(html.matches("<td>").count(), 6);
        assert!(html.starts_with("<table border=\"1\" width=\"100%\">"));
        let order = ["output sentence", "LM0", "a &lt;b&gt; &amp; c", "-1.5", "d", "-2"];
        let mut pos = 0;
        for cell in order {
            let found = html[pos..].find(&format!("<td>{cell}</td>")).expect(cell);
            pos += found + 1;
        }
    }

    #[test]
    fn numbering_marks_header_with_hash() {
        let opts = HtmlTableOptions {
            width_percent: 80,
            header: true,
            numbered: true,
        };
        let html = table_to_html(&sample(), &opts);
        assert!(html.contains("width=\"80%\""));
        assert!(html.contains("<tr><td>#</td><td>output sentence</td>"));
        assert!(html.contains("<tr><td>1</td><td>a &lt;b&gt; &amp; c</td>"));
        assert!(html.contains("<tr><td>2</td><td>d</td>"));
        assert_eq!(html.matches("<td>").count(), 9);
    }

    #[test]
    fn numbering_without_header_starts_at_zero() {
        let opts = HtmlTableOptions {
            header: false,
            numbered: true,
            ..HtmlTableOptions::default()
        };
        let html = table_to_html(&sample(), &opts);
        assert!(html.contains("<tr><td>0</td><td>output sentence</td>"));
        assert!(!html.contains("<td>#</td>"));
    }

    #[test]
    fn document_lists_metadata_before_table() {
        let meta = ReportMeta {
            datetime: "03/09/2024 14:05:07".into(),
            working_dir: "/work".into(),
            run_number: "2".into(),
            input_file: "/work/evaluation/newstest.input.tc.2".into(),
            reference_files: vec!["/r/ref0".into()],
            sentence_id: 4,
            source_sentence: "das <haus>".into(),
            references: vec!["the house".into()],
            decoder_command: "/bin/moses_chart -f moses.ini".into(),
            scorer_command: None,
        };
        let html = render_document(&meta, &sample(), &HtmlTableOptions::default());
        assert!(html.contains("<li><b>Sentence ID:</b> 4</li>"));
        assert!(html.contains("<li><b>Source Sentence:</b> das &lt;haus&gt;</li>"));
        assert!(!html.contains("Scorer Command"));
        let meta_at = html.find("Decoder Command").expect("meta");
        let table_at = html.find("<table").expect("table");
        assert!(meta_at < table_at);
    }
}
