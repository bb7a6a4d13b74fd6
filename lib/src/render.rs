use html_escape::encode_text;

use crate::fields::FieldMap;

const CELL_STYLE: &str = "padding:6px 10px;border:1px solid #eee";

/// Renders one table row per field, in insertion order.
///
/// Keys and values are HTML-escaped; submitted text never reaches the
/// mail client as markup.
pub fn render_rows(fields: &FieldMap) -> String {
    fields
        .iter()
        .map(|(key, value)| {
            format!(
                "<tr><td style=\"{style};font-weight:600\">{key}</td><td style=\"{style}\">{value}</td></tr>",
                style = CELL_STYLE,
                key = encode_text(key),
                value = encode_text(&value.display()),
            )
        })
        .collect()
}

/// Renders the full HTML body of a submission email
pub fn render_html(fields: &FieldMap) -> String {
    format!(
        concat!(
            "<div style=\"font-family:Inter,Arial,sans-serif\">",
            "<h2 style=\"margin:0 0 8px 0\">New Form Submission</h2>",
            "<table style=\"border-collapse:collapse;border:1px solid #eee\">{}</table>",
            "</div>"
        ),
        render_rows(fields)
    )
}
