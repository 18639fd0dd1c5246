//! The single-form HTML page served at `/`

const TITLE: &str = "Semantic Search with Qdrant";
const DESCRIPTION: &str =
  "Enter a search query to find the nearest embeddings in the Qdrant database.";

/// Escape text for use in HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for character in text.chars() {
    match character {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      other => escaped.push(other),
    }
  }
  escaped
}

/// Render the page, echoing `query` into the input and `output` into a `<pre>` block
pub fn render(query: &str, output: Option<&str>) -> String {
  let result = output
    .map(|text| format!("    <pre id=\"output\">{}</pre>\n", escape_html(text)))
    .unwrap_or_default();

  format!(
    r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>{TITLE}</title>
  </head>
  <body>
    <h1>{TITLE}</h1>
    <p>{DESCRIPTION}</p>
    <form method="post" action="/">
      <input type="text" name="query" value="{query}" autofocus>
      <button type="submit">Submit</button>
    </form>
{result}  </body>
</html>
"#,
    query = escape_html(query),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_escape_html() {
    assert_eq!(escape_html(r#"<p>"Phone" & 'case'</p>"#), "&lt;p&gt;&quot;Phone&quot; &amp; &#39;case&#39;&lt;/p&gt;");
    assert_eq!(escape_html("plain"), "plain");
  }

  #[test]
  fn test_empty_page_has_form_and_no_output() {
    let page = render("", None);

    assert!(page.contains("<title>Semantic Search with Qdrant</title>"));
    assert!(page.contains(r#"<input type="text" name="query""#));
    assert!(!page.contains("<pre"));
  }

  #[test]
  fn test_output_is_escaped() {
    let page = render("<b>", Some("ID: 1, Score: 0.5, Text: <script>\n"));

    assert!(page.contains("value=\"&lt;b&gt;\""));
    assert!(page.contains("Text: &lt;script&gt;\n</pre>"));
    assert!(!page.contains("<script>"));
  }
}
