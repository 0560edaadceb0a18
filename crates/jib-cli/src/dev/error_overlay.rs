//! The compile-error page served while the client bundle is broken.
//!
//! Rendered server-side so it works even when no JavaScript loads at all;
//! the reload client replaces it in-page as soon as a good build lands.

/// Render the full overlay document for one compile error.
pub fn page(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Compile error</title>
<style>
  body {{
    margin: 0;
    padding: 2rem;
    background: #1e1e1e;
    color: #e8e8e8;
    font-family: Menlo, Consolas, monospace;
    font-size: 14px;
    line-height: 1.5;
  }}
  h1 {{
    color: #ff5555;
    font-size: 18px;
    margin: 0 0 1rem;
  }}
  pre {{
    background: #2d2d2d;
    border-left: 4px solid #ff5555;
    padding: 1rem;
    overflow-x: auto;
    white-space: pre-wrap;
    word-break: break-word;
  }}
  p {{
    color: #8a8a8a;
  }}
</style>
</head>
<body>
<h1>Failed to compile</h1>
<pre>{}</pre>
<p>Fix the error and save; this page reloads automatically.</p>
<script src="/__jib/client.js"></script>
</body>
</html>
"#,
        html_escape(error)
    )
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
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
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_text_is_escaped() {
        let page = page("Unexpected token <div> in src/app.tsx");
        assert!(page.contains("&lt;div&gt;"));
        assert!(!page.contains("<div>"));
    }

    #[test]
    fn page_loads_the_reload_client() {
        let page = page("x is not defined");
        assert!(page.contains(r#"<script src="/__jib/client.js"></script>"#));
        assert!(page.contains("Failed to compile"));
    }

    #[test]
    fn escape_covers_quotes_and_ampersands() {
        assert_eq!(
            html_escape(r#"a & b "quoted" 'single'"#),
            "a &amp; b &quot;quoted&quot; &#39;single&#39;"
        );
    }
}
