use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use url::form_urlencoded;

use crate::{constants::WORDS_PER_MINUTE, html::escape_html};

const FRONT_MATTER_DELIMITER: &str = "---";

/// Splits a `---` delimited YAML header from the document body.
pub fn split_front_matter(source: &str) -> (&str, &str) {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let Some(rest) = source.strip_prefix(FRONT_MATTER_DELIMITER) else {
        return ("", source);
    };
    let Some(rest) = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
    else {
        return ("", source);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_DELIMITER {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (header, body);
        }
        offset += line.len();
    }

    ("", source)
}

pub fn reading_time(body: &str) -> u32 {
    let words = body.split_whitespace().count().max(1);
    words.div_ceil(WORDS_PER_MINUTE) as u32
}

pub fn render_markdown(body: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(body, options);

    let mut events: Vec<Event<'_>> = Vec::new();
    let mut code_block: Option<(Option<String>, String)> = None;
    let mut image: Option<ImageState> = None;

    for event in parser {
        if let Some((_, code)) = code_block.as_mut() {
            match event {
                Event::Text(text) => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, code)) = code_block.take() {
                        events.push(Event::Html(CowStr::from(render_code_block(
                            lang.as_deref(),
                            &code,
                        ))));
                    }
                }
                _ => {}
            }
            continue;
        }

        if let Some(state) = image.as_mut() {
            match event {
                Event::End(TagEnd::Image) => {
                    if let Some(state) = image.take() {
                        events.push(Event::Html(CowStr::from(state.render())));
                    }
                }
                Event::Text(text) | Event::Code(text) => state.alt.push_str(&text),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                code_block = Some((lang, String::new()));
            }
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                image = Some(ImageState {
                    src: dest_url.into_string(),
                    title: title.into_string(),
                    alt: String::new(),
                });
            }
            other => events.push(other),
        }
    }

    let mut output = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut output, events.into_iter());
    output
}

struct ImageState {
    src: String,
    title: String,
    alt: String,
}

impl ImageState {
    fn render(&self) -> String {
        let title = if self.title.is_empty() {
            String::new()
        } else {
            format!(" title=\"{}\"", escape_html(&self.title))
        };
        let alt = escape_html(&self.alt);

        match rewrite_image_src(&self.src) {
            Some(src) => format!(
                "<img src=\"{}\" alt=\"{alt}\"{title} class=\"blog-image\" />",
                escape_html(&src)
            ),
            None => format!(
                "<img src=\"{}\" alt=\"{alt}\"{title} />",
                escape_html(&self.src)
            ),
        }
    }
}

/// Local images are served from the site root; remote and absolute sources
/// are left untouched (`None`).
fn rewrite_image_src(src: &str) -> Option<String> {
    if src.starts_with("/images/") {
        return Some(src.to_string());
    }
    if !src.starts_with("http") && !src.starts_with('/') {
        return Some(format!("/{src}"));
    }
    None
}

fn render_code_block(lang: Option<&str>, code: &str) -> String {
    let encoded = encode_uri_component(code);
    let escaped = escape_html(code);

    match lang {
        Some(lang) => {
            let lang = escape_html(lang);
            format!(
                "\n<div class=\"code-block-wrapper\">\n  <div class=\"code-block-header\">\n    <span class=\"code-block-lang\">{lang}</span>\n    <button class=\"code-block-copy\" data-code=\"{encoded}\">Copy</button>\n  </div>\n  <pre class=\"language-{lang}\"><code class=\"language-{lang}\">{escaped}</code></pre>\n</div>\n"
            )
        }
        None => format!(
            "\n<div class=\"code-block-wrapper\">\n  <div class=\"code-block-header\">\n    <button class=\"code-block-copy\" data-code=\"{encoded}\">Copy</button>\n  </div>\n  <pre><code>{escaped}</code></pre>\n</div>\n"
        ),
    }
}

/// Same escaping as JavaScript's `encodeURIComponent`, which leaves
/// `!~'()` alone.
fn encode_uri_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace("%21", "!")
        .replace("%7E", "~")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
}

#[cfg(test)]
mod tests {
    use super::{encode_uri_component, reading_time, render_markdown, split_front_matter};

    #[test]
    fn uri_encoding_keeps_javascript_unreserved_marks() {
        assert_eq!(
            encode_uri_component("say('hi')! ~*-_.; 100%"),
            "say('hi')!%20~*-_.%3B%20100%25"
        );
    }

    #[test]
    fn splits_front_matter_from_body() {
        let source = "---\ntitle: Hello\ntags: [rust]\n---\n# Body\n";
        let (header, body) = split_front_matter(source);
        assert_eq!(header, "title: Hello\ntags: [rust]\n");
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn documents_without_header_keep_their_body() {
        let (header, body) = split_front_matter("just text\n---\n");
        assert_eq!(header, "");
        assert_eq!(body, "just text\n---\n");
    }

    #[test]
    fn reading_time_rounds_up() {
        assert_eq!(reading_time(""), 1);
        assert_eq!(reading_time(&"word ".repeat(200)), 1);
        assert_eq!(reading_time(&"word ".repeat(201)), 2);
    }

    #[test]
    fn renders_gfm_tables_and_strikethrough() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn rewrites_local_images() {
        let html = render_markdown(
            "![Local](/images/a.png)\n\n![Relative](pics/b.png)\n\n![Remote](https://x.dev/c.png)\n",
        );
        assert!(html.contains("<img src=\"/images/a.png\" alt=\"Local\" class=\"blog-image\" />"));
        assert!(html.contains("<img src=\"/pics/b.png\" alt=\"Relative\" class=\"blog-image\" />"));
        assert!(html.contains("<img src=\"https://x.dev/c.png\" alt=\"Remote\" />"));
    }

    #[test]
    fn wraps_code_blocks_with_copy_button() {
        let html = render_markdown("```rust\nlet x = a < b;\n```\n");
        assert!(html.contains("<span class=\"code-block-lang\">rust</span>"));
        assert!(html.contains("data-code=\"let%20x%20%3D%20a%20%3C%20b%3B%0A\""));
        assert!(html.contains(
            "<pre class=\"language-rust\"><code class=\"language-rust\">let x = a &lt; b;\n</code></pre>"
        ));
    }

    #[test]
    fn code_blocks_without_language_have_no_label() {
        let html = render_markdown("```\nplain\n```\n");
        assert!(!html.contains("code-block-lang"));
        assert!(html.contains("<pre><code>plain\n</code></pre>"));
    }
}
