//! `:name:` icons.

use std::fmt::Write;

use crate::html::escape_html;
use crate::rule::Rule;

pub(crate) fn rule() -> Rule {
    Rule::inline("icon", ":", |token, _ctx| {
        let (name, style) = match token.content.split_once('.') {
            Some((name, "r")) => (name, "regular"),
            Some((name, "b")) => (name, "brands"),
            Some((name, _)) => (name, "solid"),
            None => (token.content.as_str(), "solid"),
        };

        let mut out = String::from("<font-awesome-icon");
        if let Some(id) = token.attrs.id() {
            write!(out, r#" id="{}""#, escape_html(id)).unwrap();
        }
        out.push_str(r#" class="icon"#);
        for class in token.attrs.classes() {
            out.push(' ');
            out.push_str(&escape_html(class));
        }
        write!(
            out,
            r#"" icon="fa-{style} fa-{}" />"#,
            escape_html(name)
        )
        .unwrap();
        out
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::plugins::test_support::render;

    #[test]
    fn test_solid_by_default() {
        assert_eq!(
            render("a :house: b").0.html,
            "<p>a <font-awesome-icon class=\"icon\" icon=\"fa-solid fa-house\" /> b</p>\n"
        );
    }

    #[test]
    fn test_styles() {
        let html = render(":star.r: :github.b: :bolt.x:").0.html;
        assert!(html.contains(r#"icon="fa-regular fa-star""#));
        assert!(html.contains(r#"icon="fa-brands fa-github""#));
        assert!(html.contains(r#"icon="fa-solid fa-bolt""#));
    }

    #[test]
    fn test_attrs() {
        assert_eq!(
            render(":gear:{#cfg .spin .big}").0.html,
            "<p><font-awesome-icon id=\"cfg\" class=\"icon spin big\" icon=\"fa-solid fa-gear\" /></p>\n"
        );
    }

    #[test]
    fn test_clock_times_stay_text() {
        assert_eq!(render("at 10:30 or 11:45").0.html, "<p>at 10:30 or 11:45</p>\n");
    }

    #[test]
    fn test_icons_contribute_no_text() {
        let md = crate::MarkdownRenderer::new();
        assert_eq!(md.text(&md.parse("go :house: home")), "go  home");
    }
}
