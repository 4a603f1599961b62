//! Composes the document an execution engine loads for one application.

use serde::Serialize;

use crate::bundle::AppBundle;

/// Helper script injected ahead of every application's own script.
pub const BOOTSTRAP_SCRIPT: &str = r#"function setAttrs(element, attrs) {
    for (const [key, value] of Object.entries(attrs)) {
        if (key === "class") {
            element.classList.add(...value.split(" "));
        } else if (key in element) {
            element[key] = value;
        } else {
            element.setAttribute(key, value);
        }
    }
}"#;

/// Everything an engine needs to render an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppDocument {
    /// Window title (the bundle's file name).
    pub title: String,
    /// Shared application stylesheet.
    pub stylesheet: String,
    /// Body markup from `index.html`.
    pub markup: String,
    /// System bootstrap script, run before `main_script`.
    pub bootstrap: String,
    /// Application script from `main.js`, loaded as a module.
    pub main_script: String,
}

impl AppDocument {
    /// Combine a validated bundle with the system stylesheet.
    #[must_use]
    pub fn compose(title: &str, bundle: &AppBundle, stylesheet: String) -> Self {
        Self {
            title: title.to_owned(),
            stylesheet,
            markup: bundle.index_html.clone(),
            bootstrap: BOOTSTRAP_SCRIPT.to_owned(),
            main_script: bundle.main_js.clone(),
        }
    }

    /// Render as a single self-contained HTML page.
    ///
    /// Title and stylesheet are escaped; markup and scripts are the
    /// application's own and are inserted verbatim (a literal `</script>` in
    /// a script is split so it cannot close the tag early).
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<title>{title}</title>\n<style>\n{style}\n</style>\n</head>\n<body>\n{markup}\n<script>\n{bootstrap}\n</script>\n<script type=\"module\">\n{main}\n</script>\n</body>\n</html>\n",
            title = escape_html(&self.title),
            style = self.stylesheet.replace("</style", "<\\/style"),
            markup = self.markup,
            bootstrap = escape_script(&self.bootstrap),
            main = escape_script(&self.main_script),
        )
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_script(script: &str) -> String {
    script.replace("</script", "<\\/script")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    fn bundle(html: &str, js: &str) -> AppBundle {
        AppBundle {
            manifest: Manifest::parse(br#"{"id":"t"}"#).unwrap(),
            index_html: html.into(),
            main_js: js.into(),
        }
    }

    #[test]
    fn test_render_orders_bootstrap_before_main() {
        let doc = AppDocument::compose("notes.app", &bundle("<p>hi</p>", "init()"), "body{}".into());
        let html = doc.render();
        let boot = html.find("function setAttrs").unwrap();
        let main = html.find("init()").unwrap();
        assert!(boot < main);
        assert!(html.contains("<title>notes.app</title>"));
        assert!(html.contains("<p>hi</p>"));
        assert!(html.contains("body{}"));
    }

    #[test]
    fn test_render_escapes_title_and_script_close() {
        let doc = AppDocument::compose("<x>.app", &bundle("", "s='</script>'"), String::new());
        let html = doc.render();
        assert!(html.contains("&lt;x&gt;.app"));
        assert!(html.contains(r"s='<\/script>'"));
    }
}
