//! Minijinja template environments: auto-reload from disk, embedded at
//! build time, or compiled in when neither feature is enabled.

#[cfg(feature = "reload")]
use minijinja_autoreload::AutoReloader;

#[cfg(not(feature = "reload"))]
use minijinja::Environment;

#[cfg(feature = "reload")]
/// Build template environment with auto-reloading for development
pub fn build_env(templates_path: &str) -> AutoReloader {
    reload_env::build_env(templates_path.to_string())
}

#[cfg(feature = "embed")]
/// Build template environment with embedded templates for production
pub fn build_env(_templates_path: &str) -> Environment<'static> {
    embed_env::build_env()
}

#[cfg(not(any(feature = "reload", feature = "embed")))]
/// Build template environment from the templates compiled into the binary
pub fn build_env(_templates_path: &str) -> Environment<'static> {
    inline_env::build_env()
}

#[cfg(feature = "reload")]
mod reload_env {
    use minijinja::{Environment, path_loader};
    use minijinja_autoreload::AutoReloader;

    pub fn build_env(template_path: String) -> AutoReloader {
        AutoReloader::new(move |notifier| {
            let mut env = Environment::new();
            env.set_trim_blocks(true);
            env.set_lstrip_blocks(true);
            env.set_loader(path_loader(&template_path));
            notifier.set_fast_reload(true);
            notifier.watch_path(&template_path, true);
            Ok(env)
        })
    }
}

#[cfg(feature = "embed")]
mod embed_env {
    use minijinja::Environment;

    pub fn build_env() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        minijinja_embed::load_templates!(&mut env);
        env
    }
}

#[cfg(not(any(feature = "reload", feature = "embed")))]
mod inline_env {
    use minijinja::Environment;

    const TEMPLATES: &[(&str, &str)] = &[
        ("base.html", include_str!("../templates/base.html")),
        ("login.html", include_str!("../templates/login.html")),
        ("approval.html", include_str!("../templates/approval.html")),
        ("oob.html", include_str!("../templates/oob.html")),
        ("error.html", include_str!("../templates/error.html")),
    ];

    pub fn build_env() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for (name, source) in TEMPLATES {
            if let Err(e) = env.add_template(name, source) {
                tracing::error!(template = %name, error = ?e, "failed to load template");
            }
        }
        env
    }
}

#[cfg(all(test, not(feature = "embed")))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_templates_render() {
        let templates_path = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");
        let env = build_env(templates_path);
        #[cfg(feature = "reload")]
        let env = env.acquire_env().unwrap();

        let html = env
            .get_template("oob.html")
            .unwrap()
            .render(json!({ "code": "abc123" }))
            .unwrap();
        assert!(html.contains("abc123"));

        let html = env
            .get_template("approval.html")
            .unwrap()
            .render(json!({
                "action": "/oidc/approval",
                "prompt": {
                    "request_id": "req-1",
                    "client_name": "Example <App>",
                    "username": "Jane",
                    "scopes": ["View your email address"],
                },
            }))
            .unwrap();
        assert!(html.contains("value=\"req-1\""));
        assert!(html.contains("Example &lt;App&gt;"));
        assert!(html.contains("View your email address"));
    }
}
