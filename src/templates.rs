//! Minijinja template environment with the account pages compiled into the binary.

use minijinja::Environment;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("signup.html", include_str!("../templates/signup.html")),
];

/// Build the template environment used by the HTML handlers.
pub fn build_env() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    for (name, source) in TEMPLATES {
        env.add_template(name, source)?;
    }
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_login_escapes_redirect() {
        let env = build_env().unwrap();
        let html = env
            .get_template("login.html")
            .unwrap()
            .render(context! {
                redirect => "/authorize?a=1&b=\"2\"",
                redirect_query => "%2Fauthorize",
            })
            .unwrap();
        assert!(html.contains("name=\"user\""));
        assert!(html.contains("&amp;b="));
        assert!(!html.contains("b=\"2\""));
    }

    #[test]
    fn test_signup_renders_error() {
        let env = build_env().unwrap();
        let html = env
            .get_template("signup.html")
            .unwrap()
            .render(context! { error => "Passwords do not match", redirect => "/" })
            .unwrap();
        assert!(html.contains("Passwords do not match"));
        assert!(html.contains("name=\"confirm_password\""));
    }
}
